//! Score prediction: the fixed `scale·L + offset` formula or a regression
//! fitted from calibration points.
//!
//! Fitting solves the ridge normal equations `(XᵗX + λI)w = Xᵗy`. The penalty
//! applies to every weight including the intercept; λ = 0 is ordinary least
//! squares.

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationPoint;
use crate::color::Lab;
use crate::error::{Result, RoastError};
use crate::solver::solve;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    /// `w0 + w1·L`
    #[serde(rename = "linear")]
    Linear,
    /// `w0 + w1·L + w2·a + w3·b + w4·L²`
    #[serde(rename = "poly")]
    Polynomial,
}

impl ModelKind {
    pub const fn params(self) -> usize {
        match self {
            ModelKind::Linear => 2,
            ModelKind::Polynomial => 5,
        }
    }

    /// Points required before a fit is attempted: the kind's floor, never
    /// fewer than the parameter count.
    pub const fn min_points(self) -> usize {
        let floor = match self {
            ModelKind::Linear => 2,
            ModelKind::Polynomial => 3,
        };
        if floor > self.params() {
            floor
        } else {
            self.params()
        }
    }

    /// Name used in settings blobs and measurement records.
    pub const fn name(self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::Polynomial => "poly",
        }
    }

    fn design_row(self, lab: &Lab) -> Vec<f64> {
        match self {
            ModelKind::Linear => vec![1.0, lab.l],
            ModelKind::Polynomial => vec![1.0, lab.l, lab.a, lab.b, lab.l * lab.l],
        }
    }
}

impl std::str::FromStr for ModelKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "linear" => Ok(ModelKind::Linear),
            "poly" | "polynomial" => Ok(ModelKind::Polynomial),
            other => Err(format!("unknown model type '{other}' (linear|poly)")),
        }
    }
}

/// A fitted regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreModel {
    Linear { w0: f64, w1: f64 },
    Polynomial { w: [f64; 5] },
}

impl ScoreModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            ScoreModel::Linear { .. } => ModelKind::Linear,
            ScoreModel::Polynomial { .. } => ModelKind::Polynomial,
        }
    }

    pub fn weights(&self) -> Vec<f64> {
        match *self {
            ScoreModel::Linear { w0, w1 } => vec![w0, w1],
            ScoreModel::Polynomial { w } => w.to_vec(),
        }
    }

    /// Rebuild from a weight vector; None when the length doesn't match the
    /// kind or a weight is not finite.
    pub fn from_weights(kind: ModelKind, w: &[f64]) -> Option<Self> {
        if w.len() != kind.params() || !w.iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(match kind {
            ModelKind::Linear => ScoreModel::Linear { w0: w[0], w1: w[1] },
            ModelKind::Polynomial => ScoreModel::Polynomial {
                w: [w[0], w[1], w[2], w[3], w[4]],
            },
        })
    }

    pub fn predict(&self, lab: &Lab) -> f64 {
        match *self {
            ScoreModel::Linear { w0, w1 } => w0 + w1 * lab.l,
            ScoreModel::Polynomial { w } => {
                w[0] + w[1] * lab.l + w[2] * lab.a + w[3] * lab.b + w[4] * lab.l * lab.l
            }
        }
    }
}

/// Fallback formula used while no model is fitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFormula {
    pub scale: f64,
    pub offset: f64,
}

impl Default for LinearFormula {
    fn default() -> Self {
        Self {
            scale: 1.20,
            offset: 10.0,
        }
    }
}

/// Active scoring strategy: the fitted model wins over the formula.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Scorer {
    pub formula: LinearFormula,
    pub fitted: Option<ScoreModel>,
}

impl Scorer {
    pub fn predict(&self, lab: &Lab) -> f64 {
        match &self.fitted {
            Some(m) => m.predict(lab),
            None => self.formula.scale * lab.l + self.formula.offset,
        }
    }

    /// "formula" while unfitted, else the model kind name.
    pub fn model_name(&self) -> &'static str {
        self.fitted.map_or("formula", |m| m.kind().name())
    }
}

/// Outcome of a successful fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    pub model: ScoreModel,
    /// Root-mean-square residual over the fitted points
    pub rmse: f64,
    /// Coefficient of determination; 1.0 when the targets have no spread
    pub r2: f64,
    pub n: usize,
    pub lambda: f64,
}

/// Fit `kind` to `points` with ridge penalty `lambda`.
pub fn fit(points: &[CalibrationPoint], kind: ModelKind, lambda: f64) -> Result<FitReport> {
    let needed = kind.min_points();
    if points.len() < needed {
        return Err(eyre::Report::new(RoastError::InsufficientPoints {
            kind: kind.name(),
            needed,
            got: points.len(),
        }));
    }
    let p = kind.params();
    let mut xtx = vec![vec![0.0; p]; p];
    let mut xty = vec![0.0; p];
    for pt in points {
        let row = kind.design_row(&pt.lab);
        for i in 0..p {
            xty[i] += row[i] * pt.reference_score;
            for j in 0..p {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for (i, r) in xtx.iter_mut().enumerate() {
        r[i] += lambda;
    }
    let w = solve(&xtx, &xty).ok_or_else(|| eyre::Report::new(RoastError::SingularSystem))?;
    let model =
        ScoreModel::from_weights(kind, &w).ok_or_else(|| eyre::Report::new(RoastError::SingularSystem))?;

    let n = points.len() as f64;
    let mean_y = points.iter().map(|p| p.reference_score).sum::<f64>() / n;
    let (ss_res, ss_tot) = points.iter().fold((0.0, 0.0), |(res, tot), pt| {
        let e = pt.reference_score - model.predict(&pt.lab);
        let d = pt.reference_score - mean_y;
        (res + e * e, tot + d * d)
    });
    let rmse = (ss_res / n).sqrt();
    let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 1.0 };
    tracing::info!(
        kind = kind.name(),
        n = points.len(),
        lambda,
        rmse,
        r2,
        "model fitted"
    );
    Ok(FitReport {
        model,
        rmse,
        r2,
        n: points.len(),
        lambda,
    })
}

/// Position on a 0..=100 roast bar: `clamp01((score + 5) / 90) · 100`.
pub fn gauge_percent(score: f64) -> f64 {
    ((score + 5.0) / 90.0).clamp(0.0, 1.0) * 100.0
}
