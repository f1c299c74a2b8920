//! Versioned settings blob: what survives between sessions.
//!
//! Imports are parsed and validated in full before anything touches the
//! session; a malformed blob leaves the session exactly as it was.

use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationPoint, PointRecord};
use crate::category::Scheme;
use crate::error::{Result, RoastError};
use crate::model::{LinearFormula, ModelKind, ScoreModel};
use crate::quality::GateName;
use crate::roi::Mode;
use crate::session::Session;
use crate::white_balance::{Ccm, GainVector};

pub const SETTINGS_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelRecord {
    #[serde(rename = "type")]
    pub kind: ModelKind,
    pub w: Vec<f64>,
}

/// JSON shape of the persisted settings. Every key is required; `model` may be null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsBlob {
    pub version: u32,
    pub gains: GainVector,
    pub ccm: Ccm,
    pub scale: f64,
    pub offset: f64,
    pub scheme: Scheme,
    pub gate: GateName,
    pub mode: Mode,
    #[serde(deserialize_with = "Option::deserialize")]
    pub model: Option<ModelRecord>,
    #[serde(rename = "calPoints")]
    pub cal_points: Vec<PointRecord>,
}

/// A blob that passed validation, in core types.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub gains: GainVector,
    pub ccm: Ccm,
    pub formula: LinearFormula,
    pub scheme: Scheme,
    pub gate: GateName,
    pub mode: Mode,
    pub model: Option<ScoreModel>,
    pub points: Vec<CalibrationPoint>,
}

impl SettingsBlob {
    pub fn from_session(s: &Session) -> Self {
        Self {
            version: SETTINGS_VERSION,
            gains: s.gains,
            ccm: s.ccm,
            scale: s.scorer.formula.scale,
            offset: s.scorer.formula.offset,
            scheme: s.scheme,
            gate: s.gate,
            mode: s.mode,
            model: s.scorer.fitted.map(|m| ModelRecord {
                kind: m.kind(),
                w: m.weights(),
            }),
            cal_points: s.points.iter().map(PointRecord::from).collect(),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| eyre::Report::new(RoastError::Storage(e.to_string())))
    }

    /// Parse JSON bytes. Shape errors (unknown or missing keys, wrong types)
    /// are `MalformedImport`.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| eyre::Report::new(RoastError::MalformedImport(e.to_string())))
    }

    /// Check values the type system can't: version, finiteness, weight counts.
    pub fn validate(self) -> Result<Settings> {
        let bad = |msg: String| eyre::Report::new(RoastError::MalformedImport(msg));
        if self.version != SETTINGS_VERSION {
            return Err(bad(format!(
                "unsupported version {} (expected {SETTINGS_VERSION})",
                self.version
            )));
        }
        if !self.gains.is_valid() {
            return Err(bad("gains must be finite and >= 0".into()));
        }
        if !self.ccm.is_finite() {
            return Err(bad("ccm must be finite".into()));
        }
        if !self.scale.is_finite() || !self.offset.is_finite() {
            return Err(bad("scale and offset must be finite".into()));
        }
        let model = match self.model {
            None => None,
            Some(rec) => Some(ScoreModel::from_weights(rec.kind, &rec.w).ok_or_else(|| {
                bad(format!(
                    "{} model needs {} finite weights, got {}",
                    rec.kind.name(),
                    rec.kind.params(),
                    rec.w.len()
                ))
            })?),
        };
        let mut points = Vec::with_capacity(self.cal_points.len());
        for (i, rec) in self.cal_points.into_iter().enumerate() {
            let p = CalibrationPoint::from(rec);
            if !p.is_finite() {
                return Err(bad(format!("calPoints[{i}] has non-finite values")));
            }
            points.push(p);
        }
        Ok(Settings {
            gains: self.gains,
            ccm: self.ccm,
            formula: LinearFormula {
                scale: self.scale,
                offset: self.offset,
            },
            scheme: self.scheme,
            gate: self.gate,
            mode: self.mode,
            model,
            points,
        })
    }
}

/// Parse and validate in one step.
pub fn parse_settings(bytes: &[u8]) -> Result<Settings> {
    SettingsBlob::from_json(bytes)?.validate()
}
