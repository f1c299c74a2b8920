//! Quality signals: glare, reference white-balance deviation, L* stability,
//! the advisory readiness score and the measurement gate.

use serde::Serialize;

use crate::error::GateViolation;
use crate::roi::Sample;
use crate::white_balance::channel_means;

/// Default max-channel level counted as glare.
pub const DEFAULT_GLARE_LEVEL: u8 = 250;

/// Percent of samples whose brightest channel reaches `level`. Empty set → 0.
pub fn glare_percent<I>(samples: I, level: u8) -> f64
where
    I: IntoIterator<Item = Sample>,
{
    let mut total = 0u64;
    let mut hot = 0u64;
    for s in samples {
        total += 1;
        if s[0].max(s[1]).max(s[2]) >= level {
            hot += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    100.0 * hot as f64 / total as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct WbDeviation {
    /// Channel mean minus grand mean, RGB order
    pub per_channel: [f64; 3],
    pub max_deviation: f64,
}

/// How far the reference patch is from neutral, in 8-bit units.
/// Empty set → zero deviation.
pub fn white_balance_deviation<I>(samples: I) -> WbDeviation
where
    I: IntoIterator<Item = Sample>,
{
    let Some(m) = channel_means(samples) else {
        return WbDeviation::default();
    };
    let avg = m.grand_mean();
    let per_channel = [m.r - avg, m.g - avg, m.b - avg];
    let max_deviation = per_channel.iter().fold(0.0_f64, |acc, d| acc.max(d.abs()));
    WbDeviation {
        per_channel,
        max_deviation,
    }
}

/// Exponential moving average over L*.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityTracker {
    alpha: f64,
    ema: Option<f64>,
}

impl Default for StabilityTracker {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl StabilityTracker {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, ema: None }
    }

    /// Fold in one L* value; returns the stability delta `|ema - l|`.
    pub fn update(&mut self, l: f64) -> f64 {
        let ema = match self.ema {
            None => l,
            Some(prev) => self.alpha * l + (1.0 - self.alpha) * prev,
        };
        self.ema = Some(ema);
        (ema - l).abs()
    }

    pub fn ema(&self) -> Option<f64> {
        self.ema
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn reset(&mut self) {
        self.ema = None;
    }
}

/// Bounded 0..=100 readiness indicator. Advisory only; never gates.
pub fn readiness_score(glare: f64, max_wb_dev: f64, stability: f64) -> f64 {
    let penalty =
        (5.0 * glare).min(50.0) + (1.2 * max_wb_dev).min(30.0) + (6.0 * stability).min(20.0);
    (100.0 - penalty).clamp(0.0, 100.0)
}

/// Human hints shown next to a live reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Advisory {
    ReduceGlare,
    CalibrateWhite,
    WaitForSteadyLight,
}

impl Advisory {
    pub fn message(&self) -> &'static str {
        match self {
            Advisory::ReduceGlare => "reduce glare: diffuse the light or tilt the sample",
            Advisory::CalibrateWhite => "calibrate white: the reference patch is off-neutral",
            Advisory::WaitForSteadyLight => "wait for steady lighting",
        }
    }
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

const ADVISE_GLARE: f64 = 2.0;
const ADVISE_WB: f64 = 8.0;
const ADVISE_STABILITY: f64 = 0.8;

pub fn advisories(glare: f64, max_wb_dev: f64, stability: f64) -> Vec<Advisory> {
    let mut out = Vec::new();
    if glare > ADVISE_GLARE {
        out.push(Advisory::ReduceGlare);
    }
    if max_wb_dev > ADVISE_WB {
        out.push(Advisory::CalibrateWhite);
    }
    if stability > ADVISE_STABILITY {
        out.push(Advisory::WaitForSteadyLight);
    }
    out
}

/// Named gate preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateName {
    Strict,
    #[default]
    Normal,
    Relaxed,
}

impl GateName {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateName::Strict => "strict",
            GateName::Normal => "normal",
            GateName::Relaxed => "relaxed",
        }
    }
}

impl std::fmt::Display for GateName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GateName {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(GateName::Strict),
            "normal" => Ok(GateName::Normal),
            "relaxed" => Ok(GateName::Relaxed),
            other => Err(format!("unknown gate '{other}' (strict|normal|relaxed)")),
        }
    }
}

/// Exclusive maxima for each signal. A value strictly above a maximum fails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GateProfile {
    pub glare_max: f64,
    pub wb_deviation_max: f64,
    pub stability_max: f64,
}

impl Default for GateProfile {
    fn default() -> Self {
        Self::normal()
    }
}

impl GateProfile {
    pub const fn strict() -> Self {
        Self {
            glare_max: 2.0,
            wb_deviation_max: 6.0,
            stability_max: 0.5,
        }
    }

    pub const fn normal() -> Self {
        Self {
            glare_max: 4.0,
            wb_deviation_max: 10.0,
            stability_max: 1.0,
        }
    }

    pub const fn relaxed() -> Self {
        Self {
            glare_max: 8.0,
            wb_deviation_max: 16.0,
            stability_max: 2.0,
        }
    }

    pub const fn for_name(name: GateName) -> Self {
        match name {
            GateName::Strict => Self::strict(),
            GateName::Normal => Self::normal(),
            GateName::Relaxed => Self::relaxed(),
        }
    }

    /// First violated signal, in order glare → white balance → stability.
    /// NaN signals fail their check.
    pub fn check(&self, glare: f64, wb_deviation: f64, stability: f64) -> Result<(), GateViolation> {
        if glare.is_nan() || glare > self.glare_max {
            return Err(GateViolation::Glare {
                value: glare,
                max: self.glare_max,
            });
        }
        if wb_deviation.is_nan() || wb_deviation > self.wb_deviation_max {
            return Err(GateViolation::WhiteBalance {
                value: wb_deviation,
                max: self.wb_deviation_max,
            });
        }
        if stability.is_nan() || stability > self.stability_max {
            return Err(GateViolation::Stability {
                value: stability,
                max: self.stability_max,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glare_of_white_and_black() {
        assert_eq!(glare_percent(vec![[255, 255, 255]; 10], DEFAULT_GLARE_LEVEL), 100.0);
        assert_eq!(glare_percent(vec![[0, 0, 0]; 10], DEFAULT_GLARE_LEVEL), 0.0);
        assert_eq!(glare_percent(Vec::<Sample>::new(), DEFAULT_GLARE_LEVEL), 0.0);
        let mixed = vec![[250, 0, 0], [249, 249, 249], [10, 10, 10], [0, 0, 251]];
        assert_eq!(glare_percent(mixed, DEFAULT_GLARE_LEVEL), 50.0);
    }

    #[test]
    fn deviation_of_warm_patch() {
        let d = white_balance_deviation(vec![[250, 250, 248]; 3]);
        assert!((d.per_channel[2] + 1.3333).abs() < 1e-3);
        assert!((d.max_deviation - 1.3333).abs() < 1e-3);
        assert_eq!(white_balance_deviation(Vec::<Sample>::new()).max_deviation, 0.0);
    }

    #[test]
    fn ema_first_value_then_smooths() {
        let mut t = StabilityTracker::new(0.2);
        assert_eq!(t.update(50.0), 0.0);
        let d = t.update(60.0);
        assert!((t.ema().unwrap() - 52.0).abs() < 1e-12);
        assert!((d - 8.0).abs() < 1e-12);
        t.reset();
        assert_eq!(t.ema(), None);
    }

    #[test]
    fn readiness_is_bounded() {
        assert_eq!(readiness_score(0.0, 0.0, 0.0), 100.0);
        assert_eq!(readiness_score(100.0, 100.0, 100.0), 0.0);
        assert!((readiness_score(1.0, 5.0, 0.5) - 86.0).abs() < 1e-12);
    }

    #[test]
    fn advisory_thresholds_are_exclusive() {
        assert!(advisories(2.0, 8.0, 0.8).is_empty());
        assert_eq!(
            advisories(2.1, 8.1, 0.81),
            vec![
                Advisory::ReduceGlare,
                Advisory::CalibrateWhite,
                Advisory::WaitForSteadyLight
            ]
        );
    }

    #[test]
    fn gate_reports_first_violation() {
        let strict = GateProfile::strict();
        assert_eq!(strict.check(2.0, 6.0, 0.5), Ok(()));
        let v = strict.check(3.5, 20.0, 5.0).unwrap_err();
        assert_eq!(v.signal(), "glare");
        let v = strict.check(1.0, 20.0, 5.0).unwrap_err();
        assert_eq!(v.signal(), "wb_deviation");
        let v = strict.check(1.0, 1.0, 0.51).unwrap_err();
        assert_eq!(v.signal(), "stability");
        assert!(strict.check(f64::NAN, 0.0, 0.0).is_err());
    }

    #[test]
    fn gate_names_round_trip() {
        for name in [GateName::Strict, GateName::Normal, GateName::Relaxed] {
            assert_eq!(name.as_str().parse::<GateName>().unwrap(), name);
        }
        assert!("lenient".parse::<GateName>().is_err());
    }
}
