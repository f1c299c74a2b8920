//! Runtime configuration for the measurement pipeline.
//!
//! Separate from the TOML schema in `roastcam_config`; see `conversions`
//! for the mapping.

use std::time::Duration;

use crate::category::Scheme;
use crate::model::LinearFormula;
use crate::quality::{GateName, GateProfile};
use crate::roi::Mode;

/// Grid strides and thresholds used while sampling regions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingCfg {
    pub sample_stride: u32,
    pub reference_stride: u32,
    pub white_stride: u32,
    pub gray_stride: u32,
    pub glare_level: u8,
    /// Bean mode only. Range: [0.0, 1.0).
    pub highlight_reject_fraction: f64,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self {
            sample_stride: 3,
            reference_stride: 6,
            white_stride: 4,
            gray_stride: 2,
            glare_level: 250,
            highlight_reject_fraction: 0.10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureCfg {
    pub frames: u32,
    pub delay: Duration,
}

impl Default for MeasureCfg {
    fn default() -> Self {
        Self {
            frames: 18,
            delay: Duration::from_millis(25),
        }
    }
}

/// Ridge penalties per model kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitCfg {
    pub ridge_linear: f64,
    pub ridge_poly: f64,
}

impl Default for FitCfg {
    fn default() -> Self {
        Self {
            ridge_linear: 0.01,
            ridge_poly: 0.1,
        }
    }
}

/// Everything the pipeline needs at construction. Session fields (formula,
/// scheme, gate, mode) are only the initial values; persisted settings
/// loaded later take precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineCfg {
    pub sampling: SamplingCfg,
    pub ema_alpha: f64,
    pub measure: MeasureCfg,
    pub fit: FitCfg,
    pub formula: LinearFormula,
    pub scheme: Scheme,
    pub gate: GateName,
    /// Thresholds for `gate`, after any config overrides
    pub gate_profile: GateProfile,
    pub mode: Mode,
    pub device_tag: String,
}

impl Default for PipelineCfg {
    fn default() -> Self {
        Self {
            sampling: SamplingCfg::default(),
            ema_alpha: 0.2,
            measure: MeasureCfg::default(),
            fit: FitCfg::default(),
            formula: LinearFormula::default(),
            scheme: Scheme::Gourmet,
            gate: GateName::Normal,
            gate_profile: GateProfile::normal(),
            mode: Mode::Ground,
            device_tag: "default".to_string(),
        }
    }
}
