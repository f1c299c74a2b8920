//! `From` implementations bridging `roastcam_config` types to core runtime types.

use std::time::Duration;

use crate::category::Scheme;
use crate::config::{FitCfg, MeasureCfg, PipelineCfg, SamplingCfg};
use crate::model::LinearFormula;
use crate::quality::{GateName, GateProfile};
use crate::roi::Mode;

impl From<roastcam_config::GateName> for GateName {
    fn from(g: roastcam_config::GateName) -> Self {
        match g {
            roastcam_config::GateName::Strict => GateName::Strict,
            roastcam_config::GateName::Normal => GateName::Normal,
            roastcam_config::GateName::Relaxed => GateName::Relaxed,
        }
    }
}

impl From<roastcam_config::SchemeName> for Scheme {
    fn from(s: roastcam_config::SchemeName) -> Self {
        match s {
            roastcam_config::SchemeName::Gourmet => Scheme::Gourmet,
            roastcam_config::SchemeName::Commercial => Scheme::Commercial,
        }
    }
}

impl From<roastcam_config::ModeName> for Mode {
    fn from(m: roastcam_config::ModeName) -> Self {
        match m {
            roastcam_config::ModeName::Ground => Mode::Ground,
            roastcam_config::ModeName::Bean => Mode::Bean,
        }
    }
}

// ── Quality ──────────────────────────────────────────────────────────────────

impl From<&roastcam_config::QualityCfg> for GateProfile {
    fn from(c: &roastcam_config::QualityCfg) -> Self {
        let base = GateProfile::for_name(c.profile.into());
        Self {
            glare_max: c.glare_max.unwrap_or(base.glare_max),
            wb_deviation_max: c.wb_deviation_max.unwrap_or(base.wb_deviation_max),
            stability_max: c.stability_max.unwrap_or(base.stability_max),
        }
    }
}

// ── Sampling / measure / fit ─────────────────────────────────────────────────

impl From<&roastcam_config::Config> for SamplingCfg {
    fn from(c: &roastcam_config::Config) -> Self {
        Self {
            sample_stride: c.sampling.sample_stride,
            reference_stride: c.sampling.reference_stride,
            white_stride: c.sampling.white_stride,
            gray_stride: c.sampling.gray_stride,
            glare_level: c.sampling.glare_level,
            highlight_reject_fraction: c.model.highlight_reject_fraction,
        }
    }
}

impl From<&roastcam_config::MeasureCfg> for MeasureCfg {
    fn from(c: &roastcam_config::MeasureCfg) -> Self {
        Self {
            frames: c.frames,
            delay: Duration::from_millis(c.delay_ms),
        }
    }
}

impl From<&roastcam_config::ModelCfg> for FitCfg {
    fn from(c: &roastcam_config::ModelCfg) -> Self {
        Self {
            ridge_linear: c.ridge_linear,
            ridge_poly: c.ridge_poly,
        }
    }
}

impl From<&roastcam_config::ModelCfg> for LinearFormula {
    fn from(c: &roastcam_config::ModelCfg) -> Self {
        Self {
            scale: c.scale,
            offset: c.offset,
        }
    }
}

// ── Whole pipeline ───────────────────────────────────────────────────────────

impl From<&roastcam_config::Config> for PipelineCfg {
    fn from(c: &roastcam_config::Config) -> Self {
        Self {
            sampling: SamplingCfg::from(c),
            ema_alpha: c.stability.ema_alpha,
            measure: MeasureCfg::from(&c.measure),
            fit: FitCfg::from(&c.model),
            formula: LinearFormula::from(&c.model),
            scheme: c.model.scheme.into(),
            gate: c.quality.profile.into(),
            gate_profile: GateProfile::from(&c.quality),
            mode: c.model.mode.into(),
            device_tag: c.capture.device_tag.clone(),
        }
    }
}
