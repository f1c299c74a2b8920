//! Mutable measurement state, owned by the pipeline.

use crate::calibration::CalibrationPoint;
use crate::category::Scheme;
use crate::config::PipelineCfg;
use crate::measurement_log::MeasurementLog;
use crate::model::Scorer;
use crate::quality::{GateName, GateProfile, StabilityTracker};
use crate::roi::Mode;
use crate::white_balance::{Ccm, ChannelMeans, GainVector};

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub gains: GainVector,
    pub ccm: Ccm,
    pub scorer: Scorer,
    pub points: Vec<CalibrationPoint>,
    pub scheme: Scheme,
    pub gate: GateName,
    pub gate_profile: GateProfile,
    pub mode: Mode,
    pub stability: StabilityTracker,
    pub log: MeasurementLog,
    pub device_tag: String,
    /// Raw reference means from the last white/gray calibration
    pub reference_means: Option<ChannelMeans>,
}

impl Session {
    pub fn new(cfg: &PipelineCfg) -> Self {
        Self {
            gains: GainVector::UNITY,
            ccm: Ccm::IDENTITY,
            scorer: Scorer {
                formula: cfg.formula,
                fitted: None,
            },
            points: Vec::new(),
            scheme: cfg.scheme,
            gate: cfg.gate,
            gate_profile: cfg.gate_profile,
            mode: cfg.mode,
            stability: StabilityTracker::new(cfg.ema_alpha),
            log: MeasurementLog::default(),
            device_tag: cfg.device_tag.clone(),
            reference_means: None,
        }
    }
}
