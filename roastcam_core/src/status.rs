//! Pipeline lifecycle state and per-pass outcomes.

use serde::Serialize;

use crate::category::Category;
use crate::color::Lab;
use crate::quality::Advisory;

/// Lifecycle: `Idle → Running ⇄ Paused → Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    #[default]
    Idle,
    Running,
    Paused,
}

impl PipelineState {
    /// Capture resource held (running or paused).
    pub fn is_started(&self) -> bool {
        !matches!(self, PipelineState::Idle)
    }
}

/// Signals and estimate from one analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassResult {
    pub lab: Lab,
    pub score: f64,
    pub category: &'static Category,
    /// Percent of sample-rectangle pixels at the glare level
    pub glare: f64,
    /// Max |channel - mean| over the reference patch
    pub wb_deviation: f64,
    /// |EMA(L) - L|
    pub stability: f64,
    pub readiness: f64,
    pub advisories: Vec<Advisory>,
    /// Samples that entered the Lab mean
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    Analysis(PassResult),
    /// Empty frame or no samples inside the region; nothing was updated
    NoData,
}

impl PassOutcome {
    pub fn into_result(self) -> Option<PassResult> {
        match self {
            PassOutcome::Analysis(r) => Some(r),
            PassOutcome::NoData => None,
        }
    }
}
