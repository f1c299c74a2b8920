//! Reference points pairing a known roast score with a measured color.

use serde::{Deserialize, Serialize};

use crate::color::Lab;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPoint {
    /// Score read off a reference instrument or a labelled sample
    pub reference_score: f64,
    pub lab: Lab,
}

impl CalibrationPoint {
    pub const fn new(reference_score: f64, lab: Lab) -> Self {
        Self {
            reference_score,
            lab,
        }
    }

    pub fn is_finite(&self) -> bool {
        [self.reference_score, self.lab.l, self.lab.a, self.lab.b]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Wire form used in settings blobs: `{A, L, a, b}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointRecord {
    #[serde(rename = "A")]
    pub agtron: f64,
    #[serde(rename = "L")]
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

impl From<&CalibrationPoint> for PointRecord {
    fn from(p: &CalibrationPoint) -> Self {
        Self {
            agtron: p.reference_score,
            l: p.lab.l,
            a: p.lab.a,
            b: p.lab.b,
        }
    }
}

impl From<PointRecord> for CalibrationPoint {
    fn from(r: PointRecord) -> Self {
        CalibrationPoint::new(r.agtron, Lab::new(r.l, r.a, r.b))
    }
}

impl From<&roastcam_config::CalibrationRow> for CalibrationPoint {
    fn from(r: &roastcam_config::CalibrationRow) -> Self {
        CalibrationPoint::new(r.agtron, Lab::new(r.l, r.a, r.b))
    }
}
