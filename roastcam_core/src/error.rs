use thiserror::Error;

/// Quality signal that tripped the measurement gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateViolation {
    /// Glare percentage above the profile maximum.
    Glare { value: f64, max: f64 },
    /// Reference-patch white-balance deviation above the profile maximum.
    WhiteBalance { value: f64, max: f64 },
    /// |EMA - L*| above the profile maximum.
    Stability { value: f64, max: f64 },
}

impl GateViolation {
    /// Short stable name for logs and JSON.
    pub fn signal(&self) -> &'static str {
        match self {
            GateViolation::Glare { .. } => "glare",
            GateViolation::WhiteBalance { .. } => "wb_deviation",
            GateViolation::Stability { .. } => "stability",
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            GateViolation::Glare { value, .. }
            | GateViolation::WhiteBalance { value, .. }
            | GateViolation::Stability { value, .. } => value,
        }
    }

    pub fn max(&self) -> f64 {
        match *self {
            GateViolation::Glare { max, .. }
            | GateViolation::WhiteBalance { max, .. }
            | GateViolation::Stability { max, .. } => max,
        }
    }
}

impl std::fmt::Display for GateViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateViolation::Glare { value, max } => {
                write!(f, "glare {value:.1}% exceeds {max:.1}%")
            }
            GateViolation::WhiteBalance { value, max } => {
                write!(f, "white-balance deviation {value:.1} exceeds {max:.1}")
            }
            GateViolation::Stability { value, max } => {
                write!(f, "stability delta {value:.2} exceeds {max:.2}")
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoastError {
    #[error("capture unavailable: {0}")]
    CaptureUnavailable(String),
    #[error("capture error: {0}")]
    Capture(String),
    #[error("no usable frame data")]
    NoFrame,
    #[error("region {0} contains no samples")]
    EmptyRegion(&'static str),
    #[error("measurement rejected: {0}")]
    GateRejected(GateViolation),
    #[error("{kind} model needs at least {needed} calibration points, got {got}")]
    InsufficientPoints {
        kind: &'static str,
        needed: usize,
        got: usize,
    },
    #[error("normal equations are singular; calibration points are degenerate")]
    SingularSystem,
    #[error("malformed settings import: {0}")]
    MalformedImport(String),
    #[error("settings storage error: {0}")]
    Storage(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("measurement cancelled")]
    Cancelled,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing frame source")]
    MissingFrameSource,
    #[error("missing region provider")]
    MissingRegions,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

/// Map a trait-boundary error from a frame source to a typed `RoastError`.
///
/// Permission/availability wording maps to `CaptureUnavailable`; everything
/// else is a transient capture failure.
pub fn map_capture_error(e: &(dyn std::error::Error + 'static)) -> RoastError {
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("permission")
        || lower.contains("denied")
        || lower.contains("not found")
        || lower.contains("unavailable")
    {
        RoastError::CaptureUnavailable(s)
    } else {
        RoastError::Capture(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_accessors() {
        let v = GateViolation::Glare {
            value: 3.5,
            max: 2.0,
        };
        assert_eq!(v.signal(), "glare");
        assert_eq!(v.value(), 3.5);
        assert_eq!(v.max(), 2.0);
        assert_eq!(v.to_string(), "glare 3.5% exceeds 2.0%");
    }

    #[test]
    fn capture_error_mapping() {
        let denied = std::io::Error::other("Permission denied by user");
        assert!(matches!(
            map_capture_error(&denied),
            RoastError::CaptureUnavailable(_)
        ));
        let glitch = std::io::Error::other("short read");
        assert!(matches!(map_capture_error(&glitch), RoastError::Capture(_)));
    }
}
