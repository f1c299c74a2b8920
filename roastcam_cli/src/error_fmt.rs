//! Human-readable error descriptions and structured JSON error formatting.

use roastcam_core::error::{BuildError, GateViolation, RoastError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingFrameSource | BuildError::MissingRegions => format!(
                "What happened: The measurement pipeline is incomplete ({be}).\nLikely causes: A frame source or region provider failed to initialize.\nHow to fix: Re-run with --log-level=debug and check the capture setup."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(re) = err.downcast_ref::<RoastError>() {
        return match re {
            RoastError::CaptureUnavailable(detail) => format!(
                "What happened: The camera could not be opened ({detail}).\nLikely causes: Permission denied, device busy, or the --image path does not exist.\nHow to fix: Grant camera access or check the image path, then retry."
            ),
            RoastError::GateRejected(v) => gate_hint(v),
            RoastError::InsufficientPoints { kind, needed, got } => format!(
                "What happened: Not enough calibration points for the {kind} model ({got} of {needed}).\nLikely causes: Too few reference samples recorded.\nHow to fix: Add points with `roastcam point add --agtron <N>` or `roastcam point import <CSV>`."
            ),
            RoastError::SingularSystem => "What happened: The calibration fit is degenerate.\nLikely causes: Calibration points are duplicates or too similar in color.\nHow to fix: Add reference samples spanning light to dark roasts, or use `fit linear`.".to_string(),
            RoastError::MalformedImport(detail) => format!(
                "What happened: The settings file was rejected ({detail}).\nLikely causes: Wrong file, hand edits, or an incompatible version.\nHow to fix: Re-export with `roastcam model export` and import that file. Current settings were left unchanged."
            ),
            RoastError::NoFrame | RoastError::EmptyRegion(_) => format!(
                "What happened: {re}.\nLikely causes: The camera has not delivered a frame yet, or the region falls outside the image.\nHow to fix: Check the capture size in [capture] and the sample placement."
            ),
            RoastError::Cancelled => "Measurement cancelled.".to_string(),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<toml::de::Error>() {
        return format!(
            "What happened: The config file is not valid TOML for roastcam.\nDetails: {}\nHow to fix: Check spelling of sections and keys; unknown keys are rejected.",
            te.message()
        );
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("calibration csv must have headers") {
        return "Invalid headers in calibration CSV. Expected 'agtron,L,a,b'.".to_string();
    }
    if lower.contains("must be") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nHow to fix: Edit the TOML config and try again."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

fn gate_hint(v: &GateViolation) -> String {
    let fix = match v {
        GateViolation::Glare { .. } => "Diffuse or angle the light to remove reflections",
        GateViolation::WhiteBalance { .. } => {
            "Run `roastcam calibrate white` with the card in the reference patch"
        }
        GateViolation::Stability { .. } => "Wait for the lighting and sample to settle",
    };
    format!(
        "What happened: Measurement rejected by the quality gate: {v}.\nHow to fix: {fix}, or relax the gate with `roastcam set --gate relaxed`."
    )
}

/// Stable exit codes per error class; everything else is 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<RoastError>() {
        Some(RoastError::GateRejected(_)) => 3,
        Some(RoastError::InsufficientPoints { .. }) => 4,
        Some(RoastError::MalformedImport(_)) => 5,
        Some(RoastError::CaptureUnavailable(_)) => 6,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<RoastError>() {
        Some(RoastError::CaptureUnavailable(_)) => "CaptureUnavailable",
        Some(RoastError::Capture(_)) => "Capture",
        Some(RoastError::NoFrame) => "NoFrame",
        Some(RoastError::EmptyRegion(_)) => "EmptyRegion",
        Some(RoastError::GateRejected(_)) => "GateRejected",
        Some(RoastError::InsufficientPoints { .. }) => "InsufficientPoints",
        Some(RoastError::SingularSystem) => "SingularSystem",
        Some(RoastError::MalformedImport(_)) => "MalformedImport",
        Some(RoastError::Storage(_)) => "Storage",
        Some(RoastError::State(_)) => "State",
        Some(RoastError::Cancelled) => "Cancelled",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let message = humanize(err);
    let reason = reason_name(err);
    let details = match err.downcast_ref::<RoastError>() {
        Some(RoastError::GateRejected(v)) => Some(json!({
            "signal": v.signal(),
            "value": v.value(),
            "max": v.max(),
        })),
        Some(RoastError::InsufficientPoints { kind, needed, got }) => Some(json!({
            "model": kind,
            "needed": needed,
            "got": got,
        })),
        _ => None,
    };
    match details {
        Some(d) => json!({ "reason": reason, "details": d, "message": message }),
        None => json!({ "reason": reason, "message": message }),
    }
    .to_string()
}
