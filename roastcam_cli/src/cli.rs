//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "roastcam", version, about = "Camera-based roast level estimator")]
pub struct Cli {
    /// Path to config TOML; defaults apply when the file does not exist
    #[arg(long, value_name = "FILE", default_value = "etc/roastcam.toml")]
    pub config: PathBuf,

    /// Emit JSON (results on stdout, logs on stderr) instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Frame source selection. Without `--image` the simulated camera is used.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Analyze a still PNG/JPEG instead of the simulated camera
    #[arg(long, value_name = "FILE", global = true)]
    pub image: Option<PathBuf>,

    /// Simulated sample color as R,G,B
    #[arg(long, value_name = "R,G,B", value_parser = parse_rgb, global = true)]
    pub sim_sample: Option<[u8; 3]>,

    /// Simulated reference card color as R,G,B
    #[arg(long, value_name = "R,G,B", value_parser = parse_rgb, global = true)]
    pub sim_reference: Option<[u8; 3]>,

    /// Side of a saturated glare spot, as a fraction of the sample side
    #[arg(long, value_name = "FRACTION", default_value_t = 0.0, global = true)]
    pub sim_glare: f64,

    /// Brightness drift per simulated frame, in 8-bit levels
    #[arg(long, value_name = "LEVELS", default_value_t = 0.0, global = true)]
    pub sim_drift: f64,
}

fn parse_rgb(s: &str) -> Result<[u8; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [r, g, b] = parts.as_slice() else {
        return Err(format!("expected R,G,B, got '{s}'"));
    };
    let ch = |v: &str| v.parse::<u8>().map_err(|e| format!("bad channel '{v}': {e}"));
    Ok([ch(r)?, ch(g)?, ch(b)?])
}

fn parse_lab(s: &str) -> Result<[f64; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [l, a, b] = parts.as_slice() else {
        return Err(format!("expected L,a,b, got '{s}'"));
    };
    let ch = |v: &str| {
        v.parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .ok_or_else(|| format!("bad component '{v}'"))
    };
    Ok([ch(l)?, ch(a)?, ch(b)?])
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CardKind {
    /// White card: gains from reference means
    White,
    /// Gray card: denser sampling, resets the color matrix
    Gray,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FitKind {
    /// w0 + w1·L; needs at least 2 calibration points
    Linear,
    /// w0 + w1·L + w2·a + w3·b + w4·L²; needs at least 5 calibration points
    Poly,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SchemeArg {
    Gourmet,
    Commercial,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum GateArg {
    Strict,
    Normal,
    Relaxed,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ModeArg {
    Ground,
    Bean,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run live analysis passes and print the last one
    Analyze {
        /// Number of passes
        #[arg(long, default_value_t = 1)]
        passes: u32,
    },
    /// Quality-gated, frame-averaged measurement
    Measure {
        /// Frames to average (default from config)
        #[arg(long)]
        frames: Option<u32>,
        /// Pause between frames in ms (default from config)
        #[arg(long, value_name = "MS")]
        delay_ms: Option<u64>,
        /// Write the measurement log as CSV
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// White-balance calibration against the reference card
    Calibrate {
        #[arg(value_enum)]
        card: CardKind,
    },
    /// Manage calibration points
    Point {
        #[command(subcommand)]
        action: PointCmd,
    },
    /// Fit a regression over the stored calibration points
    /// (linear needs 2 points, poly needs 5)
    Fit {
        #[arg(value_enum)]
        kind: FitKind,
    },
    /// Change formula and selections
    Set {
        #[arg(long, allow_negative_numbers = true)]
        scale: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        offset: Option<f64>,
        #[arg(long, value_enum)]
        scheme: Option<SchemeArg>,
        #[arg(long, value_enum)]
        gate: Option<GateArg>,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
    },
    /// Export, import or clear the fitted model and settings
    Model {
        #[command(subcommand)]
        action: ModelCmd,
    },
    /// Save the sample region of the current frame as PNG
    Snapshot {
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
    /// Forget all calibration and settings
    Reset,
    /// Quick health check (frame source delivers a frame)
    SelfCheck,
}

#[derive(Subcommand, Debug)]
pub enum PointCmd {
    /// Add a point; measures the current sample unless --lab is given
    Add {
        /// Reference Agtron number of the sample
        #[arg(long)]
        agtron: f64,
        /// Known L*,a*,b* instead of measuring
        #[arg(long, value_name = "L,a,b", value_parser = parse_lab, allow_hyphen_values = true)]
        lab: Option<[f64; 3]>,
    },
    /// Append points from a CSV with headers agtron,L,a,b
    Import { file: PathBuf },
    Clear,
    List,
}

#[derive(Subcommand, Debug)]
pub enum ModelCmd {
    /// Write the settings blob (stdout when --out is absent)
    Export {
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Validate and apply a settings blob
    Import { file: PathBuf },
    /// Drop the fitted model; scoring falls back to the formula
    Clear,
}
