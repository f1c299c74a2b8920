#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Roast-level estimation from camera frames (capture-agnostic).
//!
//! This crate holds the colorimetric pipeline and the calibration engine. All
//! capture, geometry and persistence go through the `roastcam_traits`
//! `FrameSource`, `RegionProvider` and `SettingsStore` traits.
//!
//! ## Architecture
//!
//! - **Color**: sRGB companding, XYZ (D65), CIE L*a*b* (`color`)
//! - **Sampling**: region mapping, circle/rect grids, highlight trimming (`roi`)
//! - **White balance**: per-channel gains and CCM correction (`white_balance`)
//! - **Quality**: glare, WB deviation, EMA stability, readiness, gate (`quality`)
//! - **Scoring**: formula or fitted regression, ridge solver, categories
//!   (`model`, `solver`, `category`)
//! - **Pipeline**: lifecycle, passes, averaged measurements, commands (`pipeline`)
//! - **Persistence**: versioned settings blob, CSV measurement log
//!   (`settings`, `measurement_log`)

pub mod builder;
pub mod calibration;
pub mod category;
pub mod color;
pub mod config;
pub mod conversions;
pub mod error;
pub mod measurement_log;
pub mod mocks;
pub mod model;
pub mod pipeline;
pub mod quality;
pub mod roi;
pub mod session;
pub mod settings;
pub mod solver;
pub mod status;
pub mod util;
pub mod white_balance;

pub use builder::{Missing, PipelineBuilder, RoastMeter, Set, build_pipeline};
pub use calibration::CalibrationPoint;
pub use category::{Category, Scheme, classify};
pub use color::Lab;
pub use config::{FitCfg, MeasureCfg, PipelineCfg, SamplingCfg};
pub use error::{BuildError, GateViolation, Result, RoastError};
pub use measurement_log::{MeasurementLog, MeasurementLogEntry};
pub use model::{FitReport, LinearFormula, ModelKind, ScoreModel, Scorer, gauge_percent};
pub use pipeline::Pipeline;
pub use quality::{Advisory, GateName, GateProfile};
pub use roi::{LayoutRegions, Mode};
pub use session::Session;
pub use settings::{Settings, SettingsBlob, parse_settings};
pub use status::{PassOutcome, PassResult, PipelineState};
pub use white_balance::{Ccm, GainVector, WhiteBalance};
