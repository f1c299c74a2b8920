#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Frame sources, settings storage and image export for the roast estimator.
//!
//! - `SimulatedCamera`: renders a synthetic scene, no hardware needed
//! - `StillImageSource`: serves a decoded PNG/JPEG for offline analysis
//! - `FileSettingsStore`: settings blob in a file, written atomically
//! - `save_png` / `encode_png`: snapshot export
pub mod error;
pub mod sim;
pub mod snapshot;
pub mod still;
pub mod store;

pub use error::CaptureError;
pub use sim::{Scene, SimulatedCamera};
pub use snapshot::{encode_png, save_png};
pub use still::{StillImageSource, load_frame};
pub use store::FileSettingsStore;
