#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and calibration-point parsing for the roast estimator.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Calibration CSV loader enforces headers and rejects non-finite values
//!   before the rows ever reach the model fitter.
use serde::Deserialize;

/// Calibration CSV schema.
///
/// Expected headers:
/// agtron,L,a,b
///
/// Example:
/// agtron,L,a,b
/// 72.0,51.3,6.1,18.4
/// 48.5,33.0,8.8,14.2
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct CalibrationRow {
    pub agtron: f64,
    #[serde(rename = "L")]
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingCfg {
    /// Grid step inside the sample circle
    pub sample_stride: u32,
    /// Grid step over the reference patch for the per-pass WB deviation
    pub reference_stride: u32,
    /// Grid step for white-card calibration
    pub white_stride: u32,
    /// Grid step for gray-card calibration (denser than white)
    pub gray_stride: u32,
    /// Max-channel level at or above which a pixel counts as glare
    pub glare_level: u8,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self {
            sample_stride: 3,
            reference_stride: 6,
            white_stride: 4,
            gray_stride: 2,
            glare_level: 250,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StabilityCfg {
    /// EMA smoothing factor for L*. Range: (0.0, 1.0].
    pub ema_alpha: f64,
}

impl Default for StabilityCfg {
    fn default() -> Self {
        Self { ema_alpha: 0.2 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeasureCfg {
    /// Passes averaged after the quality pre-check
    pub frames: u32,
    /// Pause between passes (ms)
    pub delay_ms: u64,
}

impl Default for MeasureCfg {
    fn default() -> Self {
        Self {
            frames: 18,
            delay_ms: 25,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GateName {
    Strict,
    #[default]
    Normal,
    Relaxed,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct QualityCfg {
    /// Active gate profile
    pub profile: GateName,
    /// Optional overrides applied on top of the selected profile
    pub glare_max: Option<f64>,
    pub wb_deviation_max: Option<f64>,
    pub stability_max: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SchemeName {
    #[default]
    Gourmet,
    Commercial,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModeName {
    #[default]
    Ground,
    Bean,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelCfg {
    /// Fallback formula: score = scale * L + offset
    pub scale: f64,
    pub offset: f64,
    pub scheme: SchemeName,
    pub mode: ModeName,
    /// Ridge penalty for the linear-in-L fit
    pub ridge_linear: f64,
    /// Ridge penalty for the polynomial fit
    pub ridge_poly: f64,
    /// Fraction of brightest samples dropped in bean mode. Range: [0.0, 1.0).
    pub highlight_reject_fraction: f64,
}

impl Default for ModelCfg {
    fn default() -> Self {
        Self {
            scale: 1.20,
            offset: 10.0,
            scheme: SchemeName::Gourmet,
            mode: ModeName::Ground,
            ridge_linear: 0.01,
            ridge_poly: 0.1,
            highlight_reject_fraction: 0.10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureCfg {
    /// Tag written into every measurement record
    pub device_tag: String,
    /// Simulated camera resolution
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureCfg {
    fn default() -> Self {
        Self {
            device_tag: "default".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageCfg {
    /// Settings blob location (JSON)
    pub settings_path: String,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            settings_path: "roastcam_settings.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub sampling: SamplingCfg,
    pub stability: StabilityCfg,
    pub measure: MeasureCfg,
    pub quality: QualityCfg,
    pub model: ModelCfg,
    pub capture: CaptureCfg,
    pub storage: StorageCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_calibration_csv(path: &std::path::Path) -> eyre::Result<Vec<CalibrationRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["agtron", "L", "a", "b"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "calibration CSV must have headers 'agtron,L,a,b', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationRow>().enumerate() {
        match rec {
            Ok(row) => {
                if ![row.agtron, row.l, row.a, row.b]
                    .iter()
                    .all(|v| v.is_finite())
                {
                    eyre::bail!("calibration CSV row {} has non-finite values", idx + 2);
                }
                rows.push(row);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sampling
        for (name, v) in [
            ("sampling.sample_stride", self.sampling.sample_stride),
            ("sampling.reference_stride", self.sampling.reference_stride),
            ("sampling.white_stride", self.sampling.white_stride),
            ("sampling.gray_stride", self.sampling.gray_stride),
        ] {
            if v == 0 {
                eyre::bail!("{name} must be >= 1");
            }
        }
        if self.sampling.gray_stride > self.sampling.white_stride {
            eyre::bail!("sampling.gray_stride must not exceed sampling.white_stride");
        }
        if self.sampling.glare_level == 0 {
            eyre::bail!("sampling.glare_level must be > 0");
        }

        // Stability
        let alpha = self.stability.ema_alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            eyre::bail!("stability.ema_alpha must be in (0.0, 1.0]");
        }

        // Measure
        if self.measure.frames == 0 {
            eyre::bail!("measure.frames must be >= 1");
        }
        if self.measure.delay_ms > 10_000 {
            eyre::bail!("measure.delay_ms is unreasonably large (>10s)");
        }

        // Quality overrides
        for (name, v) in [
            ("quality.glare_max", self.quality.glare_max),
            ("quality.wb_deviation_max", self.quality.wb_deviation_max),
            ("quality.stability_max", self.quality.stability_max),
        ] {
            if let Some(x) = v
                && !(x.is_finite() && x >= 0.0)
            {
                eyre::bail!("{name} must be a finite value >= 0");
            }
        }
        if let Some(g) = self.quality.glare_max
            && g > 100.0
        {
            eyre::bail!("quality.glare_max must be <= 100 (percent)");
        }

        // Model
        if !self.model.scale.is_finite() || !self.model.offset.is_finite() {
            eyre::bail!("model.scale and model.offset must be finite");
        }
        if !(self.model.ridge_linear.is_finite() && self.model.ridge_linear >= 0.0) {
            eyre::bail!("model.ridge_linear must be >= 0");
        }
        if !(self.model.ridge_poly.is_finite() && self.model.ridge_poly >= 0.0) {
            eyre::bail!("model.ridge_poly must be >= 0");
        }
        let f = self.model.highlight_reject_fraction;
        if !(0.0..1.0).contains(&f) {
            eyre::bail!("model.highlight_reject_fraction must be in [0.0, 1.0)");
        }

        // Capture
        if self.capture.device_tag.trim().is_empty() {
            eyre::bail!("capture.device_tag must not be empty");
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            eyre::bail!("capture.width and capture.height must be >= 1");
        }

        // Storage
        if self.storage.settings_path.trim().is_empty() {
            eyre::bail!("storage.settings_path must not be empty");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
