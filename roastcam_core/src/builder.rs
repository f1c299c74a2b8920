//! Type-state builder for the boxed `RoastMeter` and the generic
//! `build_pipeline` constructor.
//!
//! The builder enforces at compile time that a frame source and a region
//! provider are supplied before `build()` is available. `try_build()` is
//! always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use roastcam_traits::clock::{Clock, MonotonicClock};
use roastcam_traits::{FrameSource, RegionProvider, SettingsStore};

use crate::config::PipelineCfg;
use crate::error::{BuildError, Result};
use crate::mocks::MemoryStore;
use crate::pipeline::Pipeline;
use crate::session::Session;
use crate::status::PipelineState;

/// Pipeline over boxed collaborators, as assembled by the builder.
pub type RoastMeter =
    Pipeline<Box<dyn FrameSource>, Box<dyn RegionProvider>, Box<dyn SettingsStore>>;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

pub struct PipelineBuilder<FS, RG> {
    source: Option<Box<dyn FrameSource>>,
    regions: Option<Box<dyn RegionProvider>>,
    store: Option<Box<dyn SettingsStore>>,
    cfg: Option<PipelineCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    cancel: Option<Arc<AtomicBool>>,
    _fs: PhantomData<FS>,
    _rg: PhantomData<RG>,
}

impl Default for PipelineBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            source: None,
            regions: None,
            store: None,
            cfg: None,
            clock: None,
            cancel: None,
            _fs: PhantomData,
            _rg: PhantomData,
        }
    }
}

impl RoastMeter {
    pub fn builder() -> PipelineBuilder<Missing, Missing> {
        PipelineBuilder::default()
    }
}

/// Reject configurations the pipeline can't run with.
fn validate_cfg(cfg: &PipelineCfg) -> Result<()> {
    let invalid = |msg: &'static str| Err(eyre::Report::new(BuildError::InvalidConfig(msg)));
    let s = &cfg.sampling;
    if s.sample_stride == 0 || s.reference_stride == 0 || s.white_stride == 0 || s.gray_stride == 0
    {
        return invalid("sampling strides must be >= 1");
    }
    if !(0.0..1.0).contains(&s.highlight_reject_fraction) {
        return invalid("highlight_reject_fraction must be in [0.0, 1.0)");
    }
    if !(cfg.ema_alpha > 0.0 && cfg.ema_alpha <= 1.0) {
        return invalid("ema_alpha must be in (0.0, 1.0]");
    }
    if cfg.measure.frames == 0 {
        return invalid("measure frames must be >= 1");
    }
    if !(cfg.fit.ridge_linear >= 0.0 && cfg.fit.ridge_poly >= 0.0) {
        return invalid("ridge penalties must be >= 0");
    }
    if !(cfg.formula.scale.is_finite() && cfg.formula.offset.is_finite()) {
        return invalid("scale and offset must be finite");
    }
    let g = &cfg.gate_profile;
    if ![g.glare_max, g.wb_deviation_max, g.stability_max]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0)
    {
        return invalid("gate thresholds must be finite and >= 0");
    }
    if cfg.device_tag.trim().is_empty() {
        return invalid("device tag must not be empty");
    }
    Ok(())
}

/// Single source of truth for validation and construction.
fn validate_and_build<F, R, S>(
    source: F,
    regions: R,
    store: S,
    cfg: PipelineCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<Pipeline<F, R, S>>
where
    F: FrameSource,
    R: RegionProvider,
    S: SettingsStore,
{
    validate_cfg(&cfg)?;
    let session = Session::new(&cfg);
    Ok(Pipeline {
        source,
        regions,
        store,
        clock: clock.unwrap_or_else(|| Arc::new(MonotonicClock::new())),
        cancel,
        cfg,
        session,
        state: PipelineState::Idle,
    })
}

impl<FS, RG> PipelineBuilder<FS, RG> {
    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<RoastMeter> {
        let source = self
            .source
            .ok_or_else(|| eyre::Report::new(BuildError::MissingFrameSource))?;
        let regions = self
            .regions
            .ok_or_else(|| eyre::Report::new(BuildError::MissingRegions))?;
        let store = self
            .store
            .unwrap_or_else(|| Box::new(MemoryStore::default()));
        validate_and_build(
            source,
            regions,
            store,
            self.cfg.unwrap_or_default(),
            self.clock,
            self.cancel,
        )
    }

    /// Settings persistence; in-memory when not provided.
    pub fn with_settings_store(mut self, store: impl SettingsStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn with_config(mut self, cfg: PipelineCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Custom clock; `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Flag polled between measurement passes.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }
}

impl<RG> PipelineBuilder<Missing, RG> {
    pub fn with_frame_source(
        self,
        source: impl FrameSource + 'static,
    ) -> PipelineBuilder<Set, RG> {
        PipelineBuilder {
            source: Some(Box::new(source)),
            regions: self.regions,
            store: self.store,
            cfg: self.cfg,
            clock: self.clock,
            cancel: self.cancel,
            _fs: PhantomData,
            _rg: PhantomData,
        }
    }
}

impl<FS> PipelineBuilder<FS, Missing> {
    pub fn with_regions(
        self,
        regions: impl RegionProvider + 'static,
    ) -> PipelineBuilder<FS, Set> {
        PipelineBuilder {
            source: self.source,
            regions: Some(Box::new(regions)),
            store: self.store,
            cfg: self.cfg,
            clock: self.clock,
            cancel: self.cancel,
            _fs: PhantomData,
            _rg: PhantomData,
        }
    }
}

impl PipelineBuilder<Set, Set> {
    pub fn build(self) -> Result<RoastMeter> {
        self.try_build()
    }
}

/// Build a statically-dispatched pipeline from concrete collaborators.
pub fn build_pipeline<F, R, S>(
    source: F,
    regions: R,
    store: S,
    cfg: PipelineCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<Pipeline<F, R, S>>
where
    F: FrameSource,
    R: RegionProvider,
    S: SettingsStore,
{
    validate_and_build(source, regions, store, cfg, clock, cancel)
}
