//! The measurement pipeline: lifecycle, analysis passes, averaged
//! measurements and every session command.
//!
//! Single-threaded. The host drives live analysis through `on_tick()` at its
//! own cadence; the only suspension point is `Clock::sleep` between the
//! passes of an averaged measurement.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use roastcam_traits::{Clock, Frame, FrameSource, RegionProvider, SettingsStore};

use crate::calibration::CalibrationPoint;
use crate::category::{Scheme, classify};
use crate::color::{Lab, rgb_to_lab};
use crate::config::PipelineCfg;
use crate::error::{Result, RoastError, map_capture_error};
use crate::measurement_log::{MeasurementLog, MeasurementLogEntry};
use crate::model::{FitReport, ModelKind, fit};
use crate::quality::{
    GateName, GateProfile, advisories, glare_percent, readiness_score, white_balance_deviation,
};
use crate::roi::{
    Mode, PixelRect, Sample, Shape, crop, map_screen_region_to_buffer, reject_highlights,
    sample_pixels,
};
use crate::session::Session;
use crate::settings::{Settings, SettingsBlob, parse_settings};
use crate::status::{PassOutcome, PassResult, PipelineState};
use crate::util::round_to;
use crate::white_balance::{Ccm, WhiteBalance, compute_gains, correct};

/// Frame-averaged means before rounding.
#[derive(Debug, Clone, Copy, Default)]
struct Averages {
    l: f64,
    a: f64,
    b: f64,
    score: f64,
    glare: f64,
    wb_deviation: f64,
    readiness: f64,
    n: usize,
}

impl Averages {
    fn add(&mut self, r: &PassResult) {
        self.l += r.lab.l;
        self.a += r.lab.a;
        self.b += r.lab.b;
        self.score += r.score;
        self.glare += r.glare;
        self.wb_deviation += r.wb_deviation;
        self.readiness += r.readiness;
        self.n += 1;
    }

    fn finish(self) -> Option<Self> {
        if self.n == 0 {
            return None;
        }
        let n = self.n as f64;
        Some(Self {
            l: self.l / n,
            a: self.a / n,
            b: self.b / n,
            score: self.score / n,
            glare: self.glare / n,
            wb_deviation: self.wb_deviation / n,
            readiness: self.readiness / n,
            n: self.n,
        })
    }
}

pub struct Pipeline<F: FrameSource, R: RegionProvider, S: SettingsStore> {
    pub(crate) source: F,
    pub(crate) regions: R,
    pub(crate) store: S,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) cancel: Option<Arc<AtomicBool>>,
    pub(crate) cfg: PipelineCfg,
    pub(crate) session: Session,
    pub(crate) state: PipelineState,
}

impl<F: FrameSource, R: RegionProvider, S: SettingsStore> core::fmt::Debug for Pipeline<F, R, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pipeline")
            .field("state", &self.state)
            .field("gate", &self.session.gate)
            .field("mode", &self.session.mode)
            .field("model", &self.session.scorer.model_name())
            .field("points", &self.session.points.len())
            .field("log", &self.session.log.len())
            .finish()
    }
}

impl<F: FrameSource, R: RegionProvider, S: SettingsStore> Pipeline<F, R, S> {
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &PipelineCfg {
        &self.cfg
    }

    pub fn log(&self) -> &MeasurementLog {
        &self.session.log
    }

    pub fn source(&self) -> &F {
        &self.source
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Acquire the capture resource. No-op when already started.
    pub fn start(&mut self) -> Result<()> {
        if self.state.is_started() {
            return Ok(());
        }
        if let Err(e) = self.source.start() {
            tracing::warn!(error = %e, "frame source failed to start");
            return Err(eyre::Report::new(RoastError::CaptureUnavailable(
                e.to_string(),
            )));
        }
        self.state = PipelineState::Running;
        tracing::info!("capture started");
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            PipelineState::Running => {
                self.state = PipelineState::Paused;
                Ok(())
            }
            other => Err(state_error(format!("cannot pause while {other:?}"))),
        }
    }

    pub fn resume(&mut self) -> Result<()> {
        match self.state {
            PipelineState::Paused => {
                self.state = PipelineState::Running;
                Ok(())
            }
            other => Err(state_error(format!("cannot resume while {other:?}"))),
        }
    }

    /// Release the capture resource and return to Idle.
    pub fn stop(&mut self) {
        if self.state.is_started() {
            self.source.stop();
            tracing::info!("capture stopped");
        }
        self.state = PipelineState::Idle;
    }

    /// One live pass when Running; `None` while Idle or Paused.
    pub fn on_tick(&mut self) -> Result<Option<PassOutcome>> {
        if self.state != PipelineState::Running {
            return Ok(None);
        }
        self.pass().map(Some)
    }

    /// One analysis pass regardless of pause.
    pub fn analyze_once(&mut self) -> Result<PassOutcome> {
        self.require_started()?;
        self.pass()
    }

    // ── Measurement ──────────────────────────────────────────────────────────

    /// Averaged measurement with the configured frame count and delay.
    pub fn measure_configured(&mut self) -> Result<MeasurementLogEntry> {
        let m = self.cfg.measure;
        self.measure(m.frames, m.delay)
    }

    /// Quality-gated, frame-averaged measurement appended to the log.
    ///
    /// A pre-check pass is gated against the active profile first; rejection
    /// leaves the log untouched. Then `frames` passes run, each preceded by
    /// `delay` on the injected clock.
    pub fn measure(&mut self, frames: u32, delay: Duration) -> Result<MeasurementLogEntry> {
        self.require_started()?;
        let pre = self
            .pass()?
            .into_result()
            .ok_or_else(|| eyre::Report::new(RoastError::NoFrame))?;
        if let Err(v) = self
            .session
            .gate_profile
            .check(pre.glare, pre.wb_deviation, pre.stability)
        {
            tracing::warn!(
                signal = v.signal(),
                value = v.value(),
                max = v.max(),
                gate = %self.session.gate,
                "measurement rejected by quality gate"
            );
            return Err(eyre::Report::new(RoastError::GateRejected(v)));
        }

        let avg = self.average_passes(frames, delay)?;
        let category = classify(avg.score, self.session.scheme);
        let formula = self.session.scorer.formula;
        let entry = MeasurementLogEntry {
            time: DateTime::<Utc>::from(self.clock.system_time()),
            lab: Lab::new(round_to(avg.l, 1), round_to(avg.a, 1), round_to(avg.b, 1)),
            score: round_to(avg.score, 1),
            category: category.name,
            model: self.session.scorer.model_name(),
            scale: formula.scale,
            offset: formula.offset,
            glare: round_to(avg.glare, 1),
            wb_deviation: round_to(avg.wb_deviation, 1),
            readiness: round_to(avg.readiness, 0),
            frames: avg.n,
            gate: self.session.gate,
            mode: self.session.mode,
            device: self.session.device_tag.clone(),
        };
        tracing::info!(
            score = entry.score,
            l = entry.lab.l,
            category = entry.category,
            frames = entry.frames,
            model = entry.model,
            "measurement recorded"
        );
        self.session.log.push(entry.clone());
        Ok(entry)
    }

    fn average_passes(&mut self, frames: u32, delay: Duration) -> Result<Averages> {
        let mut acc = Averages::default();
        for _ in 0..frames.max(1) {
            self.clock.sleep(delay);
            if self.is_cancelled() {
                tracing::info!(completed = acc.n, "measurement cancelled");
                return Err(eyre::Report::new(RoastError::Cancelled));
            }
            if let PassOutcome::Analysis(r) = self.pass()? {
                acc.add(&r);
            }
        }
        acc.finish()
            .ok_or_else(|| eyre::Report::new(RoastError::NoFrame))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|c| c.load(Ordering::SeqCst))
    }

    // ── White balance ────────────────────────────────────────────────────────

    /// Gains from a white card in the reference patch.
    pub fn calibrate_white(&mut self) -> Result<WhiteBalance> {
        let wb = self.reference_gains(self.cfg.sampling.white_stride)?;
        self.session.gains = wb.gains;
        self.session.reference_means = Some(wb.means);
        self.session.stability.reset();
        tracing::info!(
            r = wb.gains.r,
            g = wb.gains.g,
            b = wb.gains.b,
            "white calibration applied"
        );
        Ok(wb)
    }

    /// Gains from a gray card at the denser stride; resets the CCM.
    pub fn calibrate_gray(&mut self) -> Result<WhiteBalance> {
        let wb = self.reference_gains(self.cfg.sampling.gray_stride)?;
        self.session.gains = wb.gains;
        self.session.ccm = Ccm::IDENTITY;
        self.session.reference_means = Some(wb.means);
        self.session.stability.reset();
        tracing::info!(
            r = wb.gains.r,
            g = wb.gains.g,
            b = wb.gains.b,
            "gray calibration applied"
        );
        Ok(wb)
    }

    fn reference_gains(&mut self, stride: u32) -> Result<WhiteBalance> {
        self.require_started()?;
        let frame = self.acquire_frame()?;
        if frame.is_empty() {
            return Err(eyre::Report::new(RoastError::NoFrame));
        }
        let (_, rref) = self.buffer_rects(&frame);
        compute_gains(sample_pixels(&frame, rref, Shape::Rect, stride))
            .ok_or_else(|| eyre::Report::new(RoastError::EmptyRegion("reference")))
    }

    // ── Calibration points & model ───────────────────────────────────────────

    pub fn add_calibration_point(&mut self, reference_score: f64, lab: Lab) -> Result<()> {
        let p = CalibrationPoint::new(reference_score, lab);
        if !p.is_finite() {
            return Err(state_error("calibration point values must be finite".into()));
        }
        self.session.points.push(p);
        tracing::info!(
            score = reference_score,
            l = lab.l,
            n = self.session.points.len(),
            "calibration point added"
        );
        Ok(())
    }

    /// Measure the current sample (configured frames, no gate, no log entry)
    /// and record it against `reference_score`.
    pub fn capture_calibration_point(&mut self, reference_score: f64) -> Result<CalibrationPoint> {
        self.require_started()?;
        let m = self.cfg.measure;
        let avg = self.average_passes(m.frames, m.delay)?;
        let lab = Lab::new(avg.l, avg.a, avg.b);
        self.add_calibration_point(reference_score, lab)?;
        Ok(CalibrationPoint::new(reference_score, lab))
    }

    pub fn clear_points(&mut self) {
        self.session.points.clear();
        tracing::info!("calibration points cleared");
    }

    /// Fit `kind` over the stored points with the configured ridge penalty.
    /// The active model is left unchanged on failure.
    pub fn fit_model(&mut self, kind: ModelKind) -> Result<FitReport> {
        let lambda = match kind {
            ModelKind::Linear => self.cfg.fit.ridge_linear,
            ModelKind::Polynomial => self.cfg.fit.ridge_poly,
        };
        let report = fit(&self.session.points, kind, lambda)?;
        self.session.scorer.fitted = Some(report.model);
        Ok(report)
    }

    /// Drop the fitted model; scoring falls back to the formula.
    pub fn clear_model(&mut self) {
        self.session.scorer.fitted = None;
    }

    // ── Settings surface ─────────────────────────────────────────────────────

    pub fn set_scale(&mut self, scale: f64) -> Result<()> {
        if !scale.is_finite() {
            return Err(state_error("scale must be finite".into()));
        }
        self.session.scorer.formula.scale = scale;
        Ok(())
    }

    pub fn set_offset(&mut self, offset: f64) -> Result<()> {
        if !offset.is_finite() {
            return Err(state_error("offset must be finite".into()));
        }
        self.session.scorer.formula.offset = offset;
        Ok(())
    }

    pub fn set_scheme(&mut self, scheme: Scheme) {
        self.session.scheme = scheme;
    }

    pub fn set_gate(&mut self, gate: GateName) {
        self.session.gate = gate;
        self.session.gate_profile = self.profile_for(gate);
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.session.mode = mode;
    }

    /// Preset thresholds, except the configured gate keeps its overrides.
    fn profile_for(&self, gate: GateName) -> GateProfile {
        if gate == self.cfg.gate {
            self.cfg.gate_profile
        } else {
            GateProfile::for_name(gate)
        }
    }

    // ── Persistence & export ─────────────────────────────────────────────────

    /// Persist gains, CCM, formula, selections, model and points.
    pub fn save(&mut self) -> Result<()> {
        let bytes = SettingsBlob::from_session(&self.session).to_json()?;
        self.store
            .save(&bytes)
            .map_err(|e| eyre::Report::new(RoastError::Storage(e.to_string())))?;
        tracing::debug!(bytes = bytes.len(), "settings saved");
        Ok(())
    }

    /// Restore persisted settings. `Ok(false)` when nothing is stored.
    pub fn load(&mut self) -> Result<bool> {
        let blob = self
            .store
            .load()
            .map_err(|e| eyre::Report::new(RoastError::Storage(e.to_string())))?;
        let Some(bytes) = blob else {
            return Ok(false);
        };
        let settings = parse_settings(&bytes)?;
        self.apply(settings);
        tracing::info!(
            model = self.session.scorer.model_name(),
            points = self.session.points.len(),
            "settings restored"
        );
        Ok(true)
    }

    /// Stop capture, forget everything (log included) and clear the store.
    pub fn reset(&mut self) -> Result<()> {
        self.stop();
        self.session = Session::new(&self.cfg);
        self.store
            .clear()
            .map_err(|e| eyre::Report::new(RoastError::Storage(e.to_string())))?;
        tracing::info!("session reset");
        Ok(())
    }

    pub fn export_model(&self) -> Result<Vec<u8>> {
        SettingsBlob::from_session(&self.session).to_json()
    }

    /// Validate a settings blob in full, apply it and persist it.
    /// The session is rolled back when the store write fails.
    pub fn import_model(&mut self, bytes: &[u8]) -> Result<()> {
        let settings = parse_settings(bytes).inspect_err(|e| {
            tracing::warn!(error = %e, "settings import rejected");
        })?;
        let previous = self.session.clone();
        self.apply(settings);
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "imported settings could not be persisted");
            self.session = previous;
            return Err(e);
        }
        tracing::info!(model = self.session.scorer.model_name(), "settings imported");
        Ok(())
    }

    pub fn export_csv<W: Write>(&self, out: W) -> Result<()> {
        self.session
            .log
            .write_csv(out)
            .map_err(|e| eyre::Report::new(RoastError::Storage(e.to_string())))
    }

    /// Current frame cropped to the sample region's bounding rectangle.
    pub fn snapshot_region(&mut self) -> Result<Frame> {
        self.require_started()?;
        let frame = self.acquire_frame()?;
        if frame.is_empty() {
            return Err(eyre::Report::new(RoastError::NoFrame));
        }
        let (rect, _) = self.buffer_rects(&frame);
        Ok(crop(&frame, rect))
    }

    fn apply(&mut self, s: Settings) {
        self.session.gains = s.gains;
        self.session.ccm = s.ccm;
        self.session.scorer.formula = s.formula;
        self.session.scorer.fitted = s.model;
        self.session.scheme = s.scheme;
        self.session.gate = s.gate;
        self.session.gate_profile = self.profile_for(s.gate);
        self.session.mode = s.mode;
        self.session.points = s.points;
        self.session.stability.reset();
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn require_started(&self) -> Result<()> {
        if self.state.is_started() {
            Ok(())
        } else {
            Err(state_error("capture is not started".into()))
        }
    }

    fn acquire_frame(&mut self) -> Result<Frame> {
        self.source
            .current_frame()
            .map_err(|e| eyre::Report::new(map_capture_error(&*e)))
    }

    fn buffer_rects(&self, frame: &Frame) -> (PixelRect, PixelRect) {
        let display = self.regions.display_rect();
        let sample = map_screen_region_to_buffer(
            self.regions.sample_region(),
            display,
            frame.width,
            frame.height,
        );
        let reference = map_screen_region_to_buffer(
            self.regions.reference_region(),
            display,
            frame.width,
            frame.height,
        );
        (sample, reference)
    }

    fn pass(&mut self) -> Result<PassOutcome> {
        let frame = self.acquire_frame()?;
        if frame.is_empty() {
            tracing::debug!("empty frame; pass skipped");
            return Ok(PassOutcome::NoData);
        }
        let sc = self.cfg.sampling;
        let (srect, rrect) = self.buffer_rects(&frame);

        let glare = glare_percent(sample_pixels(&frame, srect, Shape::Rect, 1), sc.glare_level);
        let wb = white_balance_deviation(sample_pixels(
            &frame,
            rrect,
            Shape::Rect,
            sc.reference_stride,
        ));

        let mut samples: Vec<Sample> =
            sample_pixels(&frame, srect, Shape::Circle, sc.sample_stride).collect();
        if self.session.mode == Mode::Bean {
            samples = reject_highlights(samples, sc.highlight_reject_fraction);
        }
        if samples.is_empty() {
            tracing::debug!("sample region empty; pass skipped");
            return Ok(PassOutcome::NoData);
        }

        let (gains, ccm) = (self.session.gains, self.session.ccm);
        let (mut sl, mut sa, mut sb) = (0.0, 0.0, 0.0);
        for s in &samples {
            let lab = rgb_to_lab(correct(*s, &gains, &ccm));
            sl += lab.l;
            sa += lab.a;
            sb += lab.b;
        }
        let n = samples.len() as f64;
        let lab = Lab::new(sl / n, sa / n, sb / n);

        let stability = self.session.stability.update(lab.l);
        let score = self.session.scorer.predict(&lab);
        let category = classify(score, self.session.scheme);
        let readiness = readiness_score(glare, wb.max_deviation, stability);
        let result = PassResult {
            lab,
            score,
            category,
            glare,
            wb_deviation: wb.max_deviation,
            stability,
            readiness,
            advisories: advisories(glare, wb.max_deviation, stability),
            samples: samples.len(),
        };
        tracing::debug!(
            l = lab.l,
            a = lab.a,
            b = lab.b,
            score,
            glare,
            wb_dev = wb.max_deviation,
            stability,
            "analysis pass"
        );
        Ok(PassOutcome::Analysis(result))
    }
}

fn state_error(msg: String) -> eyre::Report {
    eyre::Report::new(RoastError::State(msg))
}
