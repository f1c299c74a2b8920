//! Synthetic camera for running without hardware.

use roastcam_traits::{BoxError, Frame, FrameSource, ScreenRect};

use crate::error::CaptureError;

/// What the simulated camera looks at, in buffer pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub background: [u8; 3],
    /// Bounding square of the coffee sample
    pub sample_rect: ScreenRect,
    pub sample: [u8; 3],
    /// White/gray card
    pub reference_rect: ScreenRect,
    pub reference: [u8; 3],
    /// Side of a saturated square at the sample's top-left corner, as a
    /// fraction of the sample side. 0 disables it.
    pub glare_fraction: f64,
    /// Brightness change per delivered frame, in 8-bit levels
    pub drift_per_frame: f64,
}

impl Scene {
    pub fn new(sample_rect: ScreenRect, reference_rect: ScreenRect) -> Self {
        Self {
            background: [24, 24, 24],
            sample_rect,
            sample: [120, 84, 56],
            reference_rect,
            reference: [245, 245, 245],
            glare_fraction: 0.0,
            drift_per_frame: 0.0,
        }
    }
}

/// Renders a [`Scene`] on every `current_frame` call.
#[derive(Debug, Clone)]
pub struct SimulatedCamera {
    width: u32,
    height: u32,
    scene: Scene,
    frames: u64,
    started: bool,
    unavailable: Option<String>,
}

impl SimulatedCamera {
    pub fn new(width: u32, height: u32, scene: Scene) -> Self {
        Self {
            width,
            height,
            scene,
            frames: 0,
            started: false,
            unavailable: None,
        }
    }

    /// A camera whose `start` always fails, e.g. permission denied.
    pub fn unavailable(reason: &str) -> Self {
        let mut cam = Self::new(0, 0, Scene::new(ScreenRect::default(), ScreenRect::default()));
        cam.unavailable = Some(reason.to_string());
        cam
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn frames_delivered(&self) -> u64 {
        self.frames
    }

    fn render(&self) -> Frame {
        let s = &self.scene;
        let shift = s.drift_per_frame * self.frames as f64;
        let drifted = |c: [u8; 3]| c.map(|v| (f64::from(v) + shift).round().clamp(0.0, 255.0) as u8);
        let sample = drifted(s.sample);
        let reference = drifted(s.reference);
        let glare_side = s.sample_rect.width.min(s.sample_rect.height) * s.glare_fraction.clamp(0.0, 1.0);
        let glare = ScreenRect::new(s.sample_rect.left, s.sample_rect.top, glare_side, glare_side);

        let mut rgba = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = if contains(&s.reference_rect, x, y) {
                    reference
                } else if glare_side > 0.0 && contains(&glare, x, y) {
                    [255, 255, 255]
                } else if contains(&s.sample_rect, x, y) {
                    sample
                } else {
                    s.background
                };
                rgba.extend_from_slice(&[c[0], c[1], c[2], 255]);
            }
        }
        Frame::new(rgba, self.width, self.height)
    }
}

fn contains(r: &ScreenRect, x: u32, y: u32) -> bool {
    let (x, y) = (f64::from(x), f64::from(y));
    x >= r.left.floor()
        && x < (r.left + r.width).ceil()
        && y >= r.top.floor()
        && y < (r.top + r.height).ceil()
}

impl FrameSource for SimulatedCamera {
    fn start(&mut self) -> Result<(), BoxError> {
        if let Some(reason) = &self.unavailable {
            return Err(Box::new(CaptureError::Unavailable(reason.clone())));
        }
        self.started = true;
        self.frames = 0;
        tracing::debug!(width = self.width, height = self.height, "simulated camera started");
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn current_frame(&mut self) -> Result<Frame, BoxError> {
        if !self.started {
            return Err(Box::new(CaptureError::NotStarted));
        }
        let frame = self.render();
        self.frames += 1;
        Ok(frame)
    }
}
