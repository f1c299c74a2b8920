//! Test and helper doubles for `roastcam_core`.

use std::collections::VecDeque;

use roastcam_traits::{BoxError, Frame, FrameSource, SettingsStore};

use crate::roi::default_layout;

/// Frame source replaying a script; the last frame repeats forever.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    frames: VecDeque<Frame>,
    last: Frame,
    started: bool,
    /// When set, `start` fails with this message
    pub fail_start: Option<String>,
}

impl ScriptedSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Repeat one frame.
    pub fn constant(frame: Frame) -> Self {
        Self::new([frame])
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_start: Some(msg.to_string()),
            ..Self::default()
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl FrameSource for ScriptedSource {
    fn start(&mut self) -> Result<(), BoxError> {
        if let Some(msg) = &self.fail_start {
            return Err(Box::new(std::io::Error::other(msg.clone())));
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn current_frame(&mut self) -> Result<Frame, BoxError> {
        if !self.started {
            return Err(Box::new(std::io::Error::other("source not started")));
        }
        if let Some(f) = self.frames.pop_front() {
            self.last = f;
        }
        Ok(self.last.clone())
    }
}

/// In-memory settings store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub blob: Option<Vec<u8>>,
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Option<Vec<u8>>, BoxError> {
        Ok(self.blob.clone())
    }
    fn save(&mut self, blob: &[u8]) -> Result<(), BoxError> {
        self.blob = Some(blob.to_vec());
        Ok(())
    }
    fn clear(&mut self) -> Result<(), BoxError> {
        self.blob = None;
        Ok(())
    }
}

/// A `width`×`height` frame filled with `background`, the default-layout
/// sample square painted `sample` and the reference patch painted `reference`.
pub fn layout_frame(
    width: u32,
    height: u32,
    background: [u8; 3],
    sample: [u8; 3],
    reference: [u8; 3],
) -> Frame {
    let display = roastcam_traits::ScreenRect::new(0.0, 0.0, f64::from(width), f64::from(height));
    let layout = default_layout(display);
    let inside = |r: roastcam_traits::ScreenRect, x: u32, y: u32| {
        let (x, y) = (f64::from(x), f64::from(y));
        x >= r.left.floor() && x < (r.left + r.width).ceil() && y >= r.top.floor() && y < (r.top + r.height).ceil()
    };
    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let c = if inside(layout.reference, x, y) {
                reference
            } else if inside(layout.sample, x, y) {
                sample
            } else {
                background
            };
            rgba.extend_from_slice(&[c[0], c[1], c[2], 255]);
        }
    }
    Frame::new(rgba, width, height)
}
