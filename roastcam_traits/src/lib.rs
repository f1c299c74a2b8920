//! Collaborator interfaces for the roast estimator.
//!
//! The core never talks to a camera, a display tree or a storage backend
//! directly; it goes through the traits in this crate.
pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One captured frame as tightly packed RGBA8, row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(rgba: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            rgba,
            width,
            height,
        }
    }

    /// A frame with zero width or height carries no usable pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// RGB at `(x, y)`, or None when outside the buffer or the buffer is short.
    #[inline]
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba.get(i..i + 3)?;
        Some([px[0], px[1], px[2]])
    }
}

/// Axis-aligned rectangle in display coordinates (CSS-like pixels, may be fractional).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Source of live frames (camera, file, simulator).
pub trait FrameSource {
    /// Acquire the capture resource. Errors mean capture is unavailable.
    fn start(&mut self) -> Result<(), BoxError>;
    /// Release the capture resource (best-effort).
    fn stop(&mut self);
    /// Latest frame. Fails before `start` or when the device went away.
    fn current_frame(&mut self) -> Result<Frame, BoxError>;
}

/// Where the sample circle and the reference patch sit on screen.
pub trait RegionProvider {
    fn sample_region(&self) -> ScreenRect;
    fn reference_region(&self) -> ScreenRect;
    /// Rectangle of the displayed (possibly scaled) video element.
    fn display_rect(&self) -> ScreenRect;
}

/// Opaque key-value blob persistence for settings.
pub trait SettingsStore {
    fn load(&self) -> Result<Option<Vec<u8>>, BoxError>;
    fn save(&mut self, blob: &[u8]) -> Result<(), BoxError>;
    fn clear(&mut self) -> Result<(), BoxError>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn start(&mut self) -> Result<(), BoxError> {
        (**self).start()
    }
    fn stop(&mut self) {
        (**self).stop()
    }
    fn current_frame(&mut self) -> Result<Frame, BoxError> {
        (**self).current_frame()
    }
}

impl<T: RegionProvider + ?Sized> RegionProvider for Box<T> {
    fn sample_region(&self) -> ScreenRect {
        (**self).sample_region()
    }
    fn reference_region(&self) -> ScreenRect {
        (**self).reference_region()
    }
    fn display_rect(&self) -> ScreenRect {
        (**self).display_rect()
    }
}

impl<T: SettingsStore + ?Sized> SettingsStore for Box<T> {
    fn load(&self) -> Result<Option<Vec<u8>>, BoxError> {
        (**self).load()
    }
    fn save(&mut self, blob: &[u8]) -> Result<(), BoxError> {
        (**self).save(blob)
    }
    fn clear(&mut self) -> Result<(), BoxError> {
        (**self).clear()
    }
}
