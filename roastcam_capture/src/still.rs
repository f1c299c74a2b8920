//! Frame source over a single decoded image file.

use std::path::{Path, PathBuf};

use roastcam_traits::{BoxError, Frame, FrameSource};

use crate::error::{CaptureError, Result};

/// Serves the same decoded image on every call. The file is read on `start`.
#[derive(Debug, Clone)]
pub struct StillImageSource {
    path: PathBuf,
    frame: Option<Frame>,
}

impl StillImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frame: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Decode a PNG/JPEG file into an RGBA8 frame.
pub fn load_frame(path: &Path) -> Result<Frame> {
    if !path.exists() {
        return Err(CaptureError::Unavailable(format!(
            "image not found: {}",
            path.display()
        )));
    }
    let img = image::open(path).map_err(|e| CaptureError::Decode(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    Ok(Frame::new(rgba.into_raw(), w, h))
}

impl FrameSource for StillImageSource {
    fn start(&mut self) -> std::result::Result<(), BoxError> {
        let frame = load_frame(&self.path)?;
        tracing::debug!(
            path = %self.path.display(),
            width = frame.width,
            height = frame.height,
            "still image loaded"
        );
        self.frame = Some(frame);
        Ok(())
    }

    fn stop(&mut self) {
        self.frame = None;
    }

    fn current_frame(&mut self) -> std::result::Result<Frame, BoxError> {
        self.frame
            .clone()
            .ok_or_else(|| Box::new(CaptureError::NotStarted) as BoxError)
    }
}
