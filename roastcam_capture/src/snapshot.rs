//! PNG export of frames (region snapshots).

use std::path::Path;

use image::{ImageFormat, RgbaImage};
use roastcam_traits::Frame;

use crate::error::{CaptureError, Result};

fn to_image(frame: &Frame) -> Result<RgbaImage> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.rgba.len() != expected || frame.is_empty() {
        return Err(CaptureError::BadBuffer {
            expected,
            got: frame.rgba.len(),
        });
    }
    RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone()).ok_or(
        CaptureError::BadBuffer {
            expected,
            got: frame.rgba.len(),
        },
    )
}

pub fn save_png(frame: &Frame, path: &Path) -> Result<()> {
    to_image(frame)?
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    tracing::info!(path = %path.display(), width = frame.width, height = frame.height, "snapshot written");
    Ok(())
}

pub fn encode_png(frame: &Frame) -> Result<Vec<u8>> {
    let img = to_image(frame)?;
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}
