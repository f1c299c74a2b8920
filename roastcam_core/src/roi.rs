//! Region-of-interest sampling over an RGBA frame buffer.
//!
//! Regions arrive in display coordinates from a `RegionProvider` and are
//! mapped onto integer buffer pixels before any sampling happens.

use roastcam_traits::{Frame, RegionProvider, ScreenRect};

/// One RGB pixel sample; alpha is dropped.
pub type Sample = [u8; 3];

/// Integer rectangle in buffer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Sampling footprint inside a region's bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Inscribed circle: radius is half the smaller region dimension.
    Circle,
    /// Every grid point of the rectangle.
    Rect,
}

/// Map a region's on-screen rectangle onto the full-resolution buffer.
///
/// Scale factors are independent per axis (`buffer / display`). The top-left
/// is clamped to >= 0 and the size to >= 1. A degenerate display rectangle
/// maps with unit scale.
pub fn map_screen_region_to_buffer(
    region: ScreenRect,
    display: ScreenRect,
    buffer_width: u32,
    buffer_height: u32,
) -> PixelRect {
    let sx = if display.width > 0.0 {
        f64::from(buffer_width) / display.width
    } else {
        1.0
    };
    let sy = if display.height > 0.0 {
        f64::from(buffer_height) / display.height
    } else {
        1.0
    };
    let x = ((region.left - display.left) * sx).round().max(0.0);
    let y = ((region.top - display.top) * sy).round().max(0.0);
    let w = (region.width * sx).round().max(1.0);
    let h = (region.height * sy).round().max(1.0);
    PixelRect {
        x: saturate_u32(x),
        y: saturate_u32(y),
        width: saturate_u32(w),
        height: saturate_u32(h),
    }
}

#[inline]
fn saturate_u32(v: f64) -> u32 {
    if !v.is_finite() || v <= 0.0 {
        0
    } else if v >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        v as u32
    }
}

/// Lazy grid walk over a region of a frame.
///
/// Cloning restarts the walk from the beginning of the region, so a single
/// `SampleIter` can feed several passes (means, glare, etc.).
#[derive(Debug, Clone)]
pub struct SampleIter<'a> {
    frame: &'a Frame,
    rect: PixelRect,
    shape: Shape,
    stride: u32,
    cx: i64,
    cy: i64,
    r2: i64,
    gx: u32,
    gy: u32,
}

impl Iterator for SampleIter<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        while self.gy < self.rect.height {
            let (gx, gy) = (self.gx, self.gy);
            self.gx = self.gx.saturating_add(self.stride);
            if self.gx >= self.rect.width {
                self.gx = 0;
                self.gy = self.gy.saturating_add(self.stride);
            }
            if self.shape == Shape::Circle {
                let dx = i64::from(gx) - self.cx;
                let dy = i64::from(gy) - self.cy;
                if dx * dx + dy * dy > self.r2 {
                    continue;
                }
            }
            let (Some(x), Some(y)) = (self.rect.x.checked_add(gx), self.rect.y.checked_add(gy))
            else {
                continue;
            };
            if let Some(px) = self.frame.rgb_at(x, y) {
                return Some(px);
            }
        }
        None
    }
}

/// Walk `rect` on a `stride` grid, yielding RGB samples.
///
/// For `Shape::Circle` only grid points with `dx² + dy² <= r²` around the
/// rectangle center are produced. Grid points outside the buffer are skipped.
/// A stride of 0 is treated as 1.
pub fn sample_pixels(frame: &Frame, rect: PixelRect, shape: Shape, stride: u32) -> SampleIter<'_> {
    let cx = i64::from(rect.width / 2);
    let cy = i64::from(rect.height / 2);
    let r = cx.min(cy);
    SampleIter {
        frame,
        rect,
        shape,
        stride: stride.max(1),
        cx,
        cy,
        r2: r * r,
        gx: 0,
        gy: 0,
    }
}

/// Copy a region out of a frame as a standalone RGBA frame (for snapshots).
/// The rectangle is clipped to the buffer; an empty intersection yields an empty frame.
pub fn crop(frame: &Frame, rect: PixelRect) -> Frame {
    let x0 = rect.x.min(frame.width);
    let y0 = rect.y.min(frame.height);
    let x1 = rect.x.saturating_add(rect.width).min(frame.width);
    let y1 = rect.y.saturating_add(rect.height).min(frame.height);
    let (w, h) = (x1 - x0, y1 - y0);
    let mut rgba = Vec::with_capacity(w as usize * h as usize * 4);
    for y in y0..y1 {
        let start = (y as usize * frame.width as usize + x0 as usize) * 4;
        let end = start + w as usize * 4;
        if let Some(row) = frame.rgba.get(start..end) {
            rgba.extend_from_slice(row);
        }
    }
    if rgba.len() != w as usize * h as usize * 4 {
        return Frame::default();
    }
    Frame::new(rgba, w, h)
}

/// What sits under the sample circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Ground coffee: every sample counts
    #[default]
    Ground,
    /// Whole beans: specular highlights are trimmed
    Bean,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Ground => "ground",
            Mode::Bean => "bean",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ground" => Ok(Mode::Ground),
            "bean" => Ok(Mode::Bean),
            other => Err(format!("unknown mode '{other}' (ground|bean)")),
        }
    }
}

/// Drop the brightest `fraction` of samples ranked by max channel.
///
/// Keeps `n - floor(n * fraction)` samples, at least one when the input is
/// non-empty. Order among kept samples is darkest first.
pub fn reject_highlights(mut samples: Vec<Sample>, fraction: f64) -> Vec<Sample> {
    if samples.is_empty() || fraction.is_nan() || fraction <= 0.0 {
        return samples;
    }
    let n = samples.len();
    let drop = ((n as f64) * fraction.min(1.0)).floor() as usize;
    let keep = n.saturating_sub(drop).max(1);
    samples.sort_by_key(|s| s[0].max(s[1]).max(s[2]));
    samples.truncate(keep);
    samples
}

/// On-screen placement of the sample circle and the reference patch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionLayout {
    /// Bounding square of the sample circle
    pub sample: ScreenRect,
    /// White/gray reference patch
    pub reference: ScreenRect,
}

/// Fraction of the smaller display side used as the sample circle radius.
pub const SAMPLE_RADIUS_FRACTION: f64 = 0.28;
/// Fraction of the smaller display side used as the reference patch width.
pub const REFERENCE_WIDTH_FRACTION: f64 = 0.18;
/// Reference patch height relative to its width.
pub const REFERENCE_ASPECT: f64 = 0.7;
/// Gap between the reference patch and the display's top-right corner.
pub const REFERENCE_PADDING: f64 = 10.0;

/// Default layout: centered sample circle, reference patch in the top-right corner.
pub fn default_layout(display: ScreenRect) -> RegionLayout {
    let side = display.width.min(display.height);
    let rad = side * SAMPLE_RADIUS_FRACTION;
    let cx = display.left + display.width / 2.0;
    let cy = display.top + display.height / 2.0;
    let ww = side * REFERENCE_WIDTH_FRACTION;
    let wh = ww * REFERENCE_ASPECT;
    RegionLayout {
        sample: ScreenRect::new(cx - rad, cy - rad, rad * 2.0, rad * 2.0),
        reference: ScreenRect::new(
            display.left + display.width - ww - REFERENCE_PADDING,
            display.top + REFERENCE_PADDING,
            ww,
            wh,
        ),
    }
}

/// Region provider pinned to [`default_layout`] over a fixed display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutRegions {
    display: ScreenRect,
    layout: RegionLayout,
}

impl LayoutRegions {
    pub fn for_display(display: ScreenRect) -> Self {
        Self {
            display,
            layout: default_layout(display),
        }
    }

    /// Display the size of the buffer itself (1:1 mapping).
    pub fn for_buffer(width: u32, height: u32) -> Self {
        Self::for_display(ScreenRect::new(0.0, 0.0, f64::from(width), f64::from(height)))
    }

    pub fn layout(&self) -> RegionLayout {
        self.layout
    }
}

impl RegionProvider for LayoutRegions {
    fn sample_region(&self) -> ScreenRect {
        self.layout.sample
    }
    fn reference_region(&self) -> ScreenRect {
        self.layout.reference
    }
    fn display_rect(&self) -> ScreenRect {
        self.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> Frame {
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for _ in 0..w * h {
            data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        Frame::new(data, w, h)
    }

    #[test]
    fn rect_grid_counts() {
        let f = solid(10, 10, [1, 2, 3]);
        let n = sample_pixels(&f, PixelRect::new(0, 0, 10, 10), Shape::Rect, 2).count();
        assert_eq!(n, 25);
        let all = sample_pixels(&f, PixelRect::new(0, 0, 10, 10), Shape::Rect, 1).count();
        assert_eq!(all, 100);
    }

    #[test]
    fn circle_excludes_corners() {
        let f = solid(11, 11, [9, 9, 9]);
        let rect = PixelRect::new(0, 0, 11, 11);
        let circle = sample_pixels(&f, rect, Shape::Circle, 1).count();
        let square = sample_pixels(&f, rect, Shape::Rect, 1).count();
        assert!(circle < square);
        // r = 5 around (5,5): lattice points with dx²+dy² <= 25
        assert_eq!(circle, 81);
    }

    #[test]
    fn iterator_restarts_when_cloned() {
        let f = solid(6, 6, [4, 5, 6]);
        let it = sample_pixels(&f, PixelRect::new(0, 0, 6, 6), Shape::Rect, 3);
        let first: Vec<_> = it.clone().collect();
        let second: Vec<_> = it.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
        assert!(first.iter().all(|s| *s == [4, 5, 6]));
    }

    #[test]
    fn out_of_buffer_points_are_skipped() {
        let f = solid(4, 4, [1, 1, 1]);
        let n = sample_pixels(&f, PixelRect::new(2, 2, 10, 10), Shape::Rect, 1).count();
        assert_eq!(n, 4);
    }

    #[test]
    fn zero_stride_behaves_as_one() {
        let f = solid(3, 3, [0, 0, 0]);
        let n = sample_pixels(&f, PixelRect::new(0, 0, 3, 3), Shape::Rect, 0).count();
        assert_eq!(n, 9);
    }

    #[test]
    fn maps_scaled_display_to_buffer() {
        let display = ScreenRect::new(100.0, 50.0, 640.0, 360.0);
        let region = ScreenRect::new(420.0, 230.0, 20.0, 10.0);
        let r = map_screen_region_to_buffer(region, display, 1280, 720);
        assert_eq!(r, PixelRect::new(640, 360, 40, 20));
    }

    #[test]
    fn mapping_clamps_origin_and_size() {
        let display = ScreenRect::new(0.0, 0.0, 100.0, 100.0);
        let region = ScreenRect::new(-5.0, -5.0, 0.1, 0.1);
        let r = map_screen_region_to_buffer(region, display, 100, 100);
        assert_eq!(r, PixelRect::new(0, 0, 1, 1));
    }

    #[test]
    fn crop_copies_and_clips() {
        let mut f = solid(4, 4, [0, 0, 0]);
        let i = (4 + 1) * 4;
        f.rgba[i] = 200;
        let c = crop(&f, PixelRect::new(1, 1, 10, 10));
        assert_eq!((c.width, c.height), (3, 3));
        assert_eq!(c.rgb_at(0, 0), Some([200, 0, 0]));
    }

    #[test]
    fn highlight_rejection_drops_brightest_tenth() {
        let mut v: Vec<Sample> = (0..20u8).map(|i| [i, 0, 0]).collect();
        v.reverse();
        let kept = reject_highlights(v, 0.10);
        assert_eq!(kept.len(), 18);
        assert_eq!(kept.iter().map(|s| s[0]).max(), Some(17));
        assert_eq!(reject_highlights(vec![[9, 9, 9]], 0.9).len(), 1);
        assert_eq!(reject_highlights(vec![[1, 1, 1]; 5], 0.0).len(), 5);
    }

    #[test]
    fn default_layout_geometry() {
        let l = default_layout(ScreenRect::new(0.0, 0.0, 1000.0, 500.0));
        assert!((l.sample.width - 280.0).abs() < 1e-9);
        assert!((l.sample.left - 360.0).abs() < 1e-9);
        assert!((l.sample.top - 110.0).abs() < 1e-9);
        assert!((l.reference.width - 90.0).abs() < 1e-9);
        assert!((l.reference.height - 63.0).abs() < 1e-9);
        assert!((l.reference.left - 900.0).abs() < 1e-9);
        assert!((l.reference.top - 10.0).abs() < 1e-9);
    }
}
