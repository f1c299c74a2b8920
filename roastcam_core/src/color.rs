//! sRGB → CIE XYZ (D65) → CIE L*a*b* conversion.
//!
//! All functions are pure and total. Inputs are normalized channels in
//! [0, 1]; nothing here clamps, callers do.

use serde::{Deserialize, Serialize};

/// D65 reference white (2° observer), Y normalized to 1.
pub const D65_WHITE: [f64; 3] = [0.95047, 1.0, 1.08883];

/// CIE ε = 216/24389.
pub const LAB_EPSILON: f64 = 216.0 / 24389.0;
/// CIE κ = 24389/27.
pub const LAB_KAPPA: f64 = 24389.0 / 27.0;

/// Linear sRGB → XYZ (D65), row-major.
const SRGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Lab {
    #[serde(rename = "L")]
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

impl Lab {
    pub const fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }
}

/// Inverse sRGB companding.
#[inline]
pub fn to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Forward sRGB companding; inverse of [`to_linear`].
#[inline]
pub fn to_srgb(l: f64) -> f64 {
    if l <= 0.0031308 {
        12.92 * l
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    }
}

/// Companded sRGB channels → XYZ.
#[inline]
pub fn rgb_to_xyz(r: f64, g: f64, b: f64) -> Xyz {
    let lin = [to_linear(r), to_linear(g), to_linear(b)];
    let row = |m: &[f64; 3]| m[0] * lin[0] + m[1] * lin[1] + m[2] * lin[2];
    Xyz {
        x: row(&SRGB_TO_XYZ[0]),
        y: row(&SRGB_TO_XYZ[1]),
        z: row(&SRGB_TO_XYZ[2]),
    }
}

#[inline]
fn lab_f(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        (LAB_KAPPA * t + 16.0) / 116.0
    }
}

#[inline]
pub fn xyz_to_lab(xyz: Xyz) -> Lab {
    let fx = lab_f(xyz.x / D65_WHITE[0]);
    let fy = lab_f(xyz.y / D65_WHITE[1]);
    let fz = lab_f(xyz.z / D65_WHITE[2]);
    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// Normalized sRGB triple straight to Lab.
#[inline]
pub fn rgb_to_lab(rgb: [f64; 3]) -> Lab {
    xyz_to_lab(rgb_to_xyz(rgb[0], rgb[1], rgb[2]))
}
