//! Per-channel white-balance gains from a neutral reference patch.

use serde::{Deserialize, Serialize};

use crate::roi::Sample;

/// Multiplicative per-channel correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GainVector {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Default for GainVector {
    fn default() -> Self {
        Self::UNITY
    }
}

impl GainVector {
    pub const UNITY: GainVector = GainVector {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn is_valid(&self) -> bool {
        [self.r, self.g, self.b]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// 3×3 color-correction matrix applied after the gains. Identity by default;
/// a non-diagonal solve is not implemented.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ccm(pub [[f64; 3]; 3]);

impl Default for Ccm {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Ccm {
    pub const IDENTITY: Ccm = Ccm([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    #[inline]
    pub fn apply(&self, v: [f64; 3]) -> [f64; 3] {
        let m = &self.0;
        [
            m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
            m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
            m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().flatten().all(|v| v.is_finite())
    }
}

/// Per-channel means of a sample set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ChannelMeans {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl ChannelMeans {
    pub fn grand_mean(&self) -> f64 {
        (self.r + self.g + self.b) / 3.0
    }
}

/// Channel means over `samples`, or None for an empty set.
pub fn channel_means<I>(samples: I) -> Option<ChannelMeans>
where
    I: IntoIterator<Item = Sample>,
{
    let mut sum = [0u64; 3];
    let mut n = 0u64;
    for s in samples {
        sum[0] += u64::from(s[0]);
        sum[1] += u64::from(s[1]);
        sum[2] += u64::from(s[2]);
        n += 1;
    }
    if n == 0 {
        return None;
    }
    let n = n as f64;
    Some(ChannelMeans {
        r: sum[0] as f64 / n,
        g: sum[1] as f64 / n,
        b: sum[2] as f64 / n,
    })
}

/// Result of a white/gray calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhiteBalance {
    pub gains: GainVector,
    /// Raw reference means, for display
    pub means: ChannelMeans,
}

/// Gains that make the reference patch neutral: `gain = grand_mean / channel_mean`.
///
/// A zero channel mean is treated as 1. Returns None when there are no samples.
pub fn compute_gains<I>(samples: I) -> Option<WhiteBalance>
where
    I: IntoIterator<Item = Sample>,
{
    let means = channel_means(samples)?;
    let avg = means.grand_mean();
    let gain = |m: f64| avg / if m == 0.0 { 1.0 } else { m };
    Some(WhiteBalance {
        gains: GainVector {
            r: gain(means.r),
            g: gain(means.g),
            b: gain(means.b),
        },
        means,
    })
}

/// Gain-correct, CCM-transform and normalize one sample to [0, 1] per channel.
#[inline]
pub fn correct(sample: Sample, gains: &GainVector, ccm: &Ccm) -> [f64; 3] {
    let v = [
        f64::from(sample[0]) * gains.r / 255.0,
        f64::from(sample[1]) * gains.g / 255.0,
        f64::from(sample[2]) * gains.b / 255.0,
    ];
    ccm.apply(v).map(|c| c.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_patch_gives_unity_gains() {
        let wb = compute_gains(vec![[120, 120, 120], [130, 130, 130]]).unwrap();
        assert!((wb.gains.r - 1.0).abs() < 1e-12);
        assert!((wb.gains.g - 1.0).abs() < 1e-12);
        assert!((wb.gains.b - 1.0).abs() < 1e-12);
        assert!((wb.means.r - 125.0).abs() < 1e-12);
    }

    #[test]
    fn warm_patch_boosts_blue() {
        let wb = compute_gains(vec![[250, 250, 248]; 4]).unwrap();
        assert!((wb.gains.r - 0.99733).abs() < 1e-4);
        assert!((wb.gains.g - 0.99733).abs() < 1e-4);
        assert!((wb.gains.b - 1.00538).abs() < 1e-4);
    }

    #[test]
    fn zero_channel_mean_is_guarded() {
        let wb = compute_gains(vec![[90, 0, 90]]).unwrap();
        assert!((wb.gains.g - 60.0).abs() < 1e-12);
        assert!(wb.gains.is_valid());
    }

    #[test]
    fn empty_set_has_no_gains() {
        assert!(compute_gains(Vec::<Sample>::new()).is_none());
    }

    #[test]
    fn correct_clamps_after_gain() {
        let gains = GainVector {
            r: 2.0,
            g: 1.0,
            b: 0.5,
        };
        let v = correct([200, 255, 0], &gains, &Ccm::IDENTITY);
        assert_eq!(v[0], 1.0);
        assert!((v[1] - 1.0).abs() < 1e-12);
        assert_eq!(v[2], 0.0);
    }

    #[test]
    fn ccm_composes_after_gains() {
        let swap = Ccm([[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        let v = correct([255, 0, 51], &GainVector::UNITY, &swap);
        assert_eq!(v[0], 0.0);
        assert!((v[1] - 1.0).abs() < 1e-12);
        assert!((v[2] - 0.2).abs() < 1e-12);
    }
}
