//! Named color maps applied to normalized sample values.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::Scalar;

/// Number of entries in a colormap lookup table uploaded to the GPU.
pub const COLORMAP_LUT_SIZE: u32 = 256;

/// Color ramp used for the volume and the slice views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Gray,
    Bone,
    Jet,
    Viridis,
}

impl Colormap {
    pub const ALL: [Colormap; 4] = [Colormap::Gray, Colormap::Bone, Colormap::Jet, Colormap::Viridis];

    pub fn name(self) -> &'static str {
        match self {
            Colormap::Gray => "gray",
            Colormap::Bone => "bone",
            Colormap::Jet => "jet",
            Colormap::Viridis => "viridis",
        }
    }

    /// Evenly spaced color stops from 0 to 1.
    fn stops(self) -> &'static [Vec3] {
        match self {
            Colormap::Gray => &GRAY,
            Colormap::Bone => &BONE,
            Colormap::Jet => &JET,
            Colormap::Viridis => &VIRIDIS,
        }
    }

    /// Samples the map at `t`, clamped to [0, 1].
    pub fn sample(self, t: Scalar) -> Vec3 {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let n = stops.len() - 1;
        let idx = ((t * n as Scalar).floor() as usize).min(n - 1);
        let frac = t * n as Scalar - idx as Scalar;
        stops[idx].lerp(stops[idx + 1], frac)
    }

    /// RGBA texels spanning [0, 1] evenly, endpoints included.
    pub fn to_lut(self, size: u32) -> Vec<[f32; 4]> {
        let size = size.max(2);
        (0..size)
            .map(|i| {
                let c = self.sample(i as Scalar / (size - 1) as Scalar);
                [c.x, c.y, c.z, 1.0]
            })
            .collect()
    }
}

const GRAY: [Vec3; 2] = [Vec3::ZERO, Vec3::ONE];

const BONE: [Vec3; 17] = [
    Vec3::new(0.000, 0.000, 0.000),
    Vec3::new(0.055, 0.055, 0.076),
    Vec3::new(0.109, 0.109, 0.152),
    Vec3::new(0.164, 0.164, 0.228),
    Vec3::new(0.219, 0.219, 0.304),
    Vec3::new(0.273, 0.273, 0.380),
    Vec3::new(0.328, 0.331, 0.453),
    Vec3::new(0.383, 0.407, 0.508),
    Vec3::new(0.437, 0.482, 0.562),
    Vec3::new(0.492, 0.557, 0.617),
    Vec3::new(0.547, 0.632, 0.672),
    Vec3::new(0.602, 0.707, 0.727),
    Vec3::new(0.658, 0.781, 0.781),
    Vec3::new(0.744, 0.836, 0.836),
    Vec3::new(0.829, 0.891, 0.891),
    Vec3::new(0.915, 0.945, 0.945),
    Vec3::new(1.000, 1.000, 1.000),
];

const JET: [Vec3; 17] = [
    Vec3::new(0.000, 0.000, 0.500),
    Vec3::new(0.000, 0.000, 0.784),
    Vec3::new(0.000, 0.000, 1.000),
    Vec3::new(0.000, 0.250, 1.000),
    Vec3::new(0.000, 0.500, 1.000),
    Vec3::new(0.000, 0.750, 1.000),
    Vec3::new(0.081, 1.000, 0.887),
    Vec3::new(0.282, 1.000, 0.685),
    Vec3::new(0.484, 1.000, 0.484),
    Vec3::new(0.685, 1.000, 0.282),
    Vec3::new(0.887, 1.000, 0.081),
    Vec3::new(1.000, 0.824, 0.000),
    Vec3::new(1.000, 0.593, 0.000),
    Vec3::new(1.000, 0.361, 0.000),
    Vec3::new(1.000, 0.130, 0.000),
    Vec3::new(0.784, 0.000, 0.000),
    Vec3::new(0.500, 0.000, 0.000),
];

const VIRIDIS: [Vec3; 11] = [
    Vec3::new(0.267, 0.004, 0.329),
    Vec3::new(0.282, 0.140, 0.457),
    Vec3::new(0.253, 0.265, 0.529),
    Vec3::new(0.206, 0.371, 0.553),
    Vec3::new(0.163, 0.471, 0.558),
    Vec3::new(0.127, 0.566, 0.550),
    Vec3::new(0.134, 0.658, 0.517),
    Vec3::new(0.266, 0.749, 0.440),
    Vec3::new(0.477, 0.821, 0.318),
    Vec3::new(0.741, 0.873, 0.150),
    Vec3::new(0.993, 0.906, 0.144),
];
