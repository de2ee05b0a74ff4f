//! Optional per-voxel label mask stored next to the volume, and its color palette.
//!
//! Labels share the volume's grid and file ordering. Zero means "no structure";
//! every other value names one segmented region.

use glam::Vec3;

use crate::{
    volume::{reorder_to_render, Extents},
    LoadError, Result,
};

pub type Label = u8;

/// Palette entries: one per possible label value.
pub const PALETTE_SIZE: usize = 256;

/// Qualitative colors handed out to labels in ascending order, wrapping after ten.
const TAB10: [Vec3; 10] = [
    Vec3::new(0.122, 0.467, 0.706),
    Vec3::new(1.000, 0.498, 0.055),
    Vec3::new(0.173, 0.627, 0.173),
    Vec3::new(0.839, 0.153, 0.157),
    Vec3::new(0.580, 0.404, 0.741),
    Vec3::new(0.549, 0.337, 0.294),
    Vec3::new(0.890, 0.467, 0.761),
    Vec3::new(0.498, 0.498, 0.498),
    Vec3::new(0.737, 0.741, 0.133),
    Vec3::new(0.090, 0.745, 0.812),
];

/// Labels exactly as read from the file, in file ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelBuffer {
    extents: Extents,
    labels: Vec<Label>,
}

impl LabelBuffer {
    pub fn new(extents: Extents, labels: Vec<Label>) -> Result<Self> {
        let expected = extents.validate()?;
        if labels.len() != expected {
            return Err(LoadError::DimensionMismatch {
                expected,
                actual: labels.len(),
            });
        }
        Ok(Self { extents, labels })
    }

    pub fn extents(&self) -> Extents {
        self.extents
    }

    /// Reorders for the renderer after checking the grid matches the volume's.
    pub fn into_volume(self, volume: Extents) -> Result<LabelVolume> {
        if self.extents != volume {
            return Err(LoadError::LabelGridMismatch {
                volume,
                labels: self.extents,
            });
        }
        let labels = reorder_to_render(self.extents, &self.labels);
        Ok(LabelVolume::from_render_order(self.extents, labels))
    }
}

/// Labels in renderer ordering, plus the set of values that occur.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVolume {
    extents: Extents,
    labels: Vec<Label>,
    present: Vec<Label>,
    palette: LabelPalette,
}

impl LabelVolume {
    fn from_render_order(extents: Extents, labels: Vec<Label>) -> Self {
        let mut seen = [false; PALETTE_SIZE];
        for &label in &labels {
            seen[usize::from(label)] = true;
        }
        let present: Vec<Label> = (1..=Label::MAX).filter(|&l| seen[usize::from(l)]).collect();
        let palette = LabelPalette::for_labels(&present);
        Self {
            extents,
            labels,
            present,
            palette,
        }
    }

    pub fn extents(&self) -> Extents {
        self.extents
    }

    /// Labels in renderer ordering (X fastest).
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn label(&self, x: usize, y: usize, z: usize) -> Option<Label> {
        if x >= self.extents.x || y >= self.extents.y || z >= self.extents.z {
            return None;
        }
        self.labels.get(self.extents.render_index(x, y, z)).copied()
    }

    /// Non-zero labels that occur at least once, ascending.
    pub fn present(&self) -> &[Label] {
        &self.present
    }

    pub fn palette(&self) -> &LabelPalette {
        &self.palette
    }
}

/// Color per label value. Absent labels and label 0 are transparent.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPalette {
    entries: Vec<[f32; 4]>,
}

impl LabelPalette {
    /// Assigns the qualitative colors to `present` in order.
    pub fn for_labels(present: &[Label]) -> Self {
        let mut entries = vec![[0.0; 4]; PALETTE_SIZE];
        for (i, &label) in present.iter().filter(|&&l| l != 0).enumerate() {
            let c = TAB10[i % TAB10.len()];
            entries[usize::from(label)] = [c.x, c.y, c.z, 1.0];
        }
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::for_labels(&[])
    }

    pub fn color(&self, label: Label) -> Option<Vec3> {
        let [r, g, b, a] = self.entries[usize::from(label)];
        (a > 0.0).then(|| Vec3::new(r, g, b))
    }

    /// RGBA texels indexed by label value.
    pub fn texels(&self) -> &[[f32; 4]] {
        &self.entries
    }
}

impl Default for LabelPalette {
    fn default() -> Self {
        Self::empty()
    }
}
