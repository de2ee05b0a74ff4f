//! Volume samples and the transform between file and renderer axis orderings.
//!
//! Files store the sample at `(x, y, z)` at `x * (Z * Y) + y * Z + z` (X slowest).
//! The renderer expects `z * (X * Y) + y * X + x` (X fastest). The two layouts
//! are related by a full transpose, not a reshape, so every sample is moved.

use glam::Vec3;

use crate::{LoadError, Result, Sample};

/// Number of samples along X, Y and Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extents {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Extents {
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Builds extents from a dataset shape, which must have exactly three axes.
    pub fn from_shape(shape: &[usize]) -> Result<Self> {
        match *shape {
            [x, y, z] => Ok(Self::new(x, y, z)),
            _ => Err(LoadError::WrongRank { rank: shape.len() }),
        }
    }

    /// Product of the extents, or `None` if it does not fit in `usize`.
    pub fn checked_sample_count(&self) -> Option<usize> {
        self.x.checked_mul(self.y)?.checked_mul(self.z)
    }

    /// Product of the extents, saturating at `usize::MAX`.
    pub fn sample_count(&self) -> usize {
        self.checked_sample_count().unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }

    /// Checks that the extents describe a non-empty, addressable grid.
    pub fn validate(&self) -> Result<usize> {
        if self.is_empty() {
            return Err(LoadError::EmptyVolume);
        }
        self.checked_sample_count()
            .ok_or(LoadError::TooLarge { extents: *self })
    }

    /// Linear index of `(x, y, z)` in file ordering.
    #[inline]
    pub fn file_index(&self, x: usize, y: usize, z: usize) -> usize {
        x * self.z * self.y + y * self.z + z
    }

    /// Linear index of `(x, y, z)` in renderer ordering.
    #[inline]
    pub fn render_index(&self, x: usize, y: usize, z: usize) -> usize {
        z * self.x * self.y + y * self.x + x
    }
}

/// Samples exactly as read from the file, in file ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeBuffer {
    extents: Extents,
    samples: Vec<Sample>,
}

impl VolumeBuffer {
    /// Wraps raw samples; the length must equal the product of the extents.
    pub fn new(extents: Extents, samples: Vec<Sample>) -> Result<Self> {
        let expected = extents.validate()?;
        if samples.len() != expected {
            return Err(LoadError::DimensionMismatch {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self { extents, samples })
    }

    pub fn extents(&self) -> Extents {
        self.extents
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Consumes the buffer and produces the renderer-ordered image.
    pub fn into_image(self, spacing: Vec3, origin: Vec3) -> VolumeImage {
        let samples = reorder_to_render(self.extents, &self.samples);
        VolumeImage::from_render_order(self.extents, samples, spacing, origin)
    }
}

/// Copies `source` (file ordering) into a new buffer in renderer ordering.
pub fn reorder_to_render<T: Copy + Default>(extents: Extents, source: &[T]) -> Vec<T> {
    debug_assert_eq!(source.len(), extents.sample_count());
    let mut destination = vec![T::default(); source.len()];
    for z in 0..extents.z {
        for y in 0..extents.y {
            for x in 0..extents.x {
                destination[extents.render_index(x, y, z)] = source[extents.file_index(x, y, z)];
            }
        }
    }
    destination
}

/// Inverse of [`reorder_to_render`].
pub fn reorder_to_file<T: Copy + Default>(extents: Extents, source: &[T]) -> Vec<T> {
    debug_assert_eq!(source.len(), extents.sample_count());
    let mut destination = vec![T::default(); source.len()];
    for x in 0..extents.x {
        for y in 0..extents.y {
            for z in 0..extents.z {
                destination[extents.file_index(x, y, z)] = source[extents.render_index(x, y, z)];
            }
        }
    }
    destination
}

/// A scalar image in renderer ordering, placed in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeImage {
    extents: Extents,
    samples: Vec<Sample>,
    spacing: Vec3,
    origin: Vec3,
    range: (Sample, Sample),
}

impl VolumeImage {
    fn from_render_order(extents: Extents, samples: Vec<Sample>, spacing: Vec3, origin: Vec3) -> Self {
        let range = samples
            .iter()
            .fold((Sample::MAX, Sample::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Self {
            extents,
            samples,
            spacing,
            origin,
            range,
        }
    }

    pub fn extents(&self) -> Extents {
        self.extents
    }

    /// Samples in renderer ordering (X fastest), ready for a 3D texture upload.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn sample(&self, x: usize, y: usize, z: usize) -> Option<Sample> {
        if x >= self.extents.x || y >= self.extents.y || z >= self.extents.z {
            return None;
        }
        self.samples.get(self.extents.render_index(x, y, z)).copied()
    }

    pub fn spacing(&self) -> Vec3 {
        self.spacing
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Smallest and largest sample value.
    pub fn range(&self) -> (Sample, Sample) {
        self.range
    }

    /// World-space box the renderer marches through.
    ///
    /// Spans the first voxel center to the last. An axis with a single sample
    /// has no extent of its own and is widened by half a voxel on each side.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let dims = [self.extents.x, self.extents.y, self.extents.z];
        let cells = Vec3::from_array(dims.map(|n| n.saturating_sub(1) as f32));
        let pad = Vec3::from_array(dims.map(|n| if n == 1 { 0.5 } else { 0.0 })) * self.spacing;
        (self.origin - pad, self.origin + cells * self.spacing + pad)
    }
}
