//! Axis-aligned 2D slices through the loaded volume for the slice viewer.

use serde::{Deserialize, Serialize};

use crate::{
    colormap::Colormap,
    labels::{Label, LabelVolume},
    Sample, Scalar, VolumeImage,
};

/// Lower and upper percentiles of a slice's samples mapped to the colormap ends.
pub const WINDOW_PERCENTILES: (Scalar, Scalar) = (1.0, 99.0);

/// Which plane a slice lies in. Axial slices are perpendicular to Z, coronal to Y,
/// sagittal to X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceAxis {
    #[default]
    Axial,
    Coronal,
    Sagittal,
}

impl SliceAxis {
    pub const ALL: [SliceAxis; 3] = [SliceAxis::Axial, SliceAxis::Coronal, SliceAxis::Sagittal];

    pub fn label(self) -> &'static str {
        match self {
            SliceAxis::Axial => "Axial (XY)",
            SliceAxis::Coronal => "Coronal (XZ)",
            SliceAxis::Sagittal => "Sagittal (YZ)",
        }
    }

    /// Number of slices along this axis.
    pub fn depth(self, image: &VolumeImage) -> usize {
        let extents = image.extents();
        match self {
            SliceAxis::Axial => extents.z,
            SliceAxis::Coronal => extents.y,
            SliceAxis::Sagittal => extents.x,
        }
    }

    /// Voxel shown at column `u`, row `v` of slice `index`.
    fn voxel(self, u: usize, v: usize, index: usize) -> (usize, usize, usize) {
        match self {
            SliceAxis::Axial => (u, v, index),
            SliceAxis::Coronal => (u, index, v),
            SliceAxis::Sagittal => (index, u, v),
        }
    }

    /// Columns and rows of one slice.
    fn plane(self, image: &VolumeImage) -> (usize, usize) {
        let extents = image.extents();
        match self {
            SliceAxis::Axial => (extents.x, extents.y),
            SliceAxis::Coronal => (extents.x, extents.z),
            SliceAxis::Sagittal => (extents.y, extents.z),
        }
    }

    /// World size of one pixel along columns and rows.
    pub fn pixel_spacing(self, image: &VolumeImage) -> (Scalar, Scalar) {
        let s = image.spacing();
        match self {
            SliceAxis::Axial => (s.x, s.y),
            SliceAxis::Coronal => (s.x, s.z),
            SliceAxis::Sagittal => (s.y, s.z),
        }
    }
}

/// Samples (and labels, if any) of one slice. Row 0 is the lowest coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub axis: SliceAxis,
    pub index: usize,
    pub width: usize,
    pub height: usize,
    pub samples: Vec<Sample>,
    pub labels: Option<Vec<Label>>,
}

impl Slice {
    /// Cuts slice `index` along `axis`; `None` when the index is past the last slice.
    pub fn extract(
        image: &VolumeImage,
        labels: Option<&LabelVolume>,
        axis: SliceAxis,
        index: usize,
    ) -> Option<Self> {
        if index >= axis.depth(image) {
            return None;
        }
        let (width, height) = axis.plane(image);
        let mut samples = Vec::with_capacity(width * height);
        let mut slice_labels = labels.map(|_| Vec::with_capacity(width * height));
        for v in 0..height {
            for u in 0..width {
                let (x, y, z) = axis.voxel(u, v, index);
                samples.push(image.sample(x, y, z).unwrap_or_default());
                if let (Some(out), Some(volume)) = (slice_labels.as_mut(), labels) {
                    out.push(volume.label(x, y, z).unwrap_or_default());
                }
            }
        }
        Some(Self {
            axis,
            index,
            width,
            height,
            samples,
            labels: slice_labels,
        })
    }

    /// Display window from the slice's own sample distribution.
    pub fn window(&self) -> (Scalar, Scalar) {
        let mut sorted = self.samples.clone();
        sorted.sort_unstable();
        let (lo_pct, hi_pct) = WINDOW_PERCENTILES;
        (percentile(&sorted, lo_pct), percentile(&sorted, hi_pct))
    }

    /// RGBA8 pixels, top row first, ready for an image widget.
    ///
    /// Labels present in `overlay` are blended over the colormap with `label_opacity`.
    pub fn to_rgba(
        &self,
        colormap: Colormap,
        overlay: Option<&LabelVolume>,
        label_opacity: Scalar,
    ) -> Vec<u8> {
        let (lo, hi) = self.window();
        let span = (hi - lo).max(1.0);
        let mut pixels = Vec::with_capacity(self.width * self.height * 4);
        for v in (0..self.height).rev() {
            for u in 0..self.width {
                let i = v * self.width + u;
                let t = (Scalar::from(self.samples[i]) - lo) / span;
                let mut color = colormap.sample(t);
                let tint = match (overlay, &self.labels) {
                    (Some(volume), Some(labels)) => volume.palette().color(labels[i]),
                    _ => None,
                };
                if let Some(tint) = tint {
                    color = color.lerp(tint, label_opacity.clamp(0.0, 1.0));
                }
                pixels.extend(color.to_array().map(to_byte));
                pixels.push(u8::MAX);
            }
        }
        pixels
    }
}

/// Linear-interpolated percentile of already sorted samples.
fn percentile(sorted: &[Sample], pct: Scalar) -> Scalar {
    match sorted {
        [] => 0.0,
        [only] => Scalar::from(*only),
        _ => {
            let rank = pct.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as Scalar;
            let lo = rank.floor() as usize;
            let hi = (lo + 1).min(sorted.len() - 1);
            let frac = rank - lo as Scalar;
            Scalar::from(sorted[lo]) * (1.0 - frac) + Scalar::from(sorted[hi]) * frac
        }
    }
}

fn to_byte(channel: Scalar) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}
