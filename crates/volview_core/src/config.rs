//! Viewer configuration shared between the UI shell and the GPU layer.
//!
//! Every constant the viewer used to hardcode (voxel spacing, transfer curve
//! anchors, the exponential opacity mapping, lighting coefficients, background)
//! lives here so a dataset can be calibrated from a JSON file instead of a
//! rebuild. Missing fields fall back to the defaults below.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{colormap::Colormap, labels::Label, Scalar};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ViewerConfig {
    pub volume: VolumeSettings,
    pub transfer: TransferSettings,
    pub lighting: LightingSettings,
    pub render: RenderSettings,
    pub labels: LabelSettings,
}

impl ViewerConfig {
    /// Reads a (possibly partial) configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.transfer.validate()?;
        config.labels.validate()?;
        Ok(config)
    }
}

/// How the dataset is located inside the file and placed in world space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeSettings {
    /// Name of the rank-3 dataset to read.
    pub dataset: String,
    /// Physical voxel size along X, Y, Z. Not stored in the file.
    pub spacing: Vec3,
    pub origin: Vec3,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            dataset: "volume".to_owned(),
            spacing: Vec3::new(3.0, 1.0, 1.0),
            origin: Vec3::ZERO,
        }
    }
}

/// Scalar-opacity transfer curve parameters.
///
/// The middle control point sits at `mid_at` with opacity
/// `opacity_scale * opacity_base.powi(mid_opacity)`, between the fixed anchors
/// `(lower_value, lower_opacity)` and `(upper_value, upper_opacity)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    pub lower_value: Scalar,
    pub lower_opacity: Scalar,
    pub upper_value: Scalar,
    pub upper_opacity: Scalar,
    /// Multiplicative step per opacity-slider tick.
    pub opacity_base: f64,
    /// Opacity of the middle point with the opacity slider at zero.
    pub opacity_scale: f64,
    /// Inclusive range of the "Mid opacity" slider.
    pub mid_opacity_range: (i32, i32),
    /// Inclusive range of the "Mid at" slider.
    pub mid_at_range: (i32, i32),
    pub initial_mid_opacity: i32,
    pub initial_mid_at: i32,
    /// Number of entries in the GPU lookup table spanning the anchors.
    pub lut_size: u32,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            lower_value: 0.0,
            lower_opacity: 0.0,
            upper_value: 3000.0,
            upper_opacity: 1.0,
            opacity_base: 1.01,
            opacity_scale: 0.0001,
            // 0.0001 * 1.01^925 is just under 1.0
            mid_opacity_range: (0, 925),
            mid_at_range: (0, 3000),
            initial_mid_opacity: 0,
            initial_mid_at: 1500,
            lut_size: 4096,
        }
    }
}

impl TransferSettings {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.upper_value > self.lower_value,
            "transfer anchors must be increasing (lower {} >= upper {})",
            self.lower_value,
            self.upper_value
        );
        anyhow::ensure!(self.lut_size >= 2, "lut_size must be at least 2");
        anyhow::ensure!(
            self.opacity_base > 0.0 && self.opacity_scale >= 0.0,
            "opacity base must be positive and scale non-negative"
        );
        anyhow::ensure!(
            self.mid_opacity_range.0 <= self.mid_opacity_range.1
                && self.mid_at_range.0 <= self.mid_at_range.1,
            "slider ranges must be non-empty"
        );
        anyhow::ensure!(
            (self.mid_opacity_range.0..=self.mid_opacity_range.1).contains(&self.initial_mid_opacity),
            "initial_mid_opacity {} outside {:?}",
            self.initial_mid_opacity,
            self.mid_opacity_range
        );
        anyhow::ensure!(
            (self.mid_at_range.0..=self.mid_at_range.1).contains(&self.initial_mid_at),
            "initial_mid_at {} outside {:?}",
            self.initial_mid_at,
            self.mid_at_range
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.lower_opacity) && (0.0..=1.0).contains(&self.upper_opacity),
            "anchor opacities must lie in [0, 1]"
        );
        Ok(())
    }
}

/// Phong-style shading coefficients applied to gradient normals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingSettings {
    pub shade: bool,
    pub ambient: Scalar,
    pub diffuse: Scalar,
    pub specular: Scalar,
    pub specular_power: Scalar,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            shade: true,
            ambient: 0.1,
            diffuse: 0.9,
            specular: 0.2,
            specular_power: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub background: Vec3,
    /// Ray step as a fraction of the smallest voxel spacing.
    pub step_factor: Scalar,
    /// World distance over which a LUT opacity applies unchanged.
    pub opacity_unit_distance: Scalar,
    /// Vertical field of view in degrees.
    pub fov_y_degrees: Scalar,
    /// Color ramp over the loaded sample range.
    pub colormap: Colormap,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            background: Vec3::new(0.1, 0.2, 0.3),
            step_factor: 0.5,
            opacity_unit_distance: 1.0,
            fov_y_degrees: 30.0,
            colormap: Colormap::Gray,
        }
    }
}

/// Optional label mask stored next to the volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelSettings {
    /// Dataset holding one label per voxel. Files without it load without an overlay.
    pub dataset: String,
    pub visible: bool,
    /// Opacity of label surfaces and slice tints.
    pub opacity: Scalar,
    /// Legend text per label value.
    pub names: BTreeMap<Label, String>,
}

impl Default for LabelSettings {
    fn default() -> Self {
        let names = [
            (1, "CTV_Low"),
            (2, "CTV_High"),
            (3, "PTV_Low"),
            (4, "PTV_High"),
            (5, "GTV"),
            (6, "Lungs"),
        ]
        .into_iter()
        .map(|(label, name)| (label, name.to_owned()))
        .collect();
        Self {
            dataset: "mask".to_owned(),
            visible: true,
            opacity: 0.4,
            names,
        }
    }
}

impl LabelSettings {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.opacity),
            "label opacity {} outside [0, 1]",
            self.opacity
        );
        Ok(())
    }

    pub fn name(&self, label: Label) -> String {
        self.names
            .get(&label)
            .cloned()
            .unwrap_or_else(|| format!("Label {label}"))
    }
}
