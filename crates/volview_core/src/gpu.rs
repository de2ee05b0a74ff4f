//! GPU-facing data structures shared between host code and the WGSL ray caster.

use glam::{Mat4, Vec3};

use crate::{config::ViewerConfig, OpacityCurve, Scalar, VolumeImage};

/// Uniform block consumed by `raycast.wgsl`. Every member is 16-byte aligned.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RenderUniforms {
    pub inv_view_proj: [[Scalar; 4]; 4],
    /// xyz = eye position.
    pub camera_position: [Scalar; 4],
    pub volume_origin: [Scalar; 4],
    pub volume_spacing: [Scalar; 4],
    /// xyz = sample counts, w = 1 when a volume is bound.
    pub voxel_dims: [u32; 4],
    /// x = min sample, y = max sample, z/w = opacity LUT domain.
    pub sample_range: [Scalar; 4],
    /// ambient, diffuse, specular, specular power.
    pub lighting: [Scalar; 4],
    /// x = step length, y = opacity unit distance, z = shading on/off.
    pub march: [Scalar; 4],
    pub background: [Scalar; 4],
    /// x = label overlay opacity (0 hides it), y = 1 when the target encodes sRGB.
    pub display: [Scalar; 4],
}

// one mat4 plus nine vec4s
const _: () = assert!(core::mem::size_of::<RenderUniforms>() == 208);

impl RenderUniforms {
    /// Uniforms with no volume bound; the pass only clears to the background.
    pub fn empty(config: &ViewerConfig) -> Self {
        let mut uniforms = Self::zeroed_with_background(config.render.background);
        uniforms.inv_view_proj = Mat4::IDENTITY.to_cols_array_2d();
        uniforms
    }

    pub fn for_volume(
        config: &ViewerConfig,
        image: &VolumeImage,
        curve: &OpacityCurve,
        inv_view_proj: Mat4,
        eye: Vec3,
        label_opacity: Scalar,
    ) -> Self {
        let extents = image.extents();
        let spacing = image.spacing();
        let origin = image.origin();
        let (lo, hi) = image.range();
        let (lut_lo, lut_hi) = curve.domain();
        let lighting = &config.lighting;

        let mut uniforms = Self::zeroed_with_background(config.render.background);
        uniforms.inv_view_proj = inv_view_proj.to_cols_array_2d();
        uniforms.camera_position = [eye.x, eye.y, eye.z, 1.0];
        uniforms.volume_origin = [origin.x, origin.y, origin.z, 0.0];
        uniforms.volume_spacing = [spacing.x, spacing.y, spacing.z, 0.0];
        uniforms.voxel_dims = [extents.x as u32, extents.y as u32, extents.z as u32, 1];
        uniforms.sample_range = [lo as Scalar, hi as Scalar, lut_lo, lut_hi];
        uniforms.lighting = [
            lighting.ambient,
            lighting.diffuse,
            lighting.specular,
            lighting.specular_power,
        ];
        uniforms.march = [
            step_length(spacing, config.render.step_factor),
            config.render.opacity_unit_distance.max(1e-6),
            if lighting.shade { 1.0 } else { 0.0 },
            0.0,
        ];
        uniforms.display[0] = label_opacity.clamp(0.0, 1.0);
        uniforms
    }

    /// Whether the shader should march through a volume.
    pub fn has_volume(&self) -> bool {
        self.voxel_dims[3] != 0
    }

    fn zeroed_with_background(background: Vec3) -> Self {
        let mut uniforms: Self = bytemuck::Zeroable::zeroed();
        uniforms.background = [background.x, background.y, background.z, 1.0];
        uniforms
    }
}

/// Ray step in world units: a fraction of the finest voxel spacing.
pub fn step_length(spacing: Vec3, step_factor: Scalar) -> Scalar {
    (spacing.min_element() * step_factor).max(1e-4)
}
