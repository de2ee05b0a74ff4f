//! GPU layer over `wgpu`: surface setup, volume textures and the ray-cast pass.

use std::borrow::Cow;

use anyhow::{Context, Result};
use tracing::info;
use volview_shaders::render;
use wgpu::{
    Adapter, Backends, Device, DeviceDescriptor, Features, Instance, InstanceDescriptor,
    PowerPreference, PresentMode, Queue, RequestAdapterOptions, Surface, SurfaceConfiguration,
    TextureFormat, TextureUsages,
};
use winit::window::Window;

pub mod camera;
pub mod readback;
pub mod renderer;

pub use camera::OrbitCamera;
pub use renderer::{clear_color, VolumeRenderer};

pub struct GpuContext<'window> {
    pub instance: Instance,
    pub surface: Surface<'window>,
    pub adapter: Adapter,
    pub device: Device,
    pub queue: Queue,
    pub surface_config: SurfaceConfiguration,
}

impl GpuContext<'_> {
    /// Reconfigures the surface for a new window size; zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.surface_config.width as f32 / self.surface_config.height.max(1) as f32
    }
}

pub struct ShaderModules {
    pub raycast: wgpu::ShaderModule,
}

impl ShaderModules {
    pub fn new(device: &Device) -> Self {
        Self {
            raycast: create_module(device, "raycast.wgsl", render::RAYCAST),
        }
    }
}

/// Entry point for creating a GPU context and loading shader modules.
pub async fn init(window: &Window) -> Result<(GpuContext<'_>, ShaderModules)> {
    let instance_desc = InstanceDescriptor {
        backends: Backends::all(),
        ..Default::default()
    };
    let instance = Instance::new(&instance_desc);

    let surface = instance
        .create_surface(window)
        .context("failed to create wgpu surface")?;

    let adapter = instance
        .request_adapter(&RequestAdapterOptions {
            power_preference: PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .context("no compatible GPU adapter found")?;
    let adapter_info = adapter.get_info();
    info!(
        name = %adapter_info.name,
        backend = ?adapter_info.backend,
        "selected GPU adapter"
    );

    let device_desc = DeviceDescriptor {
        label: Some("Volview Device"),
        required_features: Features::empty(),
        required_limits: adapter.limits(),
        ..Default::default()
    };

    let (device, queue) = adapter
        .request_device(&device_desc)
        .await
        .context("failed to request wgpu device")?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = preferred_surface_format(&surface_caps.formats)
        .context("surface reports no supported formats")?;
    let size = window.inner_size();

    let alpha_mode = surface_caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

    let surface_config = SurfaceConfiguration {
        usage: TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: PresentMode::Fifo,
        alpha_mode,
        desired_maximum_frame_latency: 2,
        view_formats: vec![],
    };

    surface.configure(&device, &surface_config);

    let shaders = ShaderModules::new(&device);

    let context = GpuContext {
        instance,
        surface,
        adapter,
        device,
        queue,
        surface_config,
    };

    Ok((context, shaders))
}

/// egui and the ray caster both write sRGB-encoded colors, so a plain format is
/// preferred. sRGB-only surfaces still work: the renderer decodes before storing.
fn preferred_surface_format(formats: &[TextureFormat]) -> Option<TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first().copied())
}

fn create_module(device: &Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
    })
}
