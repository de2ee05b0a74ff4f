//! Ray-cast volume pass: pipeline, uniforms, the volume and label textures and the LUTs.

use anyhow::{bail, ensure, Context, Result};
use bytemuck::{bytes_of, cast_slice};
use tracing::{debug, info};
use volview_core::{
    colormap::COLORMAP_LUT_SIZE, labels::PALETTE_SIZE, Colormap, LabelPalette, LabelVolume,
    OpacityCurve, RenderUniforms, VolumeImage,
};
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingResource, BindingType, Buffer, BufferBindingType, BufferUsages,
    Color, ColorTargetState, ColorWrites, Device, ErrorFilter, Extent3d, FragmentState, LoadOp,
    MultisampleState, Operations, Origin3d, PipelineLayoutDescriptor, PrimitiveState, Queue,
    RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor,
    ShaderStages, StoreOp, TexelCopyBufferLayout, TexelCopyTextureInfo, Texture, TextureAspect,
    TextureDescriptor, TextureDimension, TextureFormat, TextureSampleType, TextureUsages,
    TextureView, TextureViewDescriptor, TextureViewDimension, VertexState,
};

use crate::ShaderModules;

const VOLUME_FORMAT: TextureFormat = TextureFormat::R16Uint;
const LABEL_FORMAT: TextureFormat = TextureFormat::R8Uint;
const LUT_FORMAT: TextureFormat = TextureFormat::R32Float;
const COLOR_FORMAT: TextureFormat = TextureFormat::Rgba32Float;

/// GPU side of one loaded dataset. Rebuilt wholesale on every load.
#[derive(Debug)]
struct VolumeScene {
    volume_texture: Texture,
    lut_texture: Texture,
    lut_len: u32,
    // kept alive for the bind group
    _label_texture: Texture,
    _palette_texture: Texture,
    bind_group: BindGroup,
}

/// Views shared by every bind group plus the per-scene ones.
struct SceneViews<'a> {
    volume: &'a TextureView,
    opacity_lut: &'a TextureView,
    labels: &'a TextureView,
    palette: &'a TextureView,
}

#[derive(Debug)]
pub struct VolumeRenderer {
    device: Device,
    queue: Queue,
    layout: BindGroupLayout,
    pipeline: RenderPipeline,
    uniform_buffer: Buffer,
    empty_bind_group: BindGroup,
    scene: Option<VolumeScene>,
    color_texture: Texture,
    lut_size: u32,
    srgb_target: bool,
    background: Color,
}

impl VolumeRenderer {
    pub fn new(
        device: &Device,
        queue: &Queue,
        shaders: &ShaderModules,
        target_format: TextureFormat,
        initial: &RenderUniforms,
        lut_size: u32,
        colormap: Colormap,
    ) -> Self {
        let device = device.clone();
        let queue = queue.clone();
        // Two extra texels hold the out-of-domain opacities.
        let lut_size = lut_size.clamp(2, device.limits().max_texture_dimension_1d.saturating_sub(2).max(2));
        let layout = create_bind_group_layout(&device);
        let pipeline = create_pipeline(&device, &layout, shaders, target_format);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("RenderUniforms"),
            size: std::mem::size_of::<RenderUniforms>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let srgb_target = target_format.is_srgb();
        let mut initial = *initial;
        initial.display[1] = if srgb_target { 1.0 } else { 0.0 };
        queue.write_buffer(&uniform_buffer, 0, bytes_of(&initial));

        let color_texture = create_1d_texture(&device, "Color LUT", COLOR_FORMAT, COLORMAP_LUT_SIZE);
        write_texels(&queue, &color_texture, &colormap.to_lut(COLORMAP_LUT_SIZE));

        // Placeholders so the pass can run before anything is loaded.
        let volume_placeholder = create_volume_texture(&device, Extent3d::default());
        let lut_placeholder = create_1d_texture(&device, "Opacity LUT", LUT_FORMAT, 3);
        let label_placeholder = create_label_texture(&device, Extent3d::default());
        let palette_placeholder = create_palette_texture(&device, &queue, &LabelPalette::empty());
        let empty_bind_group = create_bind_group(
            &device,
            &layout,
            &uniform_buffer,
            &color_texture.create_view(&TextureViewDescriptor::default()),
            SceneViews {
                volume: &volume_placeholder.create_view(&TextureViewDescriptor::default()),
                opacity_lut: &lut_placeholder.create_view(&TextureViewDescriptor::default()),
                labels: &label_placeholder.create_view(&TextureViewDescriptor::default()),
                palette: &palette_placeholder.create_view(&TextureViewDescriptor::default()),
            },
        );

        Self {
            device,
            queue,
            layout,
            pipeline,
            uniform_buffer,
            empty_bind_group,
            scene: None,
            color_texture,
            lut_size,
            srgb_target,
            background: clear_color(initial.background, target_format),
        }
    }

    /// Uploads a new volume, its optional label mask and its opacity curve,
    /// replacing any previous scene.
    ///
    /// On error the previous scene is kept.
    pub fn set_volume(
        &mut self,
        image: &VolumeImage,
        labels: Option<&LabelVolume>,
        curve: &OpacityCurve,
    ) -> Result<()> {
        let extents = image.extents();
        let size = Extent3d {
            width: u32::try_from(extents.x).context("volume too wide")?,
            height: u32::try_from(extents.y).context("volume too tall")?,
            depth_or_array_layers: u32::try_from(extents.z).context("volume too deep")?,
        };
        let max_dim = self.device.limits().max_texture_dimension_3d;
        if size.width > max_dim || size.height > max_dim || size.depth_or_array_layers > max_dim {
            bail!(
                "volume {}x{}x{} exceeds the GPU 3D texture limit of {max_dim}",
                size.width,
                size.height,
                size.depth_or_array_layers
            );
        }

        if let Some(labels) = labels {
            ensure!(
                labels.extents() == extents,
                "label grid does not match the volume grid"
            );
        }

        self.device.push_error_scope(ErrorFilter::OutOfMemory);
        self.device.push_error_scope(ErrorFilter::Validation);

        let volume_texture = create_volume_texture(&self.device, size);
        self.queue.write_texture(
            TexelCopyTextureInfo {
                texture: &volume_texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            cast_slice(image.samples()),
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width * VOLUME_FORMAT.block_copy_size(None).unwrap_or(2)),
                rows_per_image: Some(size.height),
            },
            size,
        );

        let lut = curve.to_lut(self.lut_size);
        let lut_len = lut.len() as u32;
        let lut_texture = create_1d_texture(&self.device, "Opacity LUT", LUT_FORMAT, lut_len);
        write_texels(&self.queue, &lut_texture, &lut);

        let (label_texture, palette) = match labels {
            Some(labels) => {
                let texture = create_label_texture(&self.device, size);
                self.queue.write_texture(
                    TexelCopyTextureInfo {
                        texture: &texture,
                        mip_level: 0,
                        origin: Origin3d::ZERO,
                        aspect: TextureAspect::All,
                    },
                    labels.labels(),
                    TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(size.width),
                        rows_per_image: Some(size.height),
                    },
                    size,
                );
                (texture, labels.palette().clone())
            }
            None => (
                create_label_texture(&self.device, Extent3d::default()),
                LabelPalette::empty(),
            ),
        };
        let palette_texture = create_palette_texture(&self.device, &self.queue, &palette);

        let bind_group = create_bind_group(
            &self.device,
            &self.layout,
            &self.uniform_buffer,
            &self.color_texture.create_view(&TextureViewDescriptor::default()),
            SceneViews {
                volume: &volume_texture.create_view(&TextureViewDescriptor::default()),
                opacity_lut: &lut_texture.create_view(&TextureViewDescriptor::default()),
                labels: &label_texture.create_view(&TextureViewDescriptor::default()),
                palette: &palette_texture.create_view(&TextureViewDescriptor::default()),
            },
        );

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(err) = out_of_memory.or(validation) {
            bail!("failed to create volume resources: {err}");
        }

        info!(
            width = size.width,
            height = size.height,
            depth = size.depth_or_array_layers,
            lut_len,
            labels = labels.is_some(),
            "volume uploaded"
        );
        self.scene = Some(VolumeScene {
            volume_texture,
            lut_texture,
            lut_len,
            _label_texture: label_texture,
            _palette_texture: palette_texture,
            bind_group,
        });
        Ok(())
    }

    /// Rewrites the opacity LUT. Returns `false` when no volume is loaded.
    pub fn update_opacity(&self, curve: &OpacityCurve) -> bool {
        let Some(scene) = &self.scene else {
            return false;
        };
        let lut = curve.to_lut(self.lut_size);
        debug_assert_eq!(lut.len() as u32, scene.lut_len);
        write_texels(&self.queue, &scene.lut_texture, &lut);
        debug!(middle = ?curve.middle(), "opacity curve updated");
        true
    }

    /// Rewrites the color ramp. It is shared by every scene, so this works with
    /// or without a loaded volume.
    pub fn update_colormap(&self, colormap: Colormap) {
        write_texels(&self.queue, &self.color_texture, &colormap.to_lut(COLORMAP_LUT_SIZE));
        debug!(colormap = colormap.name(), "colormap updated");
    }

    pub fn update_uniforms(&mut self, uniforms: &RenderUniforms) {
        let mut uniforms = *uniforms;
        uniforms.display[1] = if self.srgb_target { 1.0 } else { 0.0 };
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytes_of(&uniforms));
        self.background = clear_color_for(uniforms.background, self.srgb_target);
    }

    pub fn volume_texture(&self) -> Option<&Texture> {
        self.scene.as_ref().map(|scene| &scene.volume_texture)
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn encode_volume_pass(&self, encoder: &mut wgpu::CommandEncoder, target_view: &TextureView) {
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Volume Raycast Pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: target_view,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(self.background),
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let bind_group = self
            .scene
            .as_ref()
            .map_or(&self.empty_bind_group, |scene| &scene.bind_group);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

/// Clear color for an sRGB-authored `background`. Clear values are written as
/// linear, so sRGB targets need the background decoded first.
pub fn clear_color(background: [f32; 4], target_format: TextureFormat) -> Color {
    clear_color_for(background, target_format.is_srgb())
}

fn clear_color_for(background: [f32; 4], srgb_target: bool) -> Color {
    let [r, g, b, _] = background.map(|c| {
        let c = f64::from(c);
        if srgb_target {
            srgb_to_linear(c)
        } else {
            c
        }
    });
    Color { r, g, b, a: 1.0 }
}

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn create_bind_group_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("raycast_bind_group_layout"),
        entries: &[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Uint,
                    view_dimension: TextureViewDimension::D3,
                    multisampled: false,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 2,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: false },
                    view_dimension: TextureViewDimension::D1,
                    multisampled: false,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 3,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: false },
                    view_dimension: TextureViewDimension::D1,
                    multisampled: false,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 4,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Uint,
                    view_dimension: TextureViewDimension::D3,
                    multisampled: false,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 5,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: false },
                    view_dimension: TextureViewDimension::D1,
                    multisampled: false,
                },
                count: None,
            },
        ],
    })
}

fn create_bind_group(
    device: &Device,
    layout: &BindGroupLayout,
    uniforms: &Buffer,
    color_view: &TextureView,
    views: SceneViews<'_>,
) -> BindGroup {
    device.create_bind_group(&BindGroupDescriptor {
        label: Some("Raycast Bind Group"),
        layout,
        entries: &[
            BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 1,
                resource: BindingResource::TextureView(views.volume),
            },
            BindGroupEntry {
                binding: 2,
                resource: BindingResource::TextureView(views.opacity_lut),
            },
            BindGroupEntry {
                binding: 3,
                resource: BindingResource::TextureView(color_view),
            },
            BindGroupEntry {
                binding: 4,
                resource: BindingResource::TextureView(views.labels),
            },
            BindGroupEntry {
                binding: 5,
                resource: BindingResource::TextureView(views.palette),
            },
        ],
    })
}

fn create_pipeline(
    device: &Device,
    layout: &BindGroupLayout,
    shaders: &ShaderModules,
    target_format: TextureFormat,
) -> RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("Raycast Pipeline Layout"),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("Raycast Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module: &shaders.raycast,
            entry_point: Some("fullscreen_vertex"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        primitive: PrimitiveState::default(),
        depth_stencil: None,
        multisample: MultisampleState::default(),
        fragment: Some(FragmentState {
            module: &shaders.raycast,
            entry_point: Some("raycast_fragment"),
            compilation_options: Default::default(),
            targets: &[Some(ColorTargetState {
                format: target_format,
                blend: None,
                write_mask: ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

fn create_volume_texture(device: &Device, size: Extent3d) -> Texture {
    device.create_texture(&TextureDescriptor {
        label: Some("Volume Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D3,
        format: VOLUME_FORMAT,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST | TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

fn create_label_texture(device: &Device, size: Extent3d) -> Texture {
    device.create_texture(&TextureDescriptor {
        label: Some("Label Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D3,
        format: LABEL_FORMAT,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn create_palette_texture(device: &Device, queue: &Queue, palette: &LabelPalette) -> Texture {
    let texture = create_1d_texture(device, "Label Palette", COLOR_FORMAT, PALETTE_SIZE as u32);
    write_texels(queue, &texture, palette.texels());
    texture
}

fn create_1d_texture(device: &Device, label: &str, format: TextureFormat, len: u32) -> Texture {
    device.create_texture(&TextureDescriptor {
        label: Some(label),
        size: Extent3d {
            width: len.max(1),
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D1,
        format,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

/// Writes one row of texels, `f32` (R32Float) or `[f32; 4]` (Rgba32Float).
fn write_texels<T: bytemuck::Pod>(queue: &Queue, texture: &Texture, texels: &[T]) {
    let width = texels.len() as u32;
    queue.write_texture(
        TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: Origin3d::ZERO,
            aspect: TextureAspect::All,
        },
        cast_slice(texels),
        TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * std::mem::size_of::<T>() as u32),
            rows_per_image: Some(1),
        },
        Extent3d {
            width,
            height: 1,
            depth_or_array_layers: 1,
        },
    );
}
