//! Copies uploaded volume data back to the CPU for verification.

use anyhow::{ensure, Context, Result};
use wgpu::{
    BufferUsages, CommandEncoderDescriptor, Device, Extent3d, MapMode, Origin3d, PollType, Queue,
    TexelCopyBufferInfo, TexelCopyBufferLayout, TexelCopyTextureInfo, Texture, TextureAspect,
    TextureFormat, COPY_BYTES_PER_ROW_ALIGNMENT,
};

/// Reads the `R16Uint` texel at `(x, y, z)` of a 3D texture.
pub fn read_voxel(device: &Device, queue: &Queue, texture: &Texture, x: u32, y: u32, z: u32) -> Result<u16> {
    ensure!(
        texture.format() == TextureFormat::R16Uint,
        "expected an R16Uint texture, found {:?}",
        texture.format()
    );
    let size = texture.size();
    ensure!(
        x < size.width && y < size.height && z < size.depth_or_array_layers,
        "voxel ({x}, {y}, {z}) outside {}x{}x{}",
        size.width,
        size.height,
        size.depth_or_array_layers
    );

    let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Voxel Readback"),
        size: u64::from(COPY_BYTES_PER_ROW_ALIGNMENT),
        usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
        label: Some("Voxel Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: Origin3d { x, y, z },
            aspect: TextureAspect::All,
        },
        TexelCopyBufferInfo {
            buffer: &staging_buffer,
            layout: TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(COPY_BYTES_PER_ROW_ALIGNMENT),
                rows_per_image: Some(1),
            },
        },
        Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = staging_buffer.slice(..);
    buffer_slice.map_async(MapMode::Read, |_| {});
    device
        .poll(PollType::Wait)
        .context("failed to wait for voxel readback")?;
    let value = {
        let data = buffer_slice.get_mapped_range();
        u16::from_ne_bytes([data[0], data[1]])
    };
    staging_buffer.unmap();
    Ok(value)
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use volview_core::{
        config::ViewerConfig, Extents, LabelBuffer, OpacityCurve, RenderUniforms, SliderPositions,
        VolumeBuffer,
    };

    use super::*;
    use crate::{ShaderModules, VolumeRenderer};

    fn headless_device() -> Option<(Device, Queue)> {
        let instance = wgpu::Instance::default();
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
                .ok()?;
        pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("volview_test_device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            ..Default::default()
        }))
        .ok()
    }

    #[test]
    fn uploaded_volume_reads_back_in_file_coordinates() {
        let Some((device, queue)) = headless_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let extents = Extents::new(4, 4, 4);
        let mut samples = Vec::with_capacity(64);
        for x in 0..4u16 {
            for y in 0..4u16 {
                for z in 0..4u16 {
                    samples.push(100 * x + 10 * y + z);
                }
            }
        }
        let image = VolumeBuffer::new(extents, samples)
            .unwrap()
            .into_image(Vec3::new(3.0, 1.0, 1.0), Vec3::ZERO);

        let config = ViewerConfig::default();
        let curve = OpacityCurve::from_sliders(
            &config.transfer,
            SliderPositions::initial(&config.transfer),
        );
        let shaders = ShaderModules::new(&device);
        let mut renderer = VolumeRenderer::new(
            &device,
            &queue,
            &shaders,
            TextureFormat::Rgba8UnormSrgb,
            &RenderUniforms::empty(&config),
            config.transfer.lut_size,
            config.render.colormap,
        );
        let labels = LabelBuffer::new(extents, vec![0; 64])
            .unwrap()
            .into_volume(extents)
            .unwrap();
        renderer.set_volume(&image, Some(&labels), &curve).unwrap();
        assert!(renderer.update_opacity(&curve));
        renderer.update_colormap(volview_core::Colormap::Bone);

        let texture = renderer.volume_texture().unwrap();
        assert_eq!(read_voxel(&device, &queue, texture, 3, 1, 2).unwrap(), 312);
        assert_eq!(read_voxel(&device, &queue, texture, 0, 3, 1).unwrap(), 31);
        assert!(read_voxel(&device, &queue, texture, 4, 0, 0).is_err());

        let other = LabelBuffer::new(Extents::new(2, 2, 2), vec![0; 8])
            .unwrap()
            .into_volume(Extents::new(2, 2, 2))
            .unwrap();
        assert!(renderer.set_volume(&image, Some(&other), &curve).is_err());
        assert!(renderer.volume_texture().is_some());
    }
}
