//! Copy a rendered texture back to the CPU.

use crate::error::RenderError;

use super::{GpuContext, RenderTarget};

/// Read `target` into tightly packed RGBA8 rows, top row first.
///
/// Blocks until the copy has finished. BGRA targets are swizzled to RGBA.
pub fn read_texture(ctx: &GpuContext, target: &RenderTarget) -> Result<Vec<u8>, RenderError> {
    let bytes_per_pixel = target
        .format
        .block_copy_size(None)
        .filter(|size| *size == 4)
        .ok_or_else(|| RenderError::Readback(format!("unsupported format {:?}", target.format)))?;

    let unpadded = target.width * bytes_per_pixel;
    // Rows must be aligned to COPY_BYTES_PER_ROW_ALIGNMENT (256)
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded = unpadded.div_ceil(align) * align;

    let staging_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging Buffer"),
        size: padded as u64 * target.height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(target.height),
            },
        },
        wgpu::Extent3d {
            width: target.width,
            height: target.height,
            depth_or_array_layers: 1,
        },
    );
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let (sender, receiver) = std::sync::mpsc::channel();
    let buffer_slice = staging_buffer.slice(..);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    ctx.device.poll(wgpu::Maintain::Wait);
    receiver
        .recv()
        .map_err(|err| RenderError::Readback(err.to_string()))?
        .map_err(|err| RenderError::Readback(err.to_string()))?;

    let mut pixels = Vec::with_capacity((unpadded * target.height) as usize);
    {
        let data = buffer_slice.get_mapped_range();
        for row in data.chunks(padded as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
    }
    staging_buffer.unmap();

    if matches!(
        target.format,
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
    ) {
        for pixel in pixels.chunks_exact_mut(4) {
            pixel.swap(0, 2);
        }
    }
    Ok(pixels)
}
