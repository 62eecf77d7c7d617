//! Offscreen render targets for the post-processing chain.

use super::GpuContext;

/// A single offscreen color texture.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

impl RenderTarget {
    pub fn new(
        ctx: &GpuContext,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
            format,
        }
    }
}

/// Front/back pair. Passes read `front` and write `back`, then swap.
pub struct RenderTargets {
    pub front: RenderTarget,
    pub back: RenderTarget,
}

impl RenderTargets {
    pub fn new(ctx: &GpuContext, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            front: RenderTarget::new(ctx, "Front Target", width, height, format),
            back: RenderTarget::new(ctx, "Back Target", width, height, format),
        }
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.front.width, self.front.height)
    }

    /// Recreate both textures after a window resize.
    pub fn resize(&mut self, ctx: &GpuContext, width: u32, height: u32) {
        if (width.max(1), height.max(1)) == self.size() {
            return;
        }
        *self = Self::new(ctx, width, height, self.front.format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_recreates_both() {
        let Ok(ctx) = GpuContext::headless() else {
            eprintln!("no GPU adapter, skipping");
            return;
        };
        let mut targets = RenderTargets::new(&ctx, 8, 4, super::super::OFFSCREEN_FORMAT);
        assert_eq!(targets.size(), (8, 4));
        targets.swap();
        targets.resize(&ctx, 16, 0);
        assert_eq!(targets.size(), (16, 1));
        assert_eq!((targets.back.width, targets.back.height), (16, 1));
    }
}
