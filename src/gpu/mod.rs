//! GPU path: device setup, programs, buffers, render targets and the
//! per-frame pass sequence.

mod buffer;
mod pipeline;
mod program;
mod readback;
mod targets;

use std::sync::Arc;

use winit::window::Window;

use crate::error::SetupError;

pub use buffer::{DynamicBuffer, Upload};
pub use pipeline::{FramePipeline, GpuRenderer};
pub use program::{Primitive, Program, ProgramBinding};
pub use readback::read_texture;
pub use targets::{RenderTarget, RenderTargets};

/// Format of the offscreen ball and blur targets.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Device, queue and the format of the final image.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Format the final passes render into.
    pub format: wgpu::TextureFormat,
}

impl GpuContext {
    /// Create a context with no window, rendering into
    /// [`OFFSCREEN_FORMAT`] textures.
    pub fn headless() -> Result<Self, SetupError> {
        pollster::block_on(async {
            let instance = create_instance();
            let (_, device, queue) = request_device(&instance, None).await?;
            Ok(Self {
                device,
                queue,
                format: OFFSCREEN_FORMAT,
            })
        })
    }

    /// Create a context that can present to `window`.
    pub async fn for_window(
        window: Arc<Window>,
    ) -> Result<(Self, wgpu::Surface<'static>, wgpu::SurfaceConfiguration), SetupError> {
        let size = window.inner_size();
        let instance = create_instance();
        let surface = instance.create_surface(window)?;
        let (adapter, device, queue) = request_device(&instance, Some(&surface)).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format =
            pick_surface_format(&surface_caps.formats).ok_or(SetupError::UnsupportedSurface)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .ok_or(SetupError::UnsupportedSurface)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        log::info!(
            "GPU renderer on {} ({:?}), surface format {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            surface_format
        );

        Ok((
            Self {
                device,
                queue,
                format: surface_format,
            },
            surface,
            config,
        ))
    }
}

/// Prefer a non-sRGB format. Style colors and the offscreen
/// targets hold display values, which an sRGB view would re-encode.
fn pick_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first())
        .copied()
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    })
}

async fn request_device(
    instance: &wgpu::Instance,
    compatible_surface: Option<&wgpu::Surface<'_>>,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue), SetupError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface,
            force_fallback_adapter: false,
        })
        .await
        .ok_or(SetupError::NoAdapter)?;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                memory_hints: Default::default(),
            },
            None,
        )
        .await?;

    Ok((adapter, device, queue))
}
