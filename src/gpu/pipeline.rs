//! The fixed per-frame pass sequence.
//!
//! 1. balls as discs into the front target
//! 2. optional separable blur, ping-ponging front and back
//! 3. threshold (or copy) from the front target to the destination
//! 4. static geometry on top of the destination

use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::bottle::Bottle;
use crate::error::{RenderError, SetupError, ShaderError};
use crate::recorder::Frame;
use crate::render::RenderToggles;
use crate::shader;
use crate::vector::{vec2, vec4, Vector2, Vector4};

use super::{
    read_texture, DynamicBuffer, GpuContext, Primitive, Program, RenderTarget, RenderTargets,
    OFFSCREEN_FORMAT,
};

/// Colors and kernel parameters of the pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameStyle {
    pub background: wgpu::Color,
    pub ball_color: Vector4,
    pub geometry_color: Vector4,
    pub foreground: Vector4,
    /// Blur kernel half-width in pixels.
    pub blur_radius: f32,
    /// Mean brightness above which a pixel becomes foreground.
    pub threshold: f32,
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self {
            background: wgpu::Color::BLACK,
            ball_color: vec4(1.0, 1.0, 1.0, 1.0),
            geometry_color: vec4(0.5, 0.5, 0.5, 1.0),
            foreground: vec4(1.0, 1.0, 1.0, 1.0),
            blur_radius: 14.0,
            threshold: (0x2f * 3) as f32 / 765.0,
        }
    }
}

/// Programs, buffers and offscreen targets for drawing a bottle.
///
/// Does not own a surface; the final passes render into whatever view
/// the caller passes.
pub struct FramePipeline {
    style: FrameStyle,
    ball: Program,
    blur: Program,
    threshold: Program,
    solid: Program,
    balls: DynamicBuffer,
    geometry: DynamicBuffer,
    geometry_vertices: u32,
    positions: Vec<[f32; 2]>,
    targets: RenderTargets,
}

impl FramePipeline {
    pub fn new(
        ctx: &GpuContext,
        bottle: &Bottle,
        width: u32,
        height: u32,
    ) -> Result<Self, ShaderError> {
        let ball = Program::compile(ctx, &shader::BALL, OFFSCREEN_FORMAT)?;
        let blur = Program::compile(ctx, &shader::BLUR, OFFSCREEN_FORMAT)?;
        let threshold = Program::compile(ctx, &shader::THRESHOLD, ctx.format)?;
        let solid = Program::compile(ctx, &shader::SOLID, ctx.format)?;

        let triangles = bottle.static_triangles();
        let mut geometry = DynamicBuffer::new("Static Geometry Buffer");
        geometry.update(ctx, bytemuck::cast_slice(&triangles));

        Ok(Self {
            style: FrameStyle::default(),
            ball,
            blur,
            threshold,
            solid,
            balls: DynamicBuffer::new("Ball Buffer"),
            geometry,
            geometry_vertices: triangles.len() as u32,
            positions: Vec::with_capacity(bottle.ball_count()),
            targets: RenderTargets::new(ctx, width, height, OFFSCREEN_FORMAT),
        })
    }

    pub fn with_style(mut self, style: FrameStyle) -> Self {
        self.style = style;
        self
    }

    pub fn resize(&mut self, ctx: &GpuContext, width: u32, height: u32) {
        self.targets.resize(ctx, width, height);
    }

    pub fn size(&self) -> (u32, u32) {
        self.targets.size()
    }

    pub fn ball_buffer(&self) -> &DynamicBuffer {
        &self.balls
    }

    /// Run every pass, finishing in `destination`.
    pub fn render(
        &mut self,
        ctx: &GpuContext,
        bottle: &Bottle,
        toggles: RenderToggles,
        destination: &wgpu::TextureView,
    ) -> Result<(), RenderError> {
        self.draw_balls(ctx, bottle)?;
        if toggles.blur {
            self.blur_passes(ctx)?;
        }
        self.composite(ctx, bottle, toggles, destination)
    }

    fn draw_balls(&mut self, ctx: &GpuContext, bottle: &Bottle) -> Result<(), RenderError> {
        bottle.pack_positions(&mut self.positions);
        self.balls.update(ctx, bytemuck::cast_slice(&self.positions));

        self.ball
            .bind()
            .uniform("color", self.style.ball_color)?
            .uniform("size", bottle.config().ball_radius)?
            .uniform("scale", Vector2::from(bottle.clip_scale()))?
            .attribute("ball", &self.balls, 2)?
            .draw(
                ctx,
                &self.targets.front.view,
                wgpu::LoadOp::Clear(self.style.background),
                Primitive::Points,
                self.positions.len() as u32,
            )
    }

    fn blur_passes(&mut self, ctx: &GpuContext) -> Result<(), RenderError> {
        let (width, height) = self.targets.size();
        let directions = [
            vec2(1.0 / width as f32, 0.0),
            vec2(0.0, 1.0 / height as f32),
        ];
        for direction in directions {
            self.blur
                .bind()
                .uniform("direction", direction)?
                .uniform("radius", self.style.blur_radius)?
                .texture(&self.targets.front)
                .draw(
                    ctx,
                    &self.targets.back.view,
                    wgpu::LoadOp::Clear(self.style.background),
                    Primitive::Triangles,
                    3,
                )?;
            self.targets.swap();
        }
        Ok(())
    }

    /// Threshold and geometry passes from the current front target into
    /// `destination`. Can be repeated for several destinations.
    pub fn composite(
        &mut self,
        ctx: &GpuContext,
        bottle: &Bottle,
        toggles: RenderToggles,
        destination: &wgpu::TextureView,
    ) -> Result<(), RenderError> {
        let mode: f32 = if toggles.threshold_active() { 1.0 } else { 0.0 };
        self.threshold
            .bind()
            .uniform("mode", mode)?
            .uniform("threshold", self.style.threshold)?
            .uniform("foreground", self.style.foreground)?
            .uniform("background", background_vector(self.style.background))?
            .texture(&self.targets.front)
            .draw(
                ctx,
                destination,
                wgpu::LoadOp::Clear(self.style.background),
                Primitive::Triangles,
                3,
            )?;

        self.solid
            .bind()
            .uniform("color", self.style.geometry_color)?
            .uniform("scale", Vector2::from(bottle.clip_scale()))?
            .attribute("position", &self.geometry, 2)?
            .draw(
                ctx,
                destination,
                wgpu::LoadOp::Load,
                Primitive::Triangles,
                self.geometry_vertices,
            )
    }
}

fn background_vector(color: wgpu::Color) -> Vector4 {
    vec4(color.r as f32, color.g as f32, color.b as f32, color.a as f32)
}

/// [`FramePipeline`] presenting to a window surface.
pub struct GpuRenderer {
    ctx: GpuContext,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    frame: FramePipeline,
    /// Offscreen copy of the final image, created on first capture.
    capture: Option<RenderTarget>,
}

impl GpuRenderer {
    pub fn new(window: Arc<Window>, bottle: &Bottle) -> Result<Self, SetupError> {
        let (ctx, surface, config) = pollster::block_on(GpuContext::for_window(window))?;
        let frame = FramePipeline::new(&ctx, bottle, config.width, config.height)?;
        Ok(Self {
            ctx,
            surface,
            config,
            frame,
            capture: None,
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.ctx.device, &self.config);
            self.frame.resize(&self.ctx, new_size.width, new_size.height);
        }
    }

    pub fn render(&mut self, bottle: &Bottle, toggles: RenderToggles) -> Result<(), RenderError> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost or outdated, reconfiguring");
                self.surface.configure(&self.ctx.device, &self.config);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.frame.render(&self.ctx, bottle, toggles, &view)?;
        output.present();
        Ok(())
    }

    /// Read back the last rendered frame.
    pub fn capture(&mut self, bottle: &Bottle, toggles: RenderToggles) -> Result<Frame, RenderError> {
        let (width, height) = (self.config.width, self.config.height);
        let stale = self
            .capture
            .as_ref()
            .map_or(true, |t| (t.width, t.height) != (width, height));
        if stale {
            self.capture = Some(RenderTarget::new(
                &self.ctx,
                "Capture Target",
                width,
                height,
                self.ctx.format,
            ));
        }
        let Some(target) = self.capture.as_ref() else {
            return Err(RenderError::Readback("no capture target".into()));
        };

        self.frame.composite(&self.ctx, bottle, toggles, &target.view)?;
        let rgba = read_texture(&self.ctx, target)?;
        Ok(Frame {
            width: target.width,
            height: target.height,
            rgba,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bottle::BottleConfig;

    fn pixel(rgba: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * width + x) * 4) as usize;
        [rgba[i], rgba[i + 1], rgba[i + 2], rgba[i + 3]]
    }

    #[test]
    fn test_default_style() {
        let style = FrameStyle::default();
        assert!((style.threshold - 0.1843).abs() < 1e-3);
        assert_eq!(style.blur_radius, 14.0);
    }

    #[test]
    fn test_headless_frame() {
        let Ok(ctx) = GpuContext::headless() else {
            eprintln!("no GPU adapter, skipping");
            return;
        };
        let bottle = Bottle::new(BottleConfig::default().with_ball_count(0)).unwrap();
        let mut frame = FramePipeline::new(&ctx, &bottle, 100, 140).unwrap();
        let output = RenderTarget::new(&ctx, "output", 100, 140, ctx.format);

        let toggles = RenderToggles {
            blur: false,
            threshold: false,
        };
        frame.render(&ctx, &bottle, toggles, &output.view).unwrap();
        let rgba = read_texture(&ctx, &output).unwrap();

        assert_eq!(rgba.len(), 100 * 140 * 4);
        // empty middle of the bottle
        assert_eq!(pixel(&rgba, 100, 50, 70), [0, 0, 0, 255]);
        // inside the right spike, same gray as the canvas fallback
        let spike = pixel(&rgba, 100, 96, 70);
        assert!((126..=130).contains(&spike[0]), "spike {spike:?}");
    }

    #[test]
    fn test_ball_buffer_reused_between_frames() {
        let Ok(ctx) = GpuContext::headless() else {
            eprintln!("no GPU adapter, skipping");
            return;
        };
        let mut bottle = Bottle::new(BottleConfig::default().with_ball_count(5).with_seed(2)).unwrap();
        let mut frame = FramePipeline::new(&ctx, &bottle, 50, 70).unwrap();
        let output = RenderTarget::new(&ctx, "output", 50, 70, ctx.format);

        for _ in 0..3 {
            frame
                .render(&ctx, &bottle, RenderToggles::default(), &output.view)
                .unwrap();
            bottle.step();
        }
        assert_eq!(frame.ball_buffer().allocations(), 1);
        assert_eq!(frame.ball_buffer().len(), 5 * 8);
    }
}
