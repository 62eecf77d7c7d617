//! Renderer selection.
//!
//! The GPU path is probed once at startup. If any part of it fails the
//! canvas fallback is used for the rest of the run.

use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::bottle::Bottle;
use crate::canvas::CanvasRenderer;
use crate::error::{AppError, RenderError};
use crate::gpu::GpuRenderer;
use crate::recorder::Frame;

/// Host controlled switches, read every frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderToggles {
    pub blur: bool,
    pub threshold: bool,
}

impl Default for RenderToggles {
    fn default() -> Self {
        Self {
            blur: true,
            threshold: true,
        }
    }
}

impl RenderToggles {
    /// Thresholding only applies while blur is on.
    pub fn threshold_active(&self) -> bool {
        self.blur && self.threshold
    }
}

pub enum Renderer {
    Gpu(Box<GpuRenderer>),
    Canvas(CanvasRenderer),
}

impl Renderer {
    /// Try the GPU path unless `force_canvas` is set, falling back to
    /// the canvas on any setup error.
    pub fn probe(window: Arc<Window>, bottle: &Bottle, force_canvas: bool) -> Result<Self, AppError> {
        if force_canvas {
            log::info!("canvas renderer forced");
        } else {
            match GpuRenderer::new(Arc::clone(&window), bottle) {
                Ok(gpu) => return Ok(Renderer::Gpu(Box::new(gpu))),
                Err(err) => log::warn!("GPU unavailable, using canvas renderer: {err}"),
            }
        }
        let canvas = CanvasRenderer::new(window).map_err(|e| AppError::Canvas(e.to_string()))?;
        Ok(Renderer::Canvas(canvas))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Renderer::Gpu(_) => "gpu",
            Renderer::Canvas(_) => "canvas",
        }
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        match self {
            Renderer::Gpu(gpu) => gpu.resize(size),
            // the canvas follows the window size on every frame
            Renderer::Canvas(_) => {}
        }
    }

    pub fn render(&mut self, bottle: &Bottle, toggles: RenderToggles) -> Result<(), RenderError> {
        match self {
            Renderer::Gpu(gpu) => gpu.render(bottle, toggles),
            // blur and threshold are GPU-only
            Renderer::Canvas(canvas) => canvas.render(bottle),
        }
    }

    /// The frame just rendered, for the recorder.
    pub fn capture(&mut self, bottle: &Bottle, toggles: RenderToggles) -> Result<Frame, RenderError> {
        match self {
            Renderer::Gpu(gpu) => gpu.capture(bottle, toggles),
            Renderer::Canvas(canvas) => {
                let canvas = canvas.canvas();
                Ok(Frame {
                    width: canvas.width(),
                    height: canvas.height(),
                    rgba: canvas.to_rgba(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_needs_blur() {
        let mut toggles = RenderToggles::default();
        assert!(toggles.threshold_active());
        toggles.blur = false;
        assert!(!toggles.threshold_active());
        toggles.blur = true;
        toggles.threshold = false;
        assert!(!toggles.threshold_active());
    }
}
