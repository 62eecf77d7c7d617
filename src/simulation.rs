//! Simulation builder and runner

use std::path::PathBuf;
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::bottle::{Bottle, BottleConfig};
use crate::error::AppError;
use crate::input::Command;
use crate::recorder::Recorder;
use crate::render::{RenderToggles, Renderer};
use crate::time::{FixedStep, Time};

const TITLE: &str = "lavabottle";
/// Frames between window title refreshes.
const TITLE_INTERVAL: u64 = 30;

/// A lava bottle window builder.
///
/// Use method chaining to configure, then call `.run()` to start.
pub struct Simulation {
    bottle: BottleConfig,
    toggles: RenderToggles,
    force_canvas: bool,
    record_dir: Option<PathBuf>,
    window_size: (u32, u32),
}

impl Simulation {
    /// Create a new simulation with default settings.
    pub fn new() -> Self {
        Self {
            bottle: BottleConfig::default(),
            toggles: RenderToggles::default(),
            force_canvas: false,
            record_dir: None,
            window_size: (500, 700),
        }
    }

    pub fn with_bottle(mut self, config: BottleConfig) -> Self {
        self.bottle = config;
        self
    }

    /// Initial blur/threshold state. Both can be toggled at runtime.
    pub fn with_toggles(mut self, toggles: RenderToggles) -> Self {
        self.toggles = toggles;
        self
    }

    /// Skip the GPU probe and draw with the canvas renderer.
    pub fn with_canvas(mut self, force: bool) -> Self {
        self.force_canvas = force;
        self
    }

    /// Write every frame as a PNG into `dir`.
    pub fn with_recording(mut self, dir: impl Into<PathBuf>) -> Self {
        self.record_dir = Some(dir.into());
        self
    }

    /// Logical window size.
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    /// Run the simulation. This blocks until the window is closed.
    pub fn run(self) -> Result<(), AppError> {
        let dt = self.bottle.dt;
        let bottle = Bottle::new(self.bottle)?;
        let recorder = self.record_dir.map(Recorder::new).transpose()?;

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App {
            window: None,
            renderer: None,
            bottle,
            toggles: self.toggles,
            time: Time::new(),
            steps: FixedStep::new(dt),
            recorder,
            force_canvas: self.force_canvas,
            window_size: self.window_size,
            error: None,
        };
        event_loop.run_app(&mut app)?;

        match app.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

struct App {
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    bottle: Bottle,
    toggles: RenderToggles,
    time: Time,
    steps: FixedStep,
    recorder: Option<Recorder>,
    force_canvas: bool,
    window_size: (u32, u32),
    /// First fatal error; the loop exits as soon as one is stored.
    error: Option<AppError>,
}

impl App {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        log::error!("{err}");
        self.error.get_or_insert(err);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let (width, height) = self.window_size;
        let window_attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(LogicalSize::new(width, height));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let renderer = Renderer::probe(Arc::clone(&window), &self.bottle, self.force_canvas)?;
        log::info!("using {} renderer", renderer.name());

        window.request_redraw();
        self.window = Some(window);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn apply(&mut self, event_loop: &ActiveEventLoop, command: Command) {
        match command {
            Command::ToggleBlur => {
                self.toggles.blur = !self.toggles.blur;
                log::info!("blur {}", on_off(self.toggles.blur));
            }
            Command::ToggleThreshold => {
                self.toggles.threshold = !self.toggles.threshold;
                log::info!("threshold {}", on_off(self.toggles.threshold));
            }
            Command::TogglePause => {
                self.steps.toggle_pause();
                log::info!("physics {}", if self.steps.is_paused() { "paused" } else { "running" });
            }
            Command::Quit => event_loop.exit(),
        }
    }

    fn frame(&mut self) -> Result<(), AppError> {
        let delta = self.time.update();
        for _ in 0..self.steps.advance(delta) {
            self.bottle.step();
        }

        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        renderer.render(&self.bottle, self.toggles)?;

        if let Some(recorder) = self.recorder.as_mut() {
            let frame = renderer.capture(&self.bottle, self.toggles)?;
            recorder.record(&frame)?;
        }

        if self.time.frame() % TITLE_INTERVAL == 0 {
            if let Some(window) = &self.window {
                let paused = if self.steps.is_paused() { " (paused)" } else { "" };
                window.set_title(&format!("{TITLE} - {:.0} fps{paused}", self.time.fps()));
            }
        }
        Ok(())
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(err) = self.init(event_loop) {
                self.fail(event_loop, err);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(physical_size);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(command) = Command::from_event(&event) {
                    self.apply(event_loop, command);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.frame() {
                    self.fail(event_loop, err);
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}
