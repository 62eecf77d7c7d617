//! Frame timing and the fixed simulation step.
//!
//! Rendering runs once per redraw at whatever rate the display allows.
//! The simulation runs at a fixed `dt`: each frame's real delta goes into
//! an accumulator and [`FixedStep::advance`] says how many ticks fit.
//!
//! # Example
//!
//! ```ignore
//! let mut time = Time::new();
//! let mut steps = FixedStep::new(1.0 / 30.0);
//!
//! // In the redraw handler:
//! let delta = time.update();
//! for _ in 0..steps.advance(delta) {
//!     bottle.step();
//! }
//! window.set_title(&format!("lavabottle - {:.0} fps", time.fps()));
//! ```

use std::time::{Duration, Instant};

/// Upper bound on simulation ticks run for a single frame.
///
/// A frame that took longer than this many steps drops the excess time
/// instead of trying to catch up.
pub const MAX_TICKS_PER_FRAME: u32 = 4;

/// Frame timing for the render loop.
#[derive(Debug)]
pub struct Time {
    last_frame: Instant,
    delta_secs: f32,
    frame_count: u64,
    /// Frames per second over the last completed window.
    fps: f32,
    window_start_frame: u64,
    window_start: Instant,
    fps_window: Duration,
}

impl Time {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            last_frame: now,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            window_start_frame: 0,
            window_start: now,
            fps_window: Duration::from_millis(500),
        }
    }

    /// Update timing values. Call once per frame. Returns the delta.
    pub fn update(&mut self) -> f32 {
        self.update_at(Instant::now())
    }

    pub fn update_at(&mut self, now: Instant) -> f32 {
        self.delta_secs = now.saturating_duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frame_count += 1;

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= self.fps_window {
            let frames = self.frame_count - self.window_start_frame;
            self.fps = frames as f32 / elapsed.as_secs_f32();
            self.window_start_frame = self.frame_count;
            self.window_start = now;
        }

        self.delta_secs
    }

    /// Seconds between the last two updates.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Number of updates so far.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulator that turns real frame time into fixed simulation ticks.
#[derive(Debug, Clone)]
pub struct FixedStep {
    dt: f32,
    accumulator: f32,
    max_ticks: u32,
    paused: bool,
}

impl FixedStep {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            accumulator: 0.0,
            max_ticks: MAX_TICKS_PER_FRAME,
            paused: false,
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: u32) -> Self {
        self.max_ticks = max_ticks.max(1);
        self
    }

    /// Add `delta` seconds and return the number of ticks to run now.
    pub fn advance(&mut self, delta: f32) -> u32 {
        if self.paused || self.dt <= 0.0 {
            return 0;
        }
        self.accumulator += delta.max(0.0);
        let mut ticks = 0;
        while self.accumulator >= self.dt && ticks < self.max_ticks {
            self.accumulator -= self.dt;
            ticks += 1;
        }
        if ticks == self.max_ticks {
            // spiral of death
            self.accumulator = self.accumulator.min(self.dt);
        }
        ticks
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Toggle pause state. Time that passes while paused is discarded.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_new() {
        let time = Time::new();
        assert_eq!(time.frame(), 0);
        assert_eq!(time.fps(), 0.0);
    }

    #[test]
    fn test_time_update() {
        let start = Instant::now();
        let mut time = Time::starting_at(start);
        let delta = time.update_at(start + Duration::from_millis(10));
        assert!((delta - 0.010).abs() < 1e-4);
        assert_eq!(time.frame(), 1);
    }

    #[test]
    fn test_fps() {
        let start = Instant::now();
        let mut time = Time::starting_at(start);
        for i in 1..=30 {
            time.update_at(start + Duration::from_millis(i * 1000 / 60));
        }
        assert!((time.fps() - 60.0).abs() < 1.0, "fps {}", time.fps());
    }

    #[test]
    fn test_fixed_step_accumulates() {
        let mut steps = FixedStep::new(0.1);
        assert_eq!(steps.advance(0.05), 0);
        assert_eq!(steps.advance(0.06), 1);
        assert_eq!(steps.advance(0.2), 2);
    }

    #[test]
    fn test_fixed_step_caps_ticks() {
        let mut steps = FixedStep::new(0.1).with_max_ticks(3);
        assert_eq!(steps.advance(10.0), 3);
        // the backlog is dropped
        assert!(steps.advance(0.0) <= 1);
    }

    #[test]
    fn test_fixed_step_pause() {
        let mut steps = FixedStep::new(0.1);
        steps.advance(0.05);
        steps.toggle_pause();
        assert!(steps.is_paused());
        assert_eq!(steps.advance(1.0), 0);
        steps.toggle_pause();
        assert_eq!(steps.advance(0.06), 0);
    }
}
