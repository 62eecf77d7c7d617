//! # lavabottle
//!
//! A lava lamp in a bottle. A few hundred rigid balls tumble inside a walled
//! container with two spikes while gravity periodically flips. The balls are
//! drawn as soft points, blurred, and thresholded so neighbours merge into
//! blobs.
//!
//! ## Quick Start
//!
//! ```ignore
//! use lavabottle::prelude::*;
//!
//! fn main() -> Result<(), AppError> {
//!     Simulation::new()
//!         .with_bottle(BottleConfig::default().with_ball_count(200).with_seed(7))
//!         .with_toggles(RenderToggles { blur: true, threshold: true })
//!         .run()
//! }
//! ```
//!
//! ## Pieces
//!
//! - [`Bottle`] owns the physics [`World`](physics::World), the container
//!   geometry and the gravity schedule.
//! - [`gpu`] compiles the WGSL programs, reflects their interfaces with naga
//!   and runs the ball, blur, threshold and geometry passes.
//! - [`canvas`] is the CPU fallback used when no GPU path can be set up.
//! - [`Recorder`] writes rendered frames as numbered PNG files.
//!
//! ## Controls
//!
//! | Key     | Action                 |
//! |---------|------------------------|
//! | `B`     | toggle blur            |
//! | `T`     | toggle threshold       |
//! | `Space` | pause / resume physics |
//! | `Esc`   | quit                   |

pub mod bottle;
pub mod canvas;
pub mod error;
pub mod gpu;
pub mod input;
pub mod physics;
pub mod recorder;
pub mod render;
pub mod shader;
pub mod simulation;
pub mod time;
pub mod uniforms;
pub mod vector;

pub use bottle::{Bottle, BottleConfig, GravitySchedule, StaticPolygon};
pub use error::{
    AppError, PhysicsError, RecordError, RenderError, SetupError, ShaderError, UniformError, VectorError,
};
pub use glam::Vec2;
pub use recorder::{Frame, Recorder};
pub use render::{RenderToggles, Renderer};
pub use shader::{ShaderInterface, ShaderSource};
pub use simulation::Simulation;
pub use uniforms::{UniformKind, UniformValue};
pub use vector::{vec2, vec3, vec4, Vector, Vector2, Vector3, Vector4};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use lavabottle::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bottle::{Bottle, BottleConfig};
    pub use crate::error::AppError;
    pub use crate::input::Command;
    pub use crate::physics::{Material, Shape};
    pub use crate::recorder::Recorder;
    pub use crate::render::RenderToggles;
    pub use crate::simulation::Simulation;
    pub use crate::time::{FixedStep, Time};
    pub use crate::uniforms::UniformValue;
    pub use crate::vector::{vec2, vec3, vec4, Vector2, Vector3, Vector4};
    pub use crate::Vec2;
}
