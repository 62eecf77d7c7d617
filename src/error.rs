//! Error types for lavabottle.
//!
//! Setup failures are recovered once by falling back to the canvas
//! renderer. Everything that goes wrong inside a frame is a
//! [`RenderError`] and ends the run.

use thiserror::Error;

/// Errors that can occur while bringing up the GPU path.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// The surface reports no usable texture format.
    #[error("surface is not supported by the selected adapter")]
    UnsupportedSurface,
    /// A shader program failed to compile.
    #[error(transparent)]
    Shader(#[from] ShaderError),
}

/// Shader stage named in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Vertex => write!(f, "vertex"),
            Stage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Compile or link failure of a shader program.
///
/// `message` is the front end's diagnostic, unmodified.
#[derive(Debug, Clone, Error)]
pub enum ShaderError {
    #[error("{stage} shader parse error: {message}")]
    Parse { stage: Stage, message: String },
    #[error("{stage} shader validation error: {message}")]
    Validation { stage: Stage, message: String },
    #[error("{stage} shader has no `{entry_point}` entry point")]
    MissingEntryPoint {
        stage: Stage,
        entry_point: &'static str,
    },
    #[error("uniform `{name}` is declared differently by the vertex and fragment stages")]
    InterfaceMismatch { name: String },
    #[error("uniform `{name}` has a type that cannot be bound from the CPU")]
    UnsupportedUniform { name: String },
    #[error("program `{label}` failed to link: {message}")]
    Link { label: String, message: String },
    #[error("vertex attribute `{name}` must be an f32 scalar or vector")]
    UnsupportedAttribute { name: String },
}

/// Misuse of a uniform binding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UniformError {
    #[error("program has no uniform named `{0}`")]
    Unknown(String),
    #[error("uniform `{name}` expects {expected} but was given {actual}")]
    KindMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("invalid vector length {0}: uniforms take 1 to 4 components")]
    InvalidLength(usize),
}

/// Misuse of a [`Vector`](crate::Vector).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VectorError {
    #[error("`{field}` is not a field of a {arity}-vector")]
    UnknownField { field: char, arity: usize },
    #[error("swizzle `{pattern}` has {actual} fields but {expected} were requested")]
    SwizzleLength {
        pattern: String,
        expected: usize,
        actual: usize,
    },
    #[error("expected {expected} components, got {actual}")]
    SliceLength { expected: usize, actual: usize },
}

/// Errors raised while configuring the physics world.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("polygon with {0} vertices does not enclose any area")]
    DegeneratePolygon(usize),
    #[error("body handle does not belong to this world")]
    UnknownBody,
}

/// Errors that can occur while rendering a frame.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The device reported an error right after a draw call.
    #[error("draw call `{label}` failed: {message}")]
    Draw { label: String, message: String },
    #[error("failed to acquire surface texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error(transparent)]
    Uniform(#[from] UniformError),
    #[error("program has no attribute named `{0}`")]
    UnknownAttribute(String),
    #[error("attribute `{name}` has {expected} components but the buffer was described with {actual}")]
    AttributeComponents {
        name: String,
        expected: u32,
        actual: u32,
    },
    #[error("attribute `{0}` is declared but no buffer was bound")]
    UnboundAttribute(String),
    #[error("program samples a texture but none was bound")]
    MissingTexture,
    #[error("failed to present canvas frame: {0}")]
    Present(String),
    #[error("failed to read back frame: {0}")]
    Readback(String),
}

/// Errors that can occur while saving recorded frames.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to write frame: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode frame: {0}")]
    Image(#[from] image::ImageError),
    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },
}

/// Errors that can occur when running the demo.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to set up the canvas fallback: {0}")]
    Canvas(String),
    #[error(transparent)]
    Physics(#[from] PhysicsError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Record(#[from] RecordError),
}
