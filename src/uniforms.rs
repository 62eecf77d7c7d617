//! Uniform values and the per-program uniform binding table.
//!
//! A program's uniform block is reflected once, when the program is
//! compiled, into a [`UniformLayout`]: member name to byte offset and
//! kind. Setting a uniform writes into a CPU-side [`UniformStaging`]
//! buffer which is uploaded right before the next draw.
//!
//! ```ignore
//! program
//!     .bind()
//!     .uniform("color", vec4(1.0, 1.0, 1.0, 1.0))?
//!     .uniform("size", 1.0f32)?
//!     .draw(ctx, target, Load::Clear(BLACK), Primitive::Points, count)?;
//! ```

use std::collections::HashMap;

use glam::{Vec2, Vec3, Vec4};

use crate::error::UniformError;
use crate::vector::{Vector2, Vector3, Vector4};

/// Supported uniform value types.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    F32(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl UniformValue {
    /// Dispatch on the number of components: one is a plain float,
    /// two to four are vectors, anything else is an error.
    pub fn from_components(values: &[f32]) -> Result<Self, UniformError> {
        match *values {
            [x] => Ok(UniformValue::F32(x)),
            [x, y] => Ok(UniformValue::Vec2([x, y])),
            [x, y, z] => Ok(UniformValue::Vec3([x, y, z])),
            [x, y, z, w] => Ok(UniformValue::Vec4([x, y, z, w])),
            _ => Err(UniformError::InvalidLength(values.len())),
        }
    }

    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::F32(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
        }
    }

    pub fn components(&self) -> &[f32] {
        match self {
            UniformValue::F32(v) => std::slice::from_ref(v),
            UniformValue::Vec2(v) => v,
            UniformValue::Vec3(v) => v,
            UniformValue::Vec4(v) => v,
        }
    }

    /// Write this value to a byte buffer at `offset`.
    pub fn write_bytes(&self, buf: &mut [u8], offset: usize) {
        for (i, component) in self.components().iter().enumerate() {
            let at = offset + i * 4;
            buf[at..at + 4].copy_from_slice(&component.to_le_bytes());
        }
    }
}

// Conversion traits for ergonomic API
impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::F32(v)
    }
}

impl From<Vector2> for UniformValue {
    fn from(v: Vector2) -> Self {
        UniformValue::Vec2(v.to_array())
    }
}

impl From<Vector3> for UniformValue {
    fn from(v: Vector3) -> Self {
        UniformValue::Vec3(v.to_array())
    }
}

impl From<Vector4> for UniformValue {
    fn from(v: Vector4) -> Self {
        UniformValue::Vec4(v.to_array())
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v.to_array())
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v.to_array())
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v.to_array())
    }
}

/// Declared type of a uniform block member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
}

impl UniformKind {
    /// Kind for a float type with `components` lanes.
    pub fn from_components(components: u32) -> Option<Self> {
        match components {
            1 => Some(UniformKind::Float),
            2 => Some(UniformKind::Vec2),
            3 => Some(UniformKind::Vec3),
            4 => Some(UniformKind::Vec4),
            _ => None,
        }
    }

    /// Get the WGSL type name for this kind.
    pub fn wgsl_type(&self) -> &'static str {
        match self {
            UniformKind::Float => "f32",
            UniformKind::Vec2 => "vec2<f32>",
            UniformKind::Vec3 => "vec3<f32>",
            UniformKind::Vec4 => "vec4<f32>",
        }
    }
}

/// Location of one member inside the uniform block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformSlot {
    pub offset: u32,
    pub kind: UniformKind,
}

/// Name -> slot table for a program's uniform block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformLayout {
    /// Declaration order, kept for diagnostics.
    names: Vec<String>,
    slots: HashMap<String, UniformSlot>,
    /// Size of the block in bytes, as laid out by the shader compiler.
    size: u32,
}

impl UniformLayout {
    pub fn new(size: u32) -> Self {
        Self {
            names: Vec::new(),
            slots: HashMap::new(),
            size,
        }
    }

    pub(crate) fn insert(&mut self, name: &str, slot: UniformSlot) {
        if self.slots.insert(name.to_string(), slot).is_none() {
            self.names.push(name.to_string());
        }
    }

    pub fn get(&self, name: &str) -> Option<&UniformSlot> {
        self.slots.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Block size in bytes. Zero when the program declares no uniforms.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Size of the GPU buffer backing this block, rounded up to 16 bytes.
    pub fn buffer_size(&self) -> u64 {
        ((self.size as u64).max(16) + 15) & !15
    }

    /// Iterate over all members in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformSlot)> {
        self.names
            .iter()
            .filter_map(|n| self.slots.get(n).map(|slot| (n.as_str(), slot)))
    }
}

/// CPU-side copy of a uniform block.
#[derive(Clone, Debug)]
pub struct UniformStaging {
    layout: UniformLayout,
    bytes: Vec<u8>,
    dirty: bool,
}

impl UniformStaging {
    pub fn new(layout: UniformLayout) -> Self {
        let bytes = vec![0; layout.buffer_size() as usize];
        Self {
            layout,
            bytes,
            dirty: true,
        }
    }

    /// Set a uniform value, checking it against the declared kind.
    pub fn set<V: Into<UniformValue>>(&mut self, name: &str, value: V) -> Result<(), UniformError> {
        let value = value.into();
        let slot = self
            .layout
            .get(name)
            .ok_or_else(|| UniformError::Unknown(name.to_string()))?;
        if slot.kind != value.kind() {
            return Err(UniformError::KindMismatch {
                name: name.to_string(),
                expected: slot.kind.wgsl_type(),
                actual: value.kind().wgsl_type(),
            });
        }
        value.write_bytes(&mut self.bytes, slot.offset as usize);
        self.dirty = true;
        Ok(())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the bytes if they changed since the last call.
    pub(crate) fn take_dirty(&mut self) -> Option<&[u8]> {
        if std::mem::take(&mut self.dirty) {
            Some(&self.bytes)
        } else {
            None
        }
    }
}
