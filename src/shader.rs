//! Embedded WGSL sources and their reflected binding interface.
//!
//! Each program is a vertex/fragment pair. Before any GPU object is
//! created the pair is parsed and validated with naga, and the uniform
//! block and vertex attributes are read straight out of the module IR.
//! The resulting [`ShaderInterface`] is the binding table a
//! [`Program`](crate::gpu::Program) looks names up in.
//!
//! Conventions every embedded source follows:
//!
//! - entry points are `vs_main` and `fs_main`
//! - the uniform block is a struct at `@group(0) @binding(0)`
//! - a sampled source image lives at `@group(1)`, texture at binding 0
//!   and sampler at binding 1

use std::collections::HashMap;

use naga::front::wgsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, Module, Scalar, ScalarKind, ShaderStage, TypeInner};

use crate::error::{ShaderError, Stage};
use crate::uniforms::{UniformKind, UniformLayout, UniformSlot};

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Bind group holding the uniform block.
pub const UNIFORM_GROUP: u32 = 0;
/// Bind group holding the sampled source image.
pub const TEXTURE_GROUP: u32 = 1;

/// A vertex/fragment source pair.
#[derive(Clone, Copy, Debug)]
pub struct ShaderSource {
    pub label: &'static str,
    pub vertex: &'static str,
    pub fragment: &'static str,
}

const QUAD_VERTEX: &str = include_str!("shaders/quad.vert.wgsl");

/// Balls as instanced discs.
pub const BALL: ShaderSource = ShaderSource {
    label: "ball",
    vertex: include_str!("shaders/ball.vert.wgsl"),
    fragment: include_str!("shaders/ball.frag.wgsl"),
};

/// One axis of the separable Gaussian blur.
pub const BLUR: ShaderSource = ShaderSource {
    label: "blur",
    vertex: QUAD_VERTEX,
    fragment: include_str!("shaders/blur.frag.wgsl"),
};

/// Threshold or copy to the final target.
pub const THRESHOLD: ShaderSource = ShaderSource {
    label: "threshold",
    vertex: QUAD_VERTEX,
    fragment: include_str!("shaders/threshold.frag.wgsl"),
};

/// Flat-coloured static geometry.
pub const SOLID: ShaderSource = ShaderSource {
    label: "solid",
    vertex: include_str!("shaders/solid.vert.wgsl"),
    fragment: include_str!("shaders/solid.frag.wgsl"),
};

/// All programs the renderer compiles at setup.
pub const ALL: [ShaderSource; 4] = [BALL, BLUR, THRESHOLD, SOLID];

/// Location and width of one vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeSlot {
    pub location: u32,
    pub components: u32,
}

/// Vertex attributes of the `vs_main` entry point.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeTable {
    slots: HashMap<String, AttributeSlot>,
}

impl AttributeTable {
    pub fn get(&self, name: &str) -> Option<&AttributeSlot> {
        self.slots.get(name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Attributes sorted by location.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeSlot)> {
        let mut entries: Vec<_> = self.slots.iter().map(|(n, s)| (n.as_str(), s)).collect();
        entries.sort_by_key(|(_, slot)| slot.location);
        entries.into_iter()
    }
}

/// Everything the CPU side needs to know to bind a program.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderInterface {
    pub uniforms: UniformLayout,
    pub attributes: AttributeTable,
    /// The fragment stage reads a source image at [`TEXTURE_GROUP`].
    pub samples_texture: bool,
}

impl ShaderInterface {
    /// Validate a vertex/fragment pair and reflect its interface.
    pub fn reflect(vertex: &str, fragment: &str) -> Result<Self, ShaderError> {
        let vs = parse_and_validate(vertex, Stage::Vertex)?;
        let fs = parse_and_validate(fragment, Stage::Fragment)?;

        let vs_entry = find_entry(&vs, ShaderStage::Vertex, VERTEX_ENTRY, Stage::Vertex)?;
        find_entry(&fs, ShaderStage::Fragment, FRAGMENT_ENTRY, Stage::Fragment)?;

        let uniforms = match (uniform_block(&vs)?, uniform_block(&fs)?) {
            (Some(a), Some(b)) => {
                check_agreement(&a, &b)?;
                a
            }
            (Some(layout), None) | (None, Some(layout)) => layout,
            (None, None) => UniformLayout::default(),
        };

        Ok(Self {
            uniforms,
            attributes: attributes(&vs, vs_entry)?,
            samples_texture: samples_texture(&fs),
        })
    }

    pub fn of(source: &ShaderSource) -> Result<Self, ShaderError> {
        Self::reflect(source.vertex, source.fragment)
    }
}

fn parse_and_validate(source: &str, stage: Stage) -> Result<Module, ShaderError> {
    let module = wgsl::parse_str(source).map_err(|err| ShaderError::Parse {
        stage,
        message: err.emit_to_string(source),
    })?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    validator
        .validate(&module)
        .map_err(|err| ShaderError::Validation {
            stage,
            message: format!("{}", err),
        })?;

    Ok(module)
}

fn find_entry<'m>(
    module: &'m Module,
    shader_stage: ShaderStage,
    name: &'static str,
    stage: Stage,
) -> Result<&'m naga::EntryPoint, ShaderError> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.stage == shader_stage && ep.name == name)
        .ok_or(ShaderError::MissingEntryPoint {
            stage,
            entry_point: name,
        })
}

/// Number of lanes of an `f32` scalar or vector type.
fn float_components(inner: &TypeInner) -> Option<u32> {
    const F32: Scalar = Scalar {
        kind: ScalarKind::Float,
        width: 4,
    };
    match *inner {
        TypeInner::Scalar(scalar) if scalar == F32 => Some(1),
        TypeInner::Vector { size, scalar } if scalar == F32 => Some(size as u32),
        _ => None,
    }
}

fn uniform_block(module: &Module) -> Result<Option<UniformLayout>, ShaderError> {
    let block = module.global_variables.iter().find(|(_, var)| {
        var.space == AddressSpace::Uniform
            && var
                .binding
                .as_ref()
                .is_some_and(|b| b.group == UNIFORM_GROUP && b.binding == 0)
    });
    let Some((_, var)) = block else {
        return Ok(None);
    };

    let var_name = var.name.clone().unwrap_or_default();
    let TypeInner::Struct { members, span } = &module.types[var.ty].inner else {
        return Err(ShaderError::UnsupportedUniform { name: var_name });
    };

    let mut layout = UniformLayout::new(*span);
    for member in members {
        let name = member.name.clone().unwrap_or_default();
        let kind = float_components(&module.types[member.ty].inner)
            .and_then(UniformKind::from_components)
            .ok_or_else(|| ShaderError::UnsupportedUniform { name: name.clone() })?;
        layout.insert(
            &name,
            UniformSlot {
                offset: member.offset,
                kind,
            },
        );
    }
    Ok(Some(layout))
}

fn check_agreement(vertex: &UniformLayout, fragment: &UniformLayout) -> Result<(), ShaderError> {
    for (name, slot) in vertex.iter() {
        if fragment.get(name) != Some(slot) {
            return Err(ShaderError::InterfaceMismatch { name: name.to_string() });
        }
    }
    for (name, slot) in fragment.iter() {
        if vertex.get(name) != Some(slot) {
            return Err(ShaderError::InterfaceMismatch { name: name.to_string() });
        }
    }
    Ok(())
}

fn attributes(module: &Module, entry: &naga::EntryPoint) -> Result<AttributeTable, ShaderError> {
    let mut table = AttributeTable::default();
    let mut push = |name: Option<&String>,
                    ty: naga::Handle<naga::Type>,
                    binding: Option<&Binding>|
     -> Result<(), ShaderError> {
        let Some(Binding::Location { location, .. }) = binding else {
            return Ok(());
        };
        let name = name.cloned().unwrap_or_default();
        let components = float_components(&module.types[ty].inner)
            .ok_or_else(|| ShaderError::UnsupportedAttribute { name: name.clone() })?;
        table.slots.insert(
            name,
            AttributeSlot {
                location: *location,
                components,
            },
        );
        Ok(())
    };

    for arg in &entry.function.arguments {
        match (&arg.binding, &module.types[arg.ty].inner) {
            (None, TypeInner::Struct { members, .. }) => {
                for member in members {
                    push(member.name.as_ref(), member.ty, member.binding.as_ref())?;
                }
            }
            (binding, _) => push(arg.name.as_ref(), arg.ty, binding.as_ref())?,
        }
    }
    Ok(table)
}

fn samples_texture(module: &Module) -> bool {
    module.global_variables.iter().any(|(_, var)| {
        var.binding.as_ref().is_some_and(|b| b.group == TEXTURE_GROUP)
            && matches!(module.types[var.ty].inner, TypeInner::Image { .. })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ball_interface() {
        let iface = ShaderInterface::of(&BALL).unwrap();
        assert_eq!(
            iface.uniforms.get("color"),
            Some(&UniformSlot { offset: 0, kind: UniformKind::Vec4 })
        );
        assert_eq!(
            iface.uniforms.get("scale"),
            Some(&UniformSlot { offset: 16, kind: UniformKind::Vec2 })
        );
        assert_eq!(
            iface.uniforms.get("size"),
            Some(&UniformSlot { offset: 24, kind: UniformKind::Float })
        );
        assert_eq!(
            iface.attributes.get("ball"),
            Some(&AttributeSlot { location: 0, components: 2 })
        );
        assert!(!iface.samples_texture);
    }

    #[test]
    fn test_post_process_interfaces() {
        let blur = ShaderInterface::of(&BLUR).unwrap();
        assert!(blur.samples_texture);
        assert!(blur.attributes.is_empty());
        assert_eq!(blur.uniforms.get("radius").map(|s| s.kind), Some(UniformKind::Float));
        assert_eq!(blur.uniforms.get("direction").map(|s| s.kind), Some(UniformKind::Vec2));

        let threshold = ShaderInterface::of(&THRESHOLD).unwrap();
        assert!(threshold.samples_texture);
        assert_eq!(threshold.uniforms.len(), 4);
        assert_eq!(threshold.uniforms.get("mode").map(|s| s.kind), Some(UniformKind::Float));
    }

    #[test]
    fn test_solid_interface() {
        let solid = ShaderInterface::of(&SOLID).unwrap();
        assert_eq!(
            solid.attributes.get("position"),
            Some(&AttributeSlot { location: 0, components: 2 })
        );
        assert_eq!(solid.uniforms.len(), 2);
        assert!(!solid.samples_texture);
    }

    #[test]
    fn test_parse_error_names_stage() {
        let err = ShaderInterface::reflect("fn vs_main( {", SOLID.fragment).unwrap_err();
        match err {
            ShaderError::Parse { stage, message } => {
                assert_eq!(stage, Stage::Vertex);
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_entry_point() {
        let fragment = "@fragment fn main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let err = ShaderInterface::reflect(SOLID.vertex, fragment).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::MissingEntryPoint { stage: Stage::Fragment, entry_point: "fs_main" }
        ));
    }

    #[test]
    fn test_stage_disagreement() {
        let fragment = r#"
struct Uniforms {
    scale: vec2<f32>,
    color: vec4<f32>,
};
@group(0) @binding(0)
var<uniform> uniforms: Uniforms;
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return uniforms.color;
}
"#;
        let err = ShaderInterface::reflect(SOLID.vertex, fragment).unwrap_err();
        assert!(matches!(err, ShaderError::InterfaceMismatch { .. }));
    }

    #[test]
    fn test_integer_uniform_rejected() {
        let vertex = r#"
struct Uniforms {
    count: u32,
};
@group(0) @binding(0)
var<uniform> uniforms: Uniforms;
@vertex
fn vs_main() -> @builtin(position) vec4<f32> {
    return vec4<f32>(f32(uniforms.count), 0.0, 0.0, 1.0);
}
"#;
        let err = ShaderInterface::reflect(vertex, SOLID.fragment).unwrap_err();
        assert!(matches!(err, ShaderError::UnsupportedUniform { name } if name == "count"));
    }
}
