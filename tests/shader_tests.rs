//! Reflection and compilation of the embedded WGSL programs.

use lavabottle::error::{ShaderError, Stage};
use lavabottle::gpu::{GpuContext, Program, OFFSCREEN_FORMAT};
use lavabottle::shader::{self, ShaderInterface, ShaderSource};

#[test]
fn test_every_program_reflects() {
    for source in shader::ALL {
        let iface = ShaderInterface::of(&source)
            .unwrap_or_else(|e| panic!("{} failed to reflect: {e}", source.label));
        assert_eq!(iface.uniforms.buffer_size() % 16, 0, "{}", source.label);
        assert!(!iface.uniforms.is_empty(), "{} has no uniforms", source.label);
    }
}

#[test]
fn test_attributes_only_on_geometry_programs() {
    let with_attributes: Vec<&str> = shader::ALL
        .iter()
        .filter(|s| !ShaderInterface::of(s).unwrap().attributes.is_empty())
        .map(|s| s.label)
        .collect();
    assert_eq!(with_attributes, vec!["ball", "solid"]);
}

#[test]
fn test_validation_error_carries_diagnostic() {
    // parses, but two outputs share a location
    let fragment = "
        struct Out { @location(0) a: vec4<f32>, @location(0) b: vec4<f32> };
        @fragment fn fs_main() -> Out { return Out(vec4<f32>(1.0), vec4<f32>(0.0)); }
    ";
    let source = ShaderSource {
        label: "broken",
        vertex: shader::SOLID.vertex,
        fragment,
    };
    match ShaderInterface::of(&source) {
        Err(ShaderError::Validation { stage, message }) => {
            assert_eq!(stage, Stage::Fragment);
            assert!(!message.is_empty());
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn test_every_program_compiles_on_gpu() {
    let Ok(ctx) = GpuContext::headless() else {
        eprintln!("no GPU adapter, skipping");
        return;
    };
    for source in shader::ALL {
        let program = Program::compile(&ctx, &source, OFFSCREEN_FORMAT)
            .unwrap_or_else(|e| panic!("{} failed to compile: {e}", source.label));
        assert_eq!(program.label(), source.label);
    }
}
