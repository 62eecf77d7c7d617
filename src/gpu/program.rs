//! Compiled vertex/fragment programs and their per-draw bindings.

use crate::error::{RenderError, ShaderError};
use crate::shader::{ShaderInterface, ShaderSource, FRAGMENT_ENTRY, VERTEX_ENTRY};
use crate::uniforms::{UniformStaging, UniformValue};

use super::{DynamicBuffer, GpuContext, RenderTarget};

/// How the bound attributes are assembled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    /// One screen-aligned quad (six vertices) per attribute element.
    Points,
    /// Plain triangle list, three attribute elements per triangle.
    Triangles,
}

const QUAD_VERTICES: u32 = 6;

/// A validated shader pair with its pipelines and uniform block.
pub struct Program {
    label: &'static str,
    interface: ShaderInterface,
    /// Attribute names in buffer slot order (sorted by location).
    slots: Vec<String>,
    staging: UniformStaging,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_layout: Option<wgpu::BindGroupLayout>,
    sampler: wgpu::Sampler,
    points: wgpu::RenderPipeline,
    triangles: wgpu::RenderPipeline,
}

impl Program {
    /// Validate, reflect and build pipelines that render into `format`.
    pub fn compile(
        ctx: &GpuContext,
        source: &ShaderSource,
        format: wgpu::TextureFormat,
    ) -> Result<Self, ShaderError> {
        let interface = ShaderInterface::of(source)?;
        let device = &ctx.device;
        let label = source.label;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.vertex.into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.fragment.into()),
        });

        let staging = UniformStaging::new(interface.uniforms.clone());
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: interface.uniforms.buffer_size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = interface.samples_texture.then(|| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Source Texture Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            })
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Source Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let mut bind_group_layouts = vec![&uniform_layout];
        bind_group_layouts.extend(texture_layout.as_ref());
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let slots: Vec<String> = interface
            .attributes
            .iter()
            .map(|(name, _)| name.to_string())
            .collect();
        let attributes: Vec<[wgpu::VertexAttribute; 1]> = interface
            .attributes
            .iter()
            .map(|(_, slot)| {
                [wgpu::VertexAttribute {
                    format: vertex_format(slot.components),
                    offset: 0,
                    shader_location: slot.location,
                }]
            })
            .collect();

        let build = |primitive: Primitive| {
            let step_mode = match primitive {
                Primitive::Points => wgpu::VertexStepMode::Instance,
                Primitive::Triangles => wgpu::VertexStepMode::Vertex,
            };
            let buffers: Vec<wgpu::VertexBufferLayout> = attributes
                .iter()
                .map(|attribute| wgpu::VertexBufferLayout {
                    array_stride: attribute[0].format.size(),
                    step_mode,
                    attributes: attribute,
                })
                .collect();

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex_module,
                    entry_point: Some(VERTEX_ENTRY),
                    buffers: &buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment_module,
                    entry_point: Some(FRAGMENT_ENTRY),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };
        let points = build(Primitive::Points);
        let triangles = build(Primitive::Triangles);

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Link {
                label: label.to_string(),
                message: err.to_string(),
            });
        }

        log::debug!(
            "compiled program `{}`: {} uniforms, {} attributes",
            label,
            interface.uniforms.len(),
            interface.attributes.len()
        );

        Ok(Self {
            label,
            interface,
            slots,
            staging,
            uniform_buffer,
            uniform_bind_group,
            texture_layout,
            sampler,
            points,
            triangles,
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn interface(&self) -> &ShaderInterface {
        &self.interface
    }

    /// Make this program current and start binding inputs for a draw.
    pub fn bind(&mut self) -> ProgramBinding<'_> {
        let vertex_buffers = vec![None; self.slots.len()];
        ProgramBinding {
            program: self,
            vertex_buffers,
            texture: None,
        }
    }
}

fn vertex_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

/// Inputs for one draw call of a [`Program`].
pub struct ProgramBinding<'a> {
    program: &'a mut Program,
    vertex_buffers: Vec<Option<&'a DynamicBuffer>>,
    texture: Option<&'a RenderTarget>,
}

impl<'a> ProgramBinding<'a> {
    /// Set a uniform by name. Floats bind `f32` members, vectors bind
    /// the vector member of the same width.
    pub fn uniform<V: Into<UniformValue>>(self, name: &str, value: V) -> Result<Self, RenderError> {
        self.program.staging.set(name, value)?;
        Ok(self)
    }

    /// Set a uniform from a slice of 1 to 4 floats.
    pub fn uniform_slice(self, name: &str, values: &[f32]) -> Result<Self, RenderError> {
        let value = UniformValue::from_components(values)?;
        self.uniform(name, value)
    }

    /// Bind `buffer` as tightly packed `f32`s with `components` per element.
    pub fn attribute(
        mut self,
        name: &str,
        buffer: &'a DynamicBuffer,
        components: u32,
    ) -> Result<Self, RenderError> {
        let slot = self
            .program
            .interface
            .attributes
            .get(name)
            .ok_or_else(|| RenderError::UnknownAttribute(name.to_string()))?;
        if slot.components != components {
            return Err(RenderError::AttributeComponents {
                name: name.to_string(),
                expected: slot.components,
                actual: components,
            });
        }
        if let Some(index) = self.program.slots.iter().position(|n| n == name) {
            self.vertex_buffers[index] = Some(buffer);
        }
        Ok(self)
    }

    /// Sample `target` as the source image.
    pub fn texture(mut self, target: &'a RenderTarget) -> Self {
        self.texture = Some(target);
        self
    }

    /// Record and submit a single draw into `target`, checking the device
    /// for errors right after.
    pub fn draw(
        self,
        ctx: &GpuContext,
        target: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
        primitive: Primitive,
        count: u32,
    ) -> Result<(), RenderError> {
        let program = self.program;

        for (name, buffer) in program.slots.iter().zip(&self.vertex_buffers) {
            if buffer.is_none() {
                return Err(RenderError::UnboundAttribute(name.clone()));
            }
        }

        let texture_bind_group = match (&program.texture_layout, self.texture) {
            (None, _) => None,
            (Some(_), None) => return Err(RenderError::MissingTexture),
            (Some(layout), Some(source)) => {
                Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Source Texture Bind Group"),
                    layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&source.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&program.sampler),
                        },
                    ],
                }))
            }
        };

        if let Some(bytes) = program.staging.take_dirty() {
            ctx.queue.write_buffer(&program.uniform_buffer, 0, bytes);
        }

        ctx.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(program.label),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(program.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let pipeline = match primitive {
                Primitive::Points => &program.points,
                Primitive::Triangles => &program.triangles,
            };
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &program.uniform_bind_group, &[]);
            if let Some(bind_group) = &texture_bind_group {
                render_pass.set_bind_group(1, bind_group, &[]);
            }

            let mut drawable = count > 0;
            for (slot, buffer) in self.vertex_buffers.iter().flatten().enumerate() {
                match buffer.buffer() {
                    Some(gpu) if !buffer.is_empty() => {
                        render_pass.set_vertex_buffer(slot as u32, gpu.slice(..buffer.len()));
                    }
                    _ => drawable = false,
                }
            }

            if drawable {
                match primitive {
                    Primitive::Points => render_pass.draw(0..QUAD_VERTICES, 0..count),
                    Primitive::Triangles => render_pass.draw(0..count, 0..1),
                }
            }
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let validation = pollster::block_on(ctx.device.pop_error_scope());
        let out_of_memory = pollster::block_on(ctx.device.pop_error_scope());
        match validation.or(out_of_memory) {
            Some(err) => Err(RenderError::Draw {
                label: program.label.to_string(),
                message: err.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{BALL, SOLID};
    use crate::vector::{vec2, vec4};

    #[test]
    fn test_vertex_format_width() {
        assert_eq!(vertex_format(1).size(), 4);
        assert_eq!(vertex_format(2).size(), 8);
        assert_eq!(vertex_format(4).size(), 16);
    }

    #[test]
    fn test_binding_errors() {
        let Ok(ctx) = GpuContext::headless() else {
            eprintln!("no GPU adapter, skipping");
            return;
        };
        let mut program = Program::compile(&ctx, &SOLID, ctx.format).unwrap();
        let mut buffer = DynamicBuffer::new("positions");
        buffer.update(&ctx, bytemuck::cast_slice(&[[0.0f32, 0.0]; 3]));

        let err = program.bind().uniform("missing", 1.0f32).err();
        assert!(matches!(err, Some(RenderError::Uniform(_))));

        let err = program.bind().attribute("position", &buffer, 3).err();
        assert!(matches!(
            err,
            Some(RenderError::AttributeComponents { expected: 2, actual: 3, .. })
        ));

        let err = program.bind().attribute("nope", &buffer, 2).err();
        assert!(matches!(err, Some(RenderError::UnknownAttribute(_))));

        let err = program.bind().uniform_slice("color", &[0.0; 6]).err();
        assert!(matches!(err, Some(RenderError::Uniform(_))));
    }

    #[test]
    fn test_unbound_attribute_fails_draw() {
        let Ok(ctx) = GpuContext::headless() else {
            eprintln!("no GPU adapter, skipping");
            return;
        };
        let target = RenderTarget::new(&ctx, "test", 4, 4, ctx.format);
        let mut program = Program::compile(&ctx, &BALL, ctx.format).unwrap();
        let result = program
            .bind()
            .uniform("color", vec4(1.0, 1.0, 1.0, 1.0))
            .and_then(|b| b.uniform("scale", vec2(1.0, 1.0)))
            .and_then(|b| {
                b.draw(
                    &ctx,
                    &target.view,
                    wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    Primitive::Points,
                    1,
                )
            });
        assert!(matches!(result, Err(RenderError::UnboundAttribute(name)) if name == "ball"));
    }
}
