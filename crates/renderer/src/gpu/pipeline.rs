use anyhow::Result;
use postfx::{PassKind, PassOptions};
use wgpu::util::DeviceExt;

use crate::compile::{compile_blit_shader, compile_pass_shader, compile_vertex_shader};

use super::targets::Source;
use super::uniforms::PassUniforms;

/// Layout shared by every full-screen program: parameter block at binding 0,
/// input texture at 1, sampler at 2.
pub(crate) struct PassLayouts {
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub vertex_module: wgpu::ShaderModule,
    pub sampler: wgpu::Sampler,
}

impl PassLayouts {
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pass layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pass pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("pass sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            bind_group_layout,
            pipeline_layout,
            vertex_module: compile_vertex_shader(device)?,
            sampler,
        })
    }
}

/// A compiled full-screen program with its parameter buffer and one bind
/// group per possible input.
pub(crate) struct PassPipeline {
    pub kind: Option<PassKind>,
    pub pipeline: wgpu::RenderPipeline,
    pub uniform_buffer: wgpu::Buffer,
    bind_groups: Vec<wgpu::BindGroup>,
}

impl PassPipeline {
    pub fn pass(
        device: &wgpu::Device,
        layouts: &PassLayouts,
        format: wgpu::TextureFormat,
        kind: PassKind,
        options: &PassOptions,
    ) -> Result<Self> {
        let fragment = compile_pass_shader(device, kind, options)?;
        Ok(Self::new(device, layouts, format, Some(kind), &fragment))
    }

    /// Straight copy, used when no pass is enabled.
    pub fn blit(
        device: &wgpu::Device,
        layouts: &PassLayouts,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let fragment = compile_blit_shader(device)?;
        Ok(Self::new(device, layouts, format, None, &fragment))
    }

    fn new(
        device: &wgpu::Device,
        layouts: &PassLayouts,
        format: wgpu::TextureFormat,
        kind: Option<PassKind>,
        fragment: &wgpu::ShaderModule,
    ) -> Self {
        let label = kind.map_or_else(|| "blit".to_string(), |kind| kind.to_string());
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&layouts.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &layouts.vertex_module,
                entry_point: Some("main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: fragment,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} params")),
            contents: bytemuck::bytes_of(&PassUniforms {
                slots: [[0.0; 4]; postfx::PARAM_SLOTS],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            kind,
            pipeline,
            uniform_buffer,
            bind_groups: Vec::new(),
        }
    }

    /// Rebuilds the per-input bind groups. Must run whenever targets are
    /// recreated.
    pub fn rebind(
        &mut self,
        device: &wgpu::Device,
        layouts: &PassLayouts,
        inputs: [&wgpu::TextureView; Source::COUNT],
    ) {
        self.bind_groups = inputs
            .iter()
            .map(|view| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("pass bind group"),
                    layout: &layouts.bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: self.uniform_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&layouts.sampler),
                        },
                    ],
                })
            })
            .collect();
    }

    pub fn write_uniforms(&self, queue: &wgpu::Queue, uniforms: &PassUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        input: Source,
        output: &wgpu::TextureView,
    ) {
        let Some(bind_group) = self.bind_groups.get(input.index()) else {
            tracing::warn!(pass = ?self.kind, "pass has no bind groups; skipping draw");
            return;
        };
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("post pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}
