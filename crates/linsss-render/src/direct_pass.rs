//! Camera-view MRT pass.
//!
//! Produces the per-pixel inputs every later stage consumes: diffuse
//! irradiance (the pyramid's level-0 signal), specular reflection, world
//! position with linear view depth, normal, and the mesh UV addressing the
//! BSSRDF weight maps.

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use linsss_core::ShCoefficients;

use crate::light_pass::{light_view_proj, LIGHT_POSITION, LIGHT_POWER};
use crate::mesh::{GpuMesh, Vertex};

/// GPU representation of the direct-pass uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct DirectUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub sm_mvp: [[f32; 4]; 4],
    pub view_pos: [f32; 4],
    pub light_pos: [f32; 4],
    pub light_power: [f32; 4],
    pub sh: [[f32; 4]; 9],
    pub light_kind: u32,
    pub _padding: [u32; 3],
}

impl Default for DirectUniforms {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            sm_mvp: light_view_proj().to_cols_array_2d(),
            view_pos: [0.0; 4],
            light_pos: [LIGHT_POSITION.x, LIGHT_POSITION.y, LIGHT_POSITION.z, 1.0],
            light_power: [LIGHT_POWER.x, LIGHT_POWER.y, LIGHT_POWER.z, 0.0],
            sh: [[0.0; 4]; 9],
            light_kind: 0,
            _padding: [0; 3],
        }
    }
}

/// The camera-view G-buffer targets.
pub struct GBuffer {
    pub diffuse_view: wgpu::TextureView,
    pub specular_view: wgpu::TextureView,
    pub position_view: wgpu::TextureView,
    pub normal_view: wgpu::TextureView,
    pub texcoord_view: wgpu::TextureView,
    pub depth_view: wgpu::TextureView,
    pub diffuse_texture: wgpu::Texture,
}

impl GBuffer {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let make = |label: &str, format: wgpu::TextureFormat, extra: wgpu::TextureUsages| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | extra,
                view_formats: &[],
            })
        };
        let none = wgpu::TextureUsages::empty();
        let diffuse_texture = make(
            "GBuffer Diffuse",
            wgpu::TextureFormat::Rgba16Float,
            wgpu::TextureUsages::COPY_SRC,
        );
        let diffuse_view = diffuse_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let view = |t: wgpu::Texture| t.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            diffuse_view,
            specular_view: view(make("GBuffer Specular", wgpu::TextureFormat::Rgba16Float, none)),
            position_view: view(make("GBuffer Position", wgpu::TextureFormat::Rgba32Float, none)),
            normal_view: view(make("GBuffer Normal", wgpu::TextureFormat::Rgba32Float, none)),
            texcoord_view: view(make("GBuffer Texcoord", wgpu::TextureFormat::Rgba32Float, none)),
            depth_view: view(make("GBuffer Depth", wgpu::TextureFormat::Depth32Float, none)),
            diffuse_texture,
        }
    }
}

/// Direct pass resources.
pub struct DirectPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    shadow_sampler: wgpu::Sampler,
    gbuffer: GBuffer,
}

impl DirectPass {
    #[must_use]
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Direct Pass Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/direct_pass.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Direct Pass Uniform Buffer"),
            contents: bytemuck::cast_slice(&[DirectUniforms::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Direct Pass Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
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
                            sample_type: wgpu::TextureSampleType::Depth,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 4,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Direct Pass Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let color_target = |format| {
            Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Direct Pass Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[
                    color_target(wgpu::TextureFormat::Rgba16Float),
                    color_target(wgpu::TextureFormat::Rgba16Float),
                    color_target(wgpu::TextureFormat::Rgba32Float),
                    color_target(wgpu::TextureFormat::Rgba32Float),
                    color_target(wgpu::TextureFormat::Rgba32Float),
                ],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
            shadow_sampler,
            gbuffer: GBuffer::new(device, width, height),
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.gbuffer = GBuffer::new(device, width, height);
    }

    pub fn update_uniforms(
        &self,
        queue: &wgpu::Queue,
        view_proj: Mat4,
        model: Mat4,
        view_pos: Vec3,
        sh: Option<&ShCoefficients>,
    ) {
        let mut uniforms = DirectUniforms {
            view_proj: view_proj.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            view_pos: [view_pos.x, view_pos.y, view_pos.z, 1.0],
            ..Default::default()
        };
        if let Some(sh) = sh {
            for (dst, src) in uniforms.sh.iter_mut().zip(sh.as_array()) {
                *dst = src.to_array();
            }
            uniforms.light_kind = 1;
        }
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }

    #[must_use]
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        shadow_depth: &wgpu::TextureView,
        ks_view: &wgpu::TextureView,
        ks_sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Direct Pass Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(shadow_depth),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.shadow_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(ks_view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(ks_sampler),
                },
            ],
        })
    }

    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        mesh: &GpuMesh,
    ) {
        let attachment = |view| {
            Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })
        };
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Direct Pass"),
            color_attachments: &[
                attachment(&self.gbuffer.diffuse_view),
                attachment(&self.gbuffer.specular_view),
                attachment(&self.gbuffer.position_view),
                attachment(&self.gbuffer.normal_view),
                attachment(&self.gbuffer.texcoord_view),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.gbuffer.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        mesh.draw(&mut render_pass);
    }

    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }
}
