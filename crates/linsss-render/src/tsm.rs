//! Translucent shadow map stage.
//!
//! Two quarter-resolution color targets alternate roles each frame: the pass
//! renders the mesh into the write half while reading the running average
//! from the other, then the result is copied into a single sampled texture
//! for the deferred pass. Disabling the feature clears the write half
//! instead, so the composite always sees a defined (black) contribution.

use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;

use linsss_core::pingpong::TSM_DOWNSAMPLE;

use crate::mesh::{GpuMesh, Vertex};

/// GPU representation of the TSM uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct TsmUniforms {
    pub mvp: [[f32; 4]; 4],
    pub sm_mvp: [[f32; 4]; 4],
    pub sigmas: [[f32; 4]; 8],
    pub screen_extent: [f32; 2],
    pub bssrdf_extent: [f32; 2],
    pub seed: f32,
    pub sigma_scale: f32,
    pub sample_radius: f32,
    pub accumulated: u32,
    pub n_lobes: u32,
    pub _padding: [u32; 3],
}

struct Target {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// TSM stage resources.
pub struct TsmPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    prev_sampler: wgpu::Sampler,
    targets: [Target; 2],
    depth_view: wgpu::TextureView,
    resolved: wgpu::Texture,
    resolved_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl TsmPass {
    #[must_use]
    pub fn new(device: &wgpu::Device, surface_width: u32, surface_height: u32) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("TSM Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/tsm.wgsl").into()),
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("TSM Bind Group Layout"),
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
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
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
                    wgpu::BindGroupLayoutEntry {
                        binding: 5,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D3,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 6,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("TSM Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("TSM Pipeline"),
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
                targets: &[Some(wgpu::ColorTargetState {
                    format: wgpu::TextureFormat::Rgba16Float,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
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

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("TSM Uniform Buffer"),
            contents: bytemuck::cast_slice(&[TsmUniforms {
                mvp: Mat4::IDENTITY.to_cols_array_2d(),
                sm_mvp: Mat4::IDENTITY.to_cols_array_2d(),
                sigmas: [[1.0; 4]; 8],
                screen_extent: [1.0, 1.0],
                bssrdf_extent: [1.0, 1.0],
                seed: 0.0,
                sigma_scale: 1.0,
                sample_radius: 0.0,
                accumulated: 0,
                n_lobes: 0,
                _padding: [0; 3],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let prev_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("TSM History Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let (width, height) = Self::target_extent(surface_width, surface_height);
        let (targets, depth_view, resolved, resolved_view) = Self::make_targets(device, width, height);

        Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
            prev_sampler,
            targets,
            depth_view,
            resolved,
            resolved_view,
            width,
            height,
        }
    }

    fn target_extent(surface_width: u32, surface_height: u32) -> (u32, u32) {
        (
            (surface_width / TSM_DOWNSAMPLE).max(1),
            (surface_height / TSM_DOWNSAMPLE).max(1),
        )
    }

    fn make_targets(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> ([Target; 2], wgpu::TextureView, wgpu::Texture, wgpu::TextureView) {
        let make_color = |label: &str, extra: wgpu::TextureUsages| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba16Float,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | extra,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            (texture, view)
        };

        let render_usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC;
        let (t0, v0) = make_color("TSM Target 0", render_usage);
        let (t1, v1) = make_color("TSM Target 1", render_usage);
        let (resolved, resolved_view) = make_color("TSM Resolved", wgpu::TextureUsages::COPY_DST);

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("TSM Depth"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        (
            [
                Target {
                    texture: t0,
                    view: v0,
                },
                Target {
                    texture: t1,
                    view: v1,
                },
            ],
            depth_view,
            resolved,
            resolved_view,
        )
    }

    pub fn resize(&mut self, device: &wgpu::Device, surface_width: u32, surface_height: u32) {
        let (width, height) = Self::target_extent(surface_width, surface_height);
        self.width = width;
        self.height = height;
        let (targets, depth_view, resolved, resolved_view) =
            Self::make_targets(device, width, height);
        self.targets = targets;
        self.depth_view = depth_view;
        self.resolved = resolved;
        self.resolved_view = resolved_view;
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_uniforms(
        &self,
        queue: &wgpu::Queue,
        mvp: Mat4,
        sm_mvp: Mat4,
        sigmas: &[Vec4],
        bssrdf_extent: [f32; 2],
        ksize: u32,
        sigma_scale: f32,
        seed: f32,
        accumulated: u32,
    ) {
        let mut sigma_rows = [[0.0f32; 4]; 8];
        for (dst, src) in sigma_rows.iter_mut().zip(sigmas) {
            *dst = src.to_array();
        }
        #[allow(clippy::cast_precision_loss)]
        let sample_radius = ksize as f32 / (2.0 * bssrdf_extent[0].max(1.0));
        #[allow(clippy::cast_precision_loss)]
        let screen_extent = [self.width as f32, self.height as f32];
        let uniforms = TsmUniforms {
            mvp: mvp.to_cols_array_2d(),
            sm_mvp: sm_mvp.to_cols_array_2d(),
            sigmas: sigma_rows,
            screen_extent,
            bssrdf_extent,
            seed,
            sigma_scale,
            sample_radius,
            accumulated,
            n_lobes: u32::try_from(sigmas.len()).unwrap_or(8).min(8),
            _padding: [0; 3],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }

    /// Binds the light-pass products, the read half, and the weight volume.
    #[must_use]
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        light_irradiance: &wgpu::TextureView,
        light_position: &wgpu::TextureView,
        read_index: usize,
        weights: &wgpu::TextureView,
        weights_sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("TSM Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(light_irradiance),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(light_position),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&self.targets[read_index].view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&self.prev_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(weights),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::Sampler(weights_sampler),
                },
            ],
        })
    }

    /// Renders the estimator into the write half.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        write_index: usize,
        bind_group: &wgpu::BindGroup,
        mesh: &GpuMesh,
    ) {
        let mut render_pass = self.begin_pass(encoder, write_index);
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        mesh.draw(&mut render_pass);
    }

    /// Clears the write half; used when the feature is disabled.
    pub fn clear_write(&self, encoder: &mut wgpu::CommandEncoder, write_index: usize) {
        drop(self.begin_pass(encoder, write_index));
    }

    /// Clears both halves, restarting the accumulation after a view change.
    pub fn clear_all(&self, encoder: &mut wgpu::CommandEncoder) {
        drop(self.begin_pass(encoder, 0));
        drop(self.begin_pass(encoder, 1));
    }

    fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        target: usize,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("TSM Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.targets[target].view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        })
    }

    /// Copies the freshly written half into the sampled texture.
    pub fn resolve(&self, encoder: &mut wgpu::CommandEncoder, write_index: usize) {
        encoder.copy_texture_to_texture(
            self.targets[write_index].texture.as_image_copy(),
            self.resolved.as_image_copy(),
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// The sampled TSM texture consumed by the deferred pass.
    pub fn resolved_view(&self) -> &wgpu::TextureView {
        &self.resolved_view
    }
}
