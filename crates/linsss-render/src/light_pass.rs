//! Light-view geometry pass.
//!
//! Rasterizes the mesh from the point light into a fixed-size MRT holding
//! incident irradiance, world position, and normal. Environment lights skip
//! the geometry but still clear the targets, so downstream consumers always
//! see a defined image.

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::mesh::{GpuMesh, Vertex};

/// Light-view target resolution.
pub const SHADOW_MAP_SIZE: u32 = 2048;

/// Demo point light placement.
pub const LIGHT_POSITION: Vec3 = Vec3::new(5.0, 5.0, 0.0);
pub const LIGHT_POWER: Vec3 = Vec3::new(5.0, 5.0, 5.0);

const LIGHT_FOV_DEG: f32 = 30.0;
const LIGHT_NEAR: f32 = 1.0;
const LIGHT_FAR: f32 = 50.0;

/// GPU representation of the light-pass uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightPassUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub light_pos: [f32; 4],
    pub light_power: [f32; 4],
}

impl Default for LightPassUniforms {
    fn default() -> Self {
        Self {
            view_proj: light_view_proj().to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            light_pos: [LIGHT_POSITION.x, LIGHT_POSITION.y, LIGHT_POSITION.z, 1.0],
            light_power: [LIGHT_POWER.x, LIGHT_POWER.y, LIGHT_POWER.z, 0.0],
        }
    }
}

/// The light's fixed view-projection matrix.
pub fn light_view_proj() -> Mat4 {
    let proj = Mat4::perspective_rh(LIGHT_FOV_DEG.to_radians(), 1.0, LIGHT_NEAR, LIGHT_FAR);
    let view = Mat4::look_at_rh(LIGHT_POSITION, Vec3::ZERO, Vec3::Y);
    proj * view
}

/// Light pass resources.
pub struct LightPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    irradiance_view: wgpu::TextureView,
    position_view: wgpu::TextureView,
    normal_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

impl LightPass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Light Pass Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/light_pass.wgsl").into()),
        });

        let make_target = |label: &str, format: wgpu::TextureFormat| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: SHADOW_MAP_SIZE,
                    height: SHADOW_MAP_SIZE,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            });
            texture.create_view(&wgpu::TextureViewDescriptor::default())
        };

        let irradiance_view = make_target("Light Irradiance", wgpu::TextureFormat::Rgba16Float);
        let position_view = make_target("Light Position", wgpu::TextureFormat::Rgba32Float);
        let normal_view = make_target("Light Normal", wgpu::TextureFormat::Rgba32Float);
        let depth_view = make_target("Light Depth", wgpu::TextureFormat::Depth32Float);

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Pass Uniform Buffer"),
            contents: bytemuck::cast_slice(&[LightPassUniforms::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Light Pass Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Light Pass Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Light Pass Pipeline Layout"),
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
            label: Some("Light Pass Pipeline"),
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
            uniform_buffer,
            irradiance_view,
            position_view,
            normal_view,
            depth_view,
            bind_group,
        }
    }

    pub fn update_uniforms(&self, queue: &wgpu::Queue, model: Mat4) {
        let uniforms = LightPassUniforms {
            model: model.to_cols_array_2d(),
            ..Default::default()
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }

    /// Records the pass. `draw_geometry` is false for environment lights,
    /// which leaves the cleared targets in place.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        mesh: &GpuMesh,
        draw_geometry: bool,
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
            label: Some("Light Pass"),
            color_attachments: &[
                attachment(&self.irradiance_view),
                attachment(&self.position_view),
                attachment(&self.normal_view),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });

        if draw_geometry {
            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            mesh.draw(&mut render_pass);
        }
    }

    pub fn irradiance_view(&self) -> &wgpu::TextureView {
        &self.irradiance_view
    }

    pub fn position_view(&self) -> &wgpu::TextureView {
        &self.position_view
    }

    pub fn normal_view(&self) -> &wgpu::TextureView {
        &self.normal_view
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_view_proj_centers_origin() {
        let clip = light_view_proj() * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4);
        assert!(ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
