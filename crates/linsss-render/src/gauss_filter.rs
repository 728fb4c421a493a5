//! Mip-pyramid Gaussian filter stage.
//!
//! Fills the filtered pyramid: level 0 is a copy of the base irradiance,
//! every level above it is the matching irradiance mip blurred by that lobe's
//! sigma, horizontal then vertical through a scratch texture. Levels blur the
//! base mips independently; the mixture sums them, it does not cascade them.

use glam::Vec4;
use wgpu::util::DeviceExt;

use linsss_core::pyramid::{mip_extent, mip_level_count, workgroup_count};

/// GPU representation of the filter uniforms, one buffer per dispatch.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FilterUniforms {
    pub sigma: [f32; 4],
    pub direction: [i32; 2],
    pub level: u32,
    pub radius: i32,
}

/// Maximum half-width of the GPU filter window, in texels.
const MAX_GPU_RADIUS: i32 = 19;

/// Half-width of the blur window for one lobe.
pub fn filter_radius(sigma: Vec4, sigma_scale: f32, ksize: u32) -> i32 {
    let max_sigma = sigma.x.max(sigma.y).max(sigma.z) * sigma_scale;
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let by_sigma = (3.0 * max_sigma).ceil() as i32;
    #[allow(clippy::cast_possible_wrap)]
    let by_ksize = (ksize / 2) as i32;
    by_sigma.min(by_ksize).min(MAX_GPU_RADIUS).max(1)
}

struct LevelResources {
    h_uniforms: wgpu::Buffer,
    v_uniforms: wgpu::Buffer,
    h_bind_group: Option<wgpu::BindGroup>,
    v_bind_group: Option<wgpu::BindGroup>,
}

/// Filter stage resources.
pub struct GaussFilter {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    scratch: wgpu::Texture,
    scratch_full_view: wgpu::TextureView,
    scratch_level_views: Vec<wgpu::TextureView>,
    pyramid: wgpu::Texture,
    pyramid_view: wgpu::TextureView,
    pyramid_level_views: Vec<wgpu::TextureView>,
    levels: Vec<LevelResources>,
    /// Levels actually filtered this frame: min(lobes, mip count).
    active_levels: u32,
    width: u32,
    height: u32,
}

impl GaussFilter {
    #[must_use]
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Gauss Filter Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/gauss_filter.wgsl").into()),
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Gauss Filter Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::StorageTexture {
                            access: wgpu::StorageTextureAccess::WriteOnly,
                            format: wgpu::TextureFormat::Rgba16Float,
                            view_dimension: wgpu::TextureViewDimension::D2,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Gauss Filter Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Gauss Filter Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("cs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        let mut filter = Self {
            pipeline,
            bind_group_layout,
            scratch: Self::make_texture(device, width, height, "Gauss Filter Scratch"),
            scratch_full_view: Self::placeholder_view(device),
            scratch_level_views: Vec::new(),
            pyramid: Self::make_texture(device, width, height, "Filtered Pyramid"),
            pyramid_view: Self::placeholder_view(device),
            pyramid_level_views: Vec::new(),
            levels: Vec::new(),
            active_levels: 0,
            width,
            height,
        };
        filter.rebuild_views(device);
        filter
    }

    fn placeholder_view(device: &wgpu::Device) -> wgpu::TextureView {
        Self::make_texture(device, 1, 1, "Gauss Filter Placeholder")
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn make_texture(device: &wgpu::Device, width: u32, height: u32, label: &str) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: mip_level_count(width, height),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba16Float,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        })
    }

    fn rebuild_views(&mut self, device: &wgpu::Device) {
        let levels = mip_level_count(self.width, self.height);
        let storage_views = |texture: &wgpu::Texture| -> Vec<wgpu::TextureView> {
            (0..levels)
                .map(|level| {
                    texture.create_view(&wgpu::TextureViewDescriptor {
                        label: Some("Filter Storage View"),
                        base_mip_level: level,
                        mip_level_count: Some(1),
                        ..Default::default()
                    })
                })
                .collect()
        };
        self.scratch_level_views = storage_views(&self.scratch);
        self.pyramid_level_views = storage_views(&self.pyramid);
        self.scratch_full_view = self
            .scratch
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.pyramid_view = self
            .pyramid
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.levels = (0..levels)
            .map(|_| LevelResources {
                h_uniforms: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Gauss Filter H Uniforms"),
                    contents: bytemuck::cast_slice(&[FilterUniforms {
                        sigma: [1.0; 4],
                        direction: [1, 0],
                        level: 0,
                        radius: 1,
                    }]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                }),
                v_uniforms: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Gauss Filter V Uniforms"),
                    contents: bytemuck::cast_slice(&[FilterUniforms {
                        sigma: [1.0; 4],
                        direction: [1, 0],
                        level: 0,
                        radius: 1,
                    }]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                }),
                h_bind_group: None,
                v_bind_group: None,
            })
            .collect();
        self.active_levels = 0;
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.scratch = Self::make_texture(device, width, height, "Gauss Filter Scratch");
        self.pyramid = Self::make_texture(device, width, height, "Filtered Pyramid");
        self.rebuild_views(device);
    }

    /// Rebuilds per-level bind groups against the current irradiance chain
    /// and G-buffer position target.
    pub fn create_bind_groups(
        &mut self,
        device: &wgpu::Device,
        irradiance: &wgpu::TextureView,
        position: &wgpu::TextureView,
    ) {
        for (level, res) in self.levels.iter_mut().enumerate() {
            let make = |src: &wgpu::TextureView,
                        dst: &wgpu::TextureView,
                        uniforms: &wgpu::Buffer| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Gauss Filter Bind Group"),
                    layout: &self.bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(src),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(position),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(dst),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: uniforms.as_entire_binding(),
                        },
                    ],
                })
            };
            res.h_bind_group = Some(make(
                irradiance,
                &self.scratch_level_views[level],
                &res.h_uniforms,
            ));
            res.v_bind_group = Some(make(
                &self.scratch_full_view,
                &self.pyramid_level_views[level],
                &res.v_uniforms,
            ));
        }
    }

    /// Writes per-level sigmas; levels beyond the lobe count stay inactive.
    pub fn update_uniforms(
        &mut self,
        queue: &wgpu::Queue,
        sigmas: &[Vec4],
        sigma_scale: f32,
        ksize: u32,
    ) {
        let mip_levels = mip_level_count(self.width, self.height);
        let lobe_count = u32::try_from(sigmas.len()).unwrap_or(u32::MAX);
        let active = lobe_count.min(mip_levels);
        if lobe_count > mip_levels {
            log::warn!(
                "profile has {} lobes but the pyramid only has {} levels",
                sigmas.len(),
                mip_levels
            );
        }
        self.active_levels = active;

        for (level, sigma) in sigmas.iter().enumerate().take(active as usize).skip(1) {
            let scaled = *sigma * sigma_scale;
            let radius = filter_radius(*sigma, sigma_scale, ksize);
            #[allow(clippy::cast_possible_truncation)]
            let level_u = level as u32;
            let base = FilterUniforms {
                sigma: scaled.to_array(),
                direction: [1, 0],
                level: level_u,
                radius,
            };
            queue.write_buffer(
                &self.levels[level].h_uniforms,
                0,
                bytemuck::cast_slice(&[base]),
            );
            queue.write_buffer(
                &self.levels[level].v_uniforms,
                0,
                bytemuck::cast_slice(&[FilterUniforms {
                    direction: [0, 1],
                    ..base
                }]),
            );
        }
    }

    /// Records the level-0 copy and the per-level H/V dispatches.
    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, irradiance: &wgpu::Texture) {
        if self.active_levels == 0 {
            return;
        }
        encoder.copy_texture_to_texture(
            irradiance.as_image_copy(),
            self.pyramid.as_image_copy(),
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );

        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Gauss Filter Pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&self.pipeline);
        for level in 1..self.active_levels as usize {
            let (w, h) = mip_extent(self.width, self.height, level as u32);
            let (gx, gy) = workgroup_count(w, h);
            let res = &self.levels[level];
            if let (Some(h_bg), Some(v_bg)) = (&res.h_bind_group, &res.v_bind_group) {
                compute_pass.set_bind_group(0, h_bg, &[]);
                compute_pass.dispatch_workgroups(gx, gy, 1);
                compute_pass.set_bind_group(0, v_bg, &[]);
                compute_pass.dispatch_workgroups(gx, gy, 1);
            }
        }
    }

    /// Sampled view over the whole filtered pyramid.
    pub fn pyramid_view(&self) -> &wgpu::TextureView {
        &self.pyramid_view
    }

    pub fn active_levels(&self) -> u32 {
        self.active_levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_radius_scales_with_sigma() {
        let sigma = Vec4::new(1.0, 2.0, 0.5, 1.0);
        assert_eq!(filter_radius(sigma, 1.0, 64), 6);
        assert_eq!(filter_radius(sigma, 2.0, 64), 12);
    }

    #[test]
    fn test_filter_radius_caps() {
        let sigma = Vec4::splat(100.0);
        // Bounded by the profile footprint first, then the hard cap.
        assert_eq!(filter_radius(sigma, 1.0, 16), 8);
        assert_eq!(filter_radius(sigma, 1.0, 1024), MAX_GPU_RADIUS);
    }

    #[test]
    fn test_filter_radius_at_least_one() {
        assert_eq!(filter_radius(Vec4::splat(0.01), 1.0, 64), 1);
    }
}
