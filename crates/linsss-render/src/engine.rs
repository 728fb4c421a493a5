//! Frame orchestration.
//!
//! Owns the device, every pass, and the loaded scene assets, and encodes the
//! fixed frame sequence: light pass, direct MRT pass, irradiance mip chain,
//! per-lobe Gaussian filtering, linear accumulation, translucent shadow map,
//! deferred composition, postprocess. The declarative schedule is validated
//! once at startup; from then on command order carries the dependencies.

use std::path::PathBuf;

use glam::Mat4;

use linsss_core::schedule::frame_schedule;
use linsss_core::{BssrdfProfile, RenderParameters, ShCoefficients, TsmState};
use linsss_core::params::LightKind;

use crate::accumulate::AccumulatePass;
use crate::camera::OrbitCamera;
use crate::deferred::DeferredPass;
use crate::direct_pass::DirectPass;
use crate::environment::HdrTexture;
use crate::error::RenderResult;
use crate::gauss_filter::GaussFilter;
use crate::light_pass::{light_view_proj, LightPass};
use crate::mesh::{GpuMesh, MeshData, Vertex};
use crate::postprocess::PostprocessPass;
use crate::profile_textures::ProfileTextures;
use crate::tsm::TsmPass;

struct FrameBindGroups {
    direct: wgpu::BindGroup,
    accumulate: wgpu::BindGroup,
    /// One per read half of the TSM pair.
    tsm: [wgpu::BindGroup; 2],
    background: wgpu::BindGroup,
    composite: wgpu::BindGroup,
    postprocess: wgpu::BindGroup,
}

/// The rendering engine.
pub struct RenderEngine {
    device: wgpu::Device,
    queue: wgpu::Queue,
    asset_root: PathBuf,

    light_pass: LightPass,
    direct_pass: DirectPass,
    mip_chain: crate::mip_chain::MipChain,
    gauss_filter: GaussFilter,
    accumulate: AccumulatePass,
    tsm_pass: TsmPass,
    deferred: DeferredPass,
    postprocess: PostprocessPass,

    object: GpuMesh,
    rect: GpuMesh,
    cube: GpuMesh,

    profile: BssrdfProfile,
    profile_textures: ProfileTextures,
    ks_texture: HdrTexture,
    env_texture: HdrTexture,
    sh_coefs: Option<ShCoefficients>,

    bind_groups: FrameBindGroups,
    params: RenderParameters,
    tsm_state: TsmState,
    bssrdf_extent: [f32; 2],

    width: u32,
    height: u32,
}

impl RenderEngine {
    /// Creates the engine and loads the initial scene described by `params`.
    ///
    /// Profile, environment, and SH loads are fatal; a missing mesh degrades
    /// to placeholder geometry.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        asset_root: PathBuf,
        params: RenderParameters,
    ) -> RenderResult<Self> {
        frame_schedule().validate()?;

        let light_pass = LightPass::new(&device);
        let direct_pass = DirectPass::new(&device, width, height);
        let mip_chain = crate::mip_chain::MipChain::new(&device, width, height);
        let gauss_filter = GaussFilter::new(&device, width, height);
        let accumulate = AccumulatePass::new(&device, width, height);
        let tsm_pass = TsmPass::new(&device, width, height);
        let deferred = DeferredPass::new(&device, width, height);
        let postprocess = PostprocessPass::new(&device, surface_format);

        let object = load_object(&device, &asset_root, params);
        let rect = MeshData::rect().upload(&device, "Rect");
        let cube = MeshData::cube().upload(&device, "Cube");

        let profile =
            BssrdfProfile::load(asset_root.join("bssrdf").join(format!(
                "{}.sss",
                params.material.asset_stem()
            )))?;
        let profile_textures = ProfileTextures::new(&device, &queue, &profile);
        #[allow(clippy::cast_precision_loss)]
        let bssrdf_extent = [profile.width() as f32, profile.height() as f32];

        let ks_texture = HdrTexture::load(
            &device,
            &queue,
            asset_root.join("bssrdf").join(format!(
                "{}_Ks.hdr",
                params.material.asset_stem()
            )),
            "Ks Texture",
        )?;

        let (env_texture, sh_coefs) = load_environment(&device, &queue, &asset_root, params)?;

        let mut engine = Self {
            bind_groups: FrameBindGroups {
                // Placeholder; rebuilt below once every view exists.
                direct: direct_pass.create_bind_group(
                    &device,
                    light_pass.depth_view(),
                    ks_texture.view(),
                    ks_texture.sampler(),
                ),
                accumulate: accumulate.create_bind_group(
                    &device,
                    gauss_filter.pyramid_view(),
                    profile_textures.blurred_view(),
                    profile_textures.sampler(),
                    &direct_pass.gbuffer().texcoord_view,
                ),
                tsm: [
                    tsm_pass.create_bind_group(
                        &device,
                        light_pass.irradiance_view(),
                        light_pass.position_view(),
                        0,
                        profile_textures.weights_view(),
                        profile_textures.sampler(),
                    ),
                    tsm_pass.create_bind_group(
                        &device,
                        light_pass.irradiance_view(),
                        light_pass.position_view(),
                        1,
                        profile_textures.weights_view(),
                        profile_textures.sampler(),
                    ),
                ],
                background: deferred.create_background_bind_group(
                    &device,
                    env_texture.view(),
                    env_texture.sampler(),
                ),
                composite: deferred.create_composite_bind_group(
                    &device,
                    &direct_pass.gbuffer().specular_view,
                    accumulate.output_view(),
                    tsm_pass.resolved_view(),
                    &direct_pass.gbuffer().texcoord_view,
                ),
                postprocess: postprocess.create_bind_group(&device, deferred.hdr_view()),
            },
            device,
            queue,
            asset_root,
            light_pass,
            direct_pass,
            mip_chain,
            gauss_filter,
            accumulate,
            tsm_pass,
            deferred,
            postprocess,
            object,
            rect,
            cube,
            profile,
            profile_textures,
            ks_texture,
            env_texture,
            sh_coefs,
            params,
            tsm_state: TsmState::new(),
            bssrdf_extent,
            width,
            height,
        };
        engine.rebuild_bind_groups();
        log::info!("render engine ready at {width}x{height}");
        Ok(engine)
    }

    fn rebuild_bind_groups(&mut self) {
        self.gauss_filter.create_bind_groups(
            &self.device,
            self.mip_chain.view(),
            &self.direct_pass.gbuffer().position_view,
        );
        self.bind_groups = FrameBindGroups {
            direct: self.direct_pass.create_bind_group(
                &self.device,
                self.light_pass.depth_view(),
                self.ks_texture.view(),
                self.ks_texture.sampler(),
            ),
            accumulate: self.accumulate.create_bind_group(
                &self.device,
                self.gauss_filter.pyramid_view(),
                self.profile_textures.blurred_view(),
                self.profile_textures.sampler(),
                &self.direct_pass.gbuffer().texcoord_view,
            ),
            tsm: [
                self.tsm_pass.create_bind_group(
                    &self.device,
                    self.light_pass.irradiance_view(),
                    self.light_pass.position_view(),
                    0,
                    self.profile_textures.weights_view(),
                    self.profile_textures.sampler(),
                ),
                self.tsm_pass.create_bind_group(
                    &self.device,
                    self.light_pass.irradiance_view(),
                    self.light_pass.position_view(),
                    1,
                    self.profile_textures.weights_view(),
                    self.profile_textures.sampler(),
                ),
            ],
            background: self.deferred.create_background_bind_group(
                &self.device,
                self.env_texture.view(),
                self.env_texture.sampler(),
            ),
            composite: self.deferred.create_composite_bind_group(
                &self.device,
                &self.direct_pass.gbuffer().specular_view,
                self.accumulate.output_view(),
                self.tsm_pass.resolved_view(),
                &self.direct_pass.gbuffer().texcoord_view,
            ),
            postprocess: self
                .postprocess
                .create_bind_group(&self.device, self.deferred.hdr_view()),
        };
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
        self.direct_pass.resize(&self.device, width, height);
        self.mip_chain.resize(&self.device, width, height);
        self.gauss_filter.resize(&self.device, width, height);
        self.accumulate.resize(&self.device, width, height);
        self.tsm_pass.resize(&self.device, width, height);
        self.deferred.resize(&self.device, width, height);
        self.rebuild_bind_groups();
        self.tsm_state.reset();
        log::debug!("resized render targets to {width}x{height}");
    }

    /// Applies new parameters, reloading assets whose selector changed.
    pub fn set_params(&mut self, params: RenderParameters) -> RenderResult<bool> {
        let prev = self.params;
        if !params.invalidates_view(&prev) {
            return Ok(false);
        }

        // Load replacements fully before touching the live resources, so a
        // failed switch leaves the engine on the previous scene.
        if params.material != prev.material {
            let stem = params.material.asset_stem();
            let profile = BssrdfProfile::load(
                self.asset_root.join("bssrdf").join(format!("{stem}.sss")),
            )?;
            let ks = HdrTexture::load(
                &self.device,
                &self.queue,
                self.asset_root.join("bssrdf").join(format!("{stem}_Ks.hdr")),
                "Ks Texture",
            )?;
            self.profile_textures.destroy();
            self.profile_textures = ProfileTextures::new(&self.device, &self.queue, &profile);
            #[allow(clippy::cast_precision_loss)]
            {
                self.bssrdf_extent = [profile.width() as f32, profile.height() as f32];
            }
            self.profile = profile;
            self.ks_texture.destroy();
            self.ks_texture = ks;
        }
        if params.light != prev.light {
            let (env, sh) =
                load_environment(&self.device, &self.queue, &self.asset_root, params)?;
            self.env_texture.destroy();
            self.env_texture = env;
            self.sh_coefs = sh;
        }
        if params.mesh != prev.mesh {
            self.object = load_object(&self.device, &self.asset_root, params);
        }

        self.params = params;
        self.rebuild_bind_groups();
        self.tsm_state.reset();
        Ok(true)
    }

    /// Encodes and submits one frame into `surface_view`.
    pub fn render(&mut self, surface_view: &wgpu::TextureView, camera: &mut OrbitCamera) {
        let view_changed = camera.take_changed();
        if view_changed {
            self.tsm_state.reset();
        }

        self.update_uniforms(camera);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        if view_changed {
            self.tsm_pass.clear_all(&mut encoder);
        }

        let draw_light_geometry = self.params.light == LightKind::Point;
        self.light_pass
            .render(&mut encoder, &self.object, draw_light_geometry);
        self.direct_pass
            .render(&mut encoder, &self.bind_groups.direct, &self.object);
        self.mip_chain
            .generate(&mut encoder, &self.direct_pass.gbuffer().diffuse_texture);
        self.gauss_filter
            .render(&mut encoder, self.mip_chain.texture());
        self.accumulate
            .render(&mut encoder, &self.bind_groups.accumulate);

        let write = self.tsm_state.write_index();
        if self.params.enable_tsm {
            let read = self.tsm_state.read_index();
            self.tsm_pass
                .render(&mut encoder, write, &self.bind_groups.tsm[read], &self.object);
        } else {
            self.tsm_pass.clear_write(&mut encoder, write);
        }
        self.tsm_pass.resolve(&mut encoder, write);

        self.deferred.render(
            &mut encoder,
            &self.bind_groups.background,
            &self.bind_groups.composite,
            &self.cube,
        );
        self.postprocess.render(
            &mut encoder,
            surface_view,
            &self.bind_groups.postprocess,
            &self.rect,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        self.tsm_state.advance();
    }

    fn update_uniforms(&mut self, camera: &OrbitCamera) {
        let model = Mat4::IDENTITY;
        let view_proj = camera.view_proj();

        self.light_pass.update_uniforms(&self.queue, model);

        let sh = match self.params.light {
            LightKind::Point => None,
            _ => self.sh_coefs.as_ref(),
        };
        self.direct_pass
            .update_uniforms(&self.queue, view_proj, model, camera.eye(), sh);

        self.gauss_filter.update_uniforms(
            &self.queue,
            self.profile_textures.sigmas(),
            self.params.sigma_scale,
            self.profile_textures.ksize(),
        );
        self.accumulate.update_uniforms(
            &self.queue,
            [self.params.tex_offset_x, self.params.tex_offset_y],
            self.params.tex_scale,
            self.params.irr_scale,
            self.gauss_filter.active_levels(),
        );
        self.tsm_pass.update_uniforms(
            &self.queue,
            view_proj * model,
            light_view_proj() * model,
            self.profile_textures.sigmas(),
            self.bssrdf_extent,
            self.profile_textures.ksize(),
            self.params.sigma_scale,
            self.tsm_state.seed(),
            self.tsm_state.accumulated_frames(),
        );
        self.deferred
            .update_uniforms(&self.queue, camera.proj(), camera.view());
        self.postprocess.update_uniforms(&self.queue, 1.0, 2.2);
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn params(&self) -> RenderParameters {
        self.params
    }
}

fn load_object(device: &wgpu::Device, asset_root: &std::path::Path, params: RenderParameters) -> GpuMesh {
    let path = asset_root.join("meshes").join(params.mesh.asset_name());
    match MeshData::load_ply(&path) {
        Ok(mesh) => mesh.upload(device, "Object"),
        Err(err) => {
            log::error!("failed to load {}: {err}; rendering without geometry", path.display());
            placeholder_mesh().upload(device, "Object")
        }
    }
}

/// A single degenerate triangle; rasterizes nothing but keeps buffers valid.
fn placeholder_mesh() -> MeshData {
    let v = Vertex {
        position: [0.0; 3],
        uv: [0.0; 2],
        normal: [0.0, 0.0, 1.0],
    };
    MeshData {
        vertices: vec![v; 3],
        indices: vec![0, 1, 2],
    }
}

fn load_environment(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    asset_root: &std::path::Path,
    params: RenderParameters,
) -> RenderResult<(HdrTexture, Option<ShCoefficients>)> {
    match params.light.envmap_stem() {
        Some(stem) => {
            let dir = asset_root.join("envmap");
            let env = HdrTexture::load(
                device,
                queue,
                dir.join(format!("{stem}.hdr")),
                "Environment Map",
            )?;
            let sh = ShCoefficients::load(dir.join(format!("{stem}.sph")))?;
            Ok((env, Some(sh)))
        }
        None => Ok((HdrTexture::black(device, queue, "Environment Map"), None)),
    }
}
