//! GPU upload of BSSRDF weight maps.
//!
//! A profile becomes two 3D textures with one layer per Gaussian lobe: the raw
//! weight maps `W` and the pre-blurred `G ∗ W`. Both are stored as rgba16float
//! so the accumulation shader can sample them with a linear sampler under the
//! UV scale/offset controls.

use half::f16;

use linsss_core::BssrdfProfile;

/// Device resources for one loaded profile.
pub struct ProfileTextures {
    weights: wgpu::Texture,
    weights_view: wgpu::TextureView,
    blurred: wgpu::Texture,
    blurred_view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    n_gauss: u32,
    ksize: u32,
    sigmas: Vec<glam::Vec4>,
}

impl ProfileTextures {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, profile: &BssrdfProfile) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let n_gauss = profile.n_gauss() as u32;
        let (weights, weights_view) = upload_volume(
            device,
            queue,
            "BSSRDF Weights",
            profile.width(),
            profile.height(),
            n_gauss,
            profile.weights(),
        );
        let blurred_data = profile.blurred_weights();
        let (blurred, blurred_view) = upload_volume(
            device,
            queue,
            "BSSRDF Blurred Weights",
            profile.width(),
            profile.height(),
            n_gauss,
            &blurred_data,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("BSSRDF Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            weights,
            weights_view,
            blurred,
            blurred_view,
            sampler,
            n_gauss,
            ksize: profile.ksize(),
            sigmas: profile.sigmas().to_vec(),
        }
    }

    pub fn weights_view(&self) -> &wgpu::TextureView {
        &self.weights_view
    }

    pub fn blurred_view(&self) -> &wgpu::TextureView {
        &self.blurred_view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn n_gauss(&self) -> u32 {
        self.n_gauss
    }

    pub fn ksize(&self) -> u32 {
        self.ksize
    }

    pub fn sigmas(&self) -> &[glam::Vec4] {
        &self.sigmas
    }

    /// Frees the volumes early when the profile is swapped.
    pub fn destroy(&self) {
        self.weights.destroy();
        self.blurred.destroy();
    }
}

fn upload_volume(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    depth: u32,
    data: &[f32],
) -> (wgpu::Texture, wgpu::TextureView) {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: depth,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D3,
        format: wgpu::TextureFormat::Rgba16Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let halves: Vec<u16> = data.iter().map(|&v| f16::from_f32(v).to_bits()).collect();
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytemuck::cast_slice(&halves),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 8),
            rows_per_image: Some(height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
