//! BSSRDF profile data model and binary codec.
//!
//! A profile stores the linear decomposition of a heterogeneous BSSRDF into a
//! mixture of isotropic Gaussians: one spatially varying RGB weight map per
//! lobe plus one RGB inverse variance per lobe. On disk the layout is
//! little-endian:
//!
//! ```text
//! [width: u32][height: u32][n_gauss: u32][ksize: u32]
//! width * height records of n_gauss * 3 f64 weights (row-major)
//! one trailing record of n_gauss * 3 f64 inverse variances
//! ```
//!
//! Decoding clamps weights to be non-negative, flips rows vertically so the
//! maps match the mesh UV orientation, and expands RGB to RGBA (alpha 1) for
//! direct 3D-texture upload. Standard deviations derive from the inverse
//! variances as `sigma = sqrt(1 / max(beta, 1e-4))`.

use std::path::Path;

use glam::Vec4;

use crate::error::{CoreError, Result};
use crate::gauss::gauss_blur;

/// Upper bound on Gaussian lobes in a profile.
///
/// Matches the fixed uniform-array size the accumulation shader declares;
/// profiles beyond it are rejected at load time rather than truncated.
pub const MAX_GAUSS_LOBES: u32 = 8;

/// Floor applied to inverse variances before deriving sigma.
const BETA_FLOOR: f64 = 1.0e-4;

const HEADER_BYTES: usize = 4 * 4;

/// A decoded Gaussian-mixture BSSRDF profile.
#[derive(Debug, Clone)]
pub struct BssrdfProfile {
    width: u32,
    height: u32,
    ksize: u32,
    /// Lobe-major RGBA weight planes: `n_gauss * height * width * 4` floats.
    weights: Vec<f32>,
    /// Per-lobe RGB standard deviation, w component fixed to 1.
    sigmas: Vec<Vec4>,
}

impl BssrdfProfile {
    /// Reads and decodes a profile file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let profile = Self::decode(&bytes)?;
        log::info!(
            "loaded BSSRDF profile {}: {}x{}, {} lobes, ksize {}",
            path.as_ref().display(),
            profile.width,
            profile.height,
            profile.n_gauss(),
            profile.ksize
        );
        Ok(profile)
    }

    /// Decodes a profile from its binary representation.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_BYTES {
            return Err(CoreError::ProfileTruncated {
                expected: HEADER_BYTES,
                actual: bytes.len(),
            });
        }
        let width = read_u32(bytes, 0);
        let height = read_u32(bytes, 4);
        let n_gauss = read_u32(bytes, 8);
        let ksize = read_u32(bytes, 12);

        if width == 0 || height == 0 {
            return Err(CoreError::InvalidHeader(format!(
                "zero extent {width}x{height}"
            )));
        }
        if n_gauss == 0 {
            return Err(CoreError::InvalidHeader("zero lobe count".into()));
        }
        if n_gauss > MAX_GAUSS_LOBES {
            return Err(CoreError::TooManyLobes {
                n_gauss,
                max: MAX_GAUSS_LOBES,
            });
        }

        let (w, h, n) = (width as usize, height as usize, n_gauss as usize);
        let payload_doubles = w * h * n * 3 + n * 3;
        let expected = HEADER_BYTES + payload_doubles * 8;
        if bytes.len() < expected {
            return Err(CoreError::ProfileTruncated {
                expected,
                actual: bytes.len(),
            });
        }

        // Weight records are stored pixel-major; the texture wants lobe-major
        // planes with rows flipped to match UV orientation.
        let mut weights = vec![0.0f32; n * h * w * 4];
        let mut off = HEADER_BYTES;
        for y in 0..h {
            for x in 0..w {
                for lobe in 0..n {
                    let dst = ((lobe * h + (h - 1 - y)) * w + x) * 4;
                    for ch in 0..3 {
                        #[allow(clippy::cast_possible_truncation)]
                        let v = read_f64(bytes, off) as f32;
                        weights[dst + ch] = v.max(0.0);
                        off += 8;
                    }
                    weights[dst + 3] = 1.0;
                }
            }
        }

        let mut sigmas = Vec::with_capacity(n);
        for _ in 0..n {
            let mut s = Vec4::ONE;
            for ch in 0..3 {
                let beta = read_f64(bytes, off).max(BETA_FLOOR);
                off += 8;
                #[allow(clippy::cast_possible_truncation)]
                {
                    s[ch] = (1.0 / beta).sqrt() as f32;
                }
            }
            sigmas.push(s);
        }

        Ok(Self {
            width,
            height,
            ksize,
            weights,
            sigmas,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Maximum filter footprint baked into the profile, in pixels.
    pub fn ksize(&self) -> u32 {
        self.ksize
    }

    /// Number of Gaussian lobes in the mixture.
    pub fn n_gauss(&self) -> usize {
        self.sigmas.len()
    }

    /// Lobe-major RGBA weight planes, ready for 3D-texture upload.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Per-lobe RGB standard deviations (w fixed to 1).
    pub fn sigmas(&self) -> &[Vec4] {
        &self.sigmas
    }

    /// Returns the weight planes with each lobe blurred by its own sigma.
    ///
    /// This is the `G ∗ W` term of the decomposition; the accumulation shader
    /// samples it next to the raw weights.
    pub fn blurred_weights(&self) -> Vec<f32> {
        let (w, h) = (self.width as usize, self.height as usize);
        let plane = w * h * 4;
        let mut blurred = self.weights.clone();
        for (lobe, sigma) in self.sigmas.iter().enumerate() {
            gauss_blur(&mut blurred[lobe * plane..(lobe + 1) * plane], *sigma, w, h, 4);
        }
        blurred
    }
}

/// Encodes a profile payload into the binary on-disk format.
///
/// `weights` is pixel-major (`width * height * n_gauss * 3` doubles, no flip,
/// no clamp) and `betas` holds `n_gauss * 3` inverse variances; the lobe count
/// is derived from `betas`.
pub fn encode_profile(
    width: u32,
    height: u32,
    ksize: u32,
    weights: &[f64],
    betas: &[f64],
) -> Result<Vec<u8>> {
    if betas.is_empty() || betas.len() % 3 != 0 {
        return Err(CoreError::InvalidHeader(format!(
            "beta record of {} values is not a multiple of 3",
            betas.len()
        )));
    }
    let n = betas.len() / 3;
    #[allow(clippy::cast_possible_truncation)]
    let n_gauss = n as u32;
    if n_gauss > MAX_GAUSS_LOBES {
        return Err(CoreError::TooManyLobes {
            n_gauss,
            max: MAX_GAUSS_LOBES,
        });
    }
    let expected = width as usize * height as usize * n * 3;
    if weights.len() != expected {
        return Err(CoreError::InvalidHeader(format!(
            "weight payload of {} doubles, expected {expected}",
            weights.len()
        )));
    }

    let mut out = Vec::with_capacity(HEADER_BYTES + (weights.len() + betas.len()) * 8);
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&n_gauss.to_le_bytes());
    out.extend_from_slice(&ksize.to_le_bytes());
    for v in weights.iter().chain(betas) {
        out.extend_from_slice(&v.to_le_bytes());
    }
    Ok(out)
}

fn read_u32(bytes: &[u8], off: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[off..off + 4]);
    u32::from_le_bytes(buf)
}

fn read_f64(bytes: &[u8], off: usize) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[off..off + 8]);
    f64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_profile_bytes() -> Vec<u8> {
        // 2x2, 2 lobes: weight = pixel index, beta = (1, 0.25, 0.0625) per lobe
        let (w, h, n) = (2usize, 2usize, 2usize);
        let mut weights = Vec::new();
        for pix in 0..w * h {
            for lobe in 0..n {
                for ch in 0..3 {
                    weights.push((pix * 10 + lobe * 3 + ch) as f64 * 0.01);
                }
            }
        }
        let betas = vec![1.0, 0.25, 0.0625, 1.0, 0.25, 0.0625];
        encode_profile(2, 2, 31, &weights, &betas).unwrap()
    }

    #[test]
    fn test_decode_header() {
        let profile = BssrdfProfile::decode(&tiny_profile_bytes()).unwrap();
        assert_eq!(profile.width(), 2);
        assert_eq!(profile.height(), 2);
        assert_eq!(profile.n_gauss(), 2);
        assert_eq!(profile.ksize(), 31);
        assert_eq!(profile.weights().len(), 2 * 2 * 2 * 4);
    }

    #[test]
    fn test_sigma_from_inverse_variance() {
        let profile = BssrdfProfile::decode(&tiny_profile_bytes()).unwrap();
        let s = profile.sigmas()[0];
        assert!((s.x - 1.0).abs() < 1e-6);
        assert!((s.y - 2.0).abs() < 1e-6);
        assert!((s.z - 4.0).abs() < 1e-6);
        assert!((s.w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sigma_floor_for_zero_beta() {
        let weights = vec![0.5; 3];
        let bytes = encode_profile(1, 1, 3, &weights, &[0.0, 1.0, 0.5]).unwrap();
        let profile = BssrdfProfile::decode(&bytes).unwrap();
        let s = profile.sigmas()[0];
        assert!((s.x - 100.0).abs() < 1e-3);
        assert!((s.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_weights_clamped() {
        let weights = vec![-1.0; 3];
        let bytes = encode_profile(1, 1, 3, &weights, &[1.0, 1.0, 1.0]).unwrap();
        let profile = BssrdfProfile::decode(&bytes).unwrap();
        assert_eq!(&profile.weights()[..4], &[0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_row_flip() {
        // 1x2 image, 1 lobe: file rows (y=0 then y=1) land flipped.
        let weights = vec![
            0.1, 0.1, 0.1, // y = 0
            0.9, 0.9, 0.9, // y = 1
        ];
        let bytes = encode_profile(1, 2, 3, &weights, &[1.0, 1.0, 1.0]).unwrap();
        let profile = BssrdfProfile::decode(&bytes).unwrap();
        let w = profile.weights();
        assert!((w[0] - 0.9).abs() < 1e-6, "first texel row is file's last");
        assert!((w[4] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_reject_too_many_lobes() {
        let n = (MAX_GAUSS_LOBES + 1) as usize;
        let weights = vec![0.0; n * 3];
        let err = encode_profile(1, 1, 3, &weights, &vec![1.0; n * 3]).unwrap_err();
        assert!(matches!(err, CoreError::TooManyLobes { .. }));

        // Same rejection on the decode side, with a hand-built header.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&(MAX_GAUSS_LOBES + 1).to_le_bytes());
        bytes.extend_from_slice(&3u32.to_le_bytes());
        let err = BssrdfProfile::decode(&bytes).unwrap_err();
        assert!(matches!(err, CoreError::TooManyLobes { .. }));
    }

    #[test]
    fn test_reject_truncated_payload() {
        let mut bytes = tiny_profile_bytes();
        bytes.truncate(bytes.len() - 8);
        let err = BssrdfProfile::decode(&bytes).unwrap_err();
        assert!(matches!(err, CoreError::ProfileTruncated { .. }));
    }

    #[test]
    fn test_blurred_weights_preserve_constant_plane() {
        let weights = vec![0.5; 4 * 4 * 3];
        let bytes = encode_profile(4, 4, 3, &weights, &[1.0, 1.0, 1.0]).unwrap();
        let profile = BssrdfProfile::decode(&bytes).unwrap();
        for v in profile.blurred_weights().chunks(4) {
            assert!((v[0] - 0.5).abs() < 1e-3);
            assert!((v[3] - 1.0).abs() < 1e-3);
        }
    }
}
