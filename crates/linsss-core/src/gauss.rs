//! CPU separable Gaussian blur.
//!
//! Used offline to bake the pre-blurred weight maps `G ∗ W` that the
//! accumulation shader samples alongside the raw weights. Each channel is
//! blurred with its own sigma so the RGB lobes of one Gaussian term keep
//! their per-wavelength spread.

use glam::Vec4;

/// Radius cap for the blur window, in pixels.
const MAX_RADIUS: i32 = 19;

/// Normalized 1D Gaussian evaluated at distance `x`.
#[inline]
pub fn gauss(x: f32, sigma: f32) -> f32 {
    let sqrt_inv_two_pi = (1.0 / (2.0 * std::f32::consts::PI)).sqrt();
    (sqrt_inv_two_pi / sigma) * (-0.5 * x * x / (sigma * sigma)).exp()
}

/// Blurs an interleaved `width x height x channels` f32 image in place.
///
/// Separable horizontal-then-vertical passes with a shared radius of
/// `min(19, ceil(3 * max_sigma))`, clamp-to-edge sampling, and per-pixel
/// weight-sum renormalization so edge pixels keep their magnitude.
/// `channels` must be at most 4; channel `ch` uses `sigma[ch]`.
pub fn gauss_blur(data: &mut [f32], sigma: Vec4, width: usize, height: usize, channels: usize) {
    debug_assert!(channels <= 4);
    debug_assert_eq!(data.len(), width * height * channels);
    if width == 0 || height == 0 {
        return;
    }

    let max_sigma = sigma.x.max(sigma.y).max(sigma.z);
    #[allow(clippy::cast_possible_truncation)]
    let r = MAX_RADIUS.min((3.0 * max_sigma).ceil() as i32);

    // Horizontal pass, one scanline at a time.
    let mut row = vec![0.0f32; width * channels];
    for y in 0..height {
        row.fill(0.0);
        for x in 0..width {
            let mut sum_wgt = [0.0f32; 4];
            for dx in -r..=r {
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let nx = (x as i32 + dx).clamp(0, width as i32 - 1) as usize;
                for ch in 0..channels {
                    #[allow(clippy::cast_precision_loss)]
                    let w = gauss(dx as f32, sigma[ch]);
                    row[x * channels + ch] += w * data[(y * width + nx) * channels + ch];
                    sum_wgt[ch] += w;
                }
            }
            for ch in 0..channels {
                row[x * channels + ch] /= sum_wgt[ch] + 1.0e-6;
            }
        }
        data[y * width * channels..(y + 1) * width * channels].copy_from_slice(&row);
    }

    // Vertical pass, one column at a time.
    let mut col = vec![0.0f32; height * channels];
    for x in 0..width {
        col.fill(0.0);
        for y in 0..height {
            let mut sum_wgt = [0.0f32; 4];
            for dy in -r..=r {
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let ny = (y as i32 + dy).clamp(0, height as i32 - 1) as usize;
                for ch in 0..channels {
                    #[allow(clippy::cast_precision_loss)]
                    let w = gauss(dy as f32, sigma[ch]);
                    col[y * channels + ch] += w * data[(ny * width + x) * channels + ch];
                    sum_wgt[ch] += w;
                }
            }
            for ch in 0..channels {
                col[y * channels + ch] /= sum_wgt[ch] + 1.0e-6;
            }
        }
        for y in 0..height {
            for ch in 0..channels {
                data[(y * width + x) * channels + ch] = col[y * channels + ch];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauss_peak_at_zero() {
        let sigma = 2.0;
        assert!(gauss(0.0, sigma) > gauss(1.0, sigma));
        assert!(gauss(1.0, sigma) > gauss(2.0, sigma));
        // Symmetric around zero.
        assert!((gauss(1.5, sigma) - gauss(-1.5, sigma)).abs() < 1e-7);
    }

    #[test]
    fn test_blur_preserves_constant_signal() {
        let (w, h) = (16, 12);
        let mut img = vec![0.75f32; w * h * 4];
        gauss_blur(&mut img, Vec4::new(2.0, 3.0, 1.5, 1.0), w, h, 4);
        for v in &img {
            assert!((v - 0.75).abs() < 1e-3, "constant not preserved: {v}");
        }
    }

    #[test]
    fn test_blur_spreads_impulse() {
        let (w, h) = (9, 9);
        let mut img = vec![0.0f32; w * h];
        img[4 * w + 4] = 1.0;
        gauss_blur(&mut img, Vec4::splat(1.0), w, h, 1);
        let center = img[4 * w + 4];
        let neighbor = img[4 * w + 5];
        assert!(center < 1.0);
        assert!(neighbor > 0.0);
        assert!(center > neighbor);
    }

    #[test]
    fn test_blur_radius_caps_at_19() {
        // A huge sigma must not panic on a small image; the radius clamps.
        let (w, h) = (4, 4);
        let mut img = vec![1.0f32; w * h * 3];
        gauss_blur(&mut img, Vec4::splat(100.0), w, h, 3);
        for v in &img {
            assert!((v - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_blur_empty_image() {
        let mut img: Vec<f32> = Vec::new();
        gauss_blur(&mut img, Vec4::splat(1.0), 0, 0, 4);
        assert!(img.is_empty());
    }
}
