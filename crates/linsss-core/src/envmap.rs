//! Spherical-harmonics irradiance coefficients.
//!
//! Environment lights ship a 9-band SH projection next to the background map:
//! a text file of nine lines, three floats per line (RGB per coefficient).

use std::path::Path;

use glam::Vec4;

use crate::error::{CoreError, Result};

/// Scale applied to environment irradiance to match the point-light range.
pub const ENVMAP_SCALE: f32 = 2.0;

/// The nine RGB coefficients of a second-order SH projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShCoefficients(pub [Vec4; 9]);

impl ShCoefficients {
    /// Reads a `.sph` coefficient file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let coefs = Self::parse(&text)?;
        log::debug!("loaded SH coefficients from {}", path.as_ref().display());
        Ok(coefs)
    }

    /// Parses nine whitespace-separated RGB triplets, scaled by
    /// [`ENVMAP_SCALE`].
    pub fn parse(text: &str) -> Result<Self> {
        let values: Vec<f32> = text
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f32>()
                    .map_err(|_| CoreError::InvalidShFile(format!("bad float '{tok}'")))
            })
            .collect::<Result<_>>()?;
        if values.len() != 27 {
            return Err(CoreError::InvalidShFile(format!(
                "expected 27 values, got {}",
                values.len()
            )));
        }
        let mut coefs = [Vec4::ZERO; 9];
        for (i, rgb) in values.chunks_exact(3).enumerate() {
            coefs[i] = Vec4::new(rgb[0], rgb[1], rgb[2], 0.0) * ENVMAP_SCALE;
        }
        Ok(Self(coefs))
    }

    /// Uniform-buffer layout: nine std140 vec4 rows.
    pub fn as_array(&self) -> [Vec4; 9] {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
1.0 0.9 0.8
0.1 0.1 0.1
0.2 0.2 0.2
0.0 0.0 0.0
0.0 0.0 0.0
0.0 0.0 0.0
0.0 0.0 0.0
0.0 0.0 0.0
0.05 0.04 0.03
";

    #[test]
    fn test_parse_scales_by_envmap_scale() {
        let sh = ShCoefficients::parse(SAMPLE).unwrap();
        assert_eq!(sh.0[0], Vec4::new(2.0, 1.8, 1.6, 0.0));
        assert_eq!(sh.0[8], Vec4::new(0.1, 0.08, 0.06, 0.0));
    }

    #[test]
    fn test_parse_rejects_wrong_count() {
        let err = ShCoefficients::parse("1 2 3").unwrap_err();
        assert!(matches!(err, CoreError::InvalidShFile(_)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let bad = SAMPLE.replace("0.05", "zero");
        let err = ShCoefficients::parse(&bad).unwrap_err();
        assert!(matches!(err, CoreError::InvalidShFile(_)));
    }
}
