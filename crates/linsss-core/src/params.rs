//! User-facing render parameters.
//!
//! A plain value object handed to the engine every frame; the UI mutates a
//! copy and the engine diffs it against the previous frame to decide what to
//! reload and whether the accumulated translucent shadow map must restart.

use serde::{Deserialize, Serialize};

/// Light source driving the direct pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightKind {
    /// Fixed point light with a rasterized light-view pass.
    Point,
    /// Uffizi gallery environment (SH irradiance + background map).
    Uffizi,
    /// Grace cathedral environment.
    Grace,
}

/// Which baked BSSRDF profile to render with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialKind {
    HeartSoap,
    Marble,
}

/// Which demo mesh to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshKind {
    Fertility,
    Armadillo,
}

impl MaterialKind {
    /// Stem of the profile / specular texture asset pair.
    pub fn asset_stem(self) -> &'static str {
        match self {
            Self::HeartSoap => "HeartSoap",
            Self::Marble => "Marble",
        }
    }
}

impl LightKind {
    /// Stem of the environment asset pair (`.hdr` + `.sph`), if any.
    pub fn envmap_stem(self) -> Option<&'static str> {
        match self {
            Self::Point => None,
            Self::Uffizi => Some("uffizi"),
            Self::Grace => Some("grace"),
        }
    }
}

impl MeshKind {
    pub fn asset_name(self) -> &'static str {
        match self {
            Self::Fertility => "fertility.ply",
            Self::Armadillo => "armadillo.ply",
        }
    }
}

/// Everything the settings panel can change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderParameters {
    pub light: LightKind,
    pub material: MaterialKind,
    pub mesh: MeshKind,
    /// Scale on the accumulated subsurface irradiance (0..=10).
    pub irr_scale: f32,
    /// BSSRDF weight-map UV scale (0.5..=2).
    pub tex_scale: f32,
    /// BSSRDF weight-map UV offset (-1..=1 each).
    pub tex_offset_x: f32,
    pub tex_offset_y: f32,
    /// Multiplier on the per-lobe filter sigmas (0..=16).
    pub sigma_scale: f32,
    /// Enables the temporally accumulated translucent shadow map.
    pub enable_tsm: bool,
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            light: LightKind::Uffizi,
            material: MaterialKind::HeartSoap,
            mesh: MeshKind::Fertility,
            irr_scale: 1.0,
            tex_scale: 1.0,
            tex_offset_x: 0.0,
            tex_offset_y: 0.0,
            sigma_scale: 4.0,
            enable_tsm: false,
        }
    }
}

impl RenderParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_light(mut self, light: LightKind) -> Self {
        self.light = light;
        self
    }

    pub fn with_material(mut self, material: MaterialKind) -> Self {
        self.material = material;
        self
    }

    pub fn with_sigma_scale(mut self, sigma_scale: f32) -> Self {
        self.sigma_scale = sigma_scale;
        self
    }

    pub fn with_tsm(mut self, enable: bool) -> Self {
        self.enable_tsm = enable;
        self
    }

    /// True when switching from `prev` invalidates the accumulated view.
    ///
    /// Any visible change restarts the translucent-shadow-map average; the
    /// estimator only converges while the image it feeds is static.
    pub fn invalidates_view(&self, prev: &Self) -> bool {
        self != prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_initial_scene() {
        let p = RenderParameters::default();
        assert_eq!(p.light, LightKind::Uffizi);
        assert_eq!(p.material, MaterialKind::HeartSoap);
        assert_eq!(p.irr_scale, 1.0);
        assert_eq!(p.tex_scale, 1.0);
        assert_eq!(p.sigma_scale, 4.0);
        assert!(!p.enable_tsm);
    }

    #[test]
    fn test_builder() {
        let p = RenderParameters::new()
            .with_light(LightKind::Point)
            .with_sigma_scale(8.0)
            .with_tsm(true);
        assert_eq!(p.light, LightKind::Point);
        assert_eq!(p.sigma_scale, 8.0);
        assert!(p.enable_tsm);
    }

    #[test]
    fn test_view_invalidation() {
        let a = RenderParameters::default();
        let mut b = a;
        assert!(!b.invalidates_view(&a));
        b.irr_scale = 2.0;
        assert!(b.invalidates_view(&a));
    }

    #[test]
    fn test_serde_roundtrip() {
        let p = RenderParameters::new().with_material(MaterialKind::Marble);
        let json = serde_json::to_string(&p).unwrap();
        let back: RenderParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
