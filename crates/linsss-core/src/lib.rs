//! Core abstractions for linsss-rs.
//!
//! This crate holds everything about the LinSSS screen-space subsurface
//! scattering technique that does not touch the GPU:
//! - [`BssrdfProfile`]: the Gaussian-mixture BSSRDF decomposition and its
//!   binary on-disk format
//! - CPU Gaussian pre-filtering used to bake the blurred weight maps
//! - Mip-pyramid extents and compute dispatch math
//! - Ping-pong bookkeeping for the temporally accumulated translucent
//!   shadow map
//! - The declarative render-pass schedule and its validation
//! - [`RenderParameters`]: the user-tweakable state shared with the UI

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod bssrdf;
pub mod envmap;
pub mod error;
pub mod gauss;
pub mod params;
pub mod pingpong;
pub mod pyramid;
pub mod schedule;

pub use bssrdf::{BssrdfProfile, MAX_GAUSS_LOBES};
pub use envmap::ShCoefficients;
pub use error::{CoreError, Result};
pub use params::{LightKind, MaterialKind, MeshKind, RenderParameters};
pub use pingpong::TsmState;
pub use pyramid::{mip_extent, mip_level_count, workgroup_count};
pub use schedule::{PassDesc, Schedule};

// Re-export glam types for convenience
pub use glam::{Mat4, Vec2, Vec3, Vec4};
