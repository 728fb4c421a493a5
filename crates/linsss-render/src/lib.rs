//! GPU rendering for screen-space subsurface scattering.
//!
//! Each stage of the frame is its own pass struct owning a pipeline, its
//! uniform buffer, and its render targets; [`engine::RenderEngine`] wires
//! them together and drives the per-frame sequence.

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod accumulate;
pub mod camera;
pub mod deferred;
pub mod direct_pass;
pub mod engine;
pub mod environment;
pub mod error;
pub mod gauss_filter;
pub mod light_pass;
pub mod mesh;
pub mod mip_chain;
pub mod postprocess;
pub mod profile_textures;
pub mod tsm;

pub use camera::OrbitCamera;
pub use engine::RenderEngine;
pub use error::{RenderError, RenderResult};
pub use mesh::{GpuMesh, MeshData, Vertex};
