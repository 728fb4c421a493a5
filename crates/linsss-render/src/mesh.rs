//! Mesh loading and primitive geometry.

use std::collections::HashMap;
use std::path::Path;

use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};
use wgpu::util::DeviceExt;

use crate::error::{RenderError, RenderResult};

/// Vertex layout shared by every geometry pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2, 2 => Float32x3],
    };
}

/// CPU-side triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Loads a PLY mesh.
    ///
    /// Expects `x/y/z` positions, takes `nx/ny/nz` normals when present, and
    /// falls back to a planar projection (`uv = pos.xy * 0.5 + 0.5`) when the
    /// file carries no texture coordinates.
    pub fn load_ply<P: AsRef<Path>>(path: P) -> RenderResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let mut reader = std::io::BufReader::new(file);
        let ply = Parser::<DefaultElement>::new().read_ply(&mut reader)?;

        let vertices_in = ply
            .payload
            .get("vertex")
            .ok_or_else(|| RenderError::MeshLoadError("no vertex element".into()))?;

        let mut vertices = Vec::with_capacity(vertices_in.len());
        for elem in vertices_in {
            let position = [
                scalar(elem, "x")?,
                scalar(elem, "y")?,
                scalar(elem, "z")?,
            ];
            let normal = [
                scalar(elem, "nx").unwrap_or(0.0),
                scalar(elem, "ny").unwrap_or(0.0),
                scalar(elem, "nz").unwrap_or(1.0),
            ];
            let uv = match (scalar(elem, "u"), scalar(elem, "v")) {
                (Ok(u), Ok(v)) => [u, v],
                _ => [
                    position[0] * 0.5 + 0.5,
                    position[1] * 0.5 + 0.5,
                ],
            };
            vertices.push(Vertex {
                position,
                uv,
                normal,
            });
        }

        let faces = ply
            .payload
            .get("face")
            .ok_or_else(|| RenderError::MeshLoadError("no face element".into()))?;

        let mut indices = Vec::with_capacity(faces.len() * 3);
        for face in faces {
            let corners = face
                .values()
                .find_map(index_list)
                .ok_or_else(|| RenderError::MeshLoadError("face without index list".into()))?;
            if corners.len() != 3 {
                return Err(RenderError::MeshLoadError(format!(
                    "non-triangular face with {} corners",
                    corners.len()
                )));
            }
            indices.extend_from_slice(&corners);
        }

        let mesh = Self { vertices, indices }.deduplicated();
        log::info!(
            "loaded {}: {} vertices, {} triangles",
            path.as_ref().display(),
            mesh.vertices.len(),
            mesh.indices.len() / 3
        );
        Ok(mesh)
    }

    /// Merges bitwise-identical vertices and remaps the index buffer.
    fn deduplicated(self) -> Self {
        let mut remap = vec![0u32; self.vertices.len()];
        let mut unique: Vec<Vertex> = Vec::with_capacity(self.vertices.len());
        let mut seen: HashMap<[u32; 8], u32> = HashMap::with_capacity(self.vertices.len());
        for (i, v) in self.vertices.iter().enumerate() {
            let key = vertex_key(v);
            #[allow(clippy::cast_possible_truncation)]
            let idx = *seen.entry(key).or_insert_with(|| {
                unique.push(*v);
                (unique.len() - 1) as u32
            });
            remap[i] = idx;
        }
        let indices = self.indices.iter().map(|&i| remap[i as usize]).collect();
        Self {
            vertices: unique,
            indices,
        }
    }

    /// A fullscreen-style quad in the z = 0 plane, two triangles.
    pub fn rect() -> Self {
        let positions = [
            [-1.0f32, -1.0, 0.0],
            [1.0, -1.0, 0.0],
            [1.0, 1.0, 0.0],
            [-1.0, 1.0, 0.0],
        ];
        let uvs = [[0.0f32, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let vertices = positions
            .iter()
            .zip(&uvs)
            .map(|(p, t)| Vertex {
                position: *p,
                uv: *t,
                normal: [0.0, 0.0, 1.0],
            })
            .collect();
        Self {
            vertices,
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    /// A unit cube around the origin, used for the environment background.
    pub fn cube() -> Self {
        let corners = [
            [-1.0f32, -1.0, -1.0],
            [1.0, -1.0, -1.0],
            [1.0, 1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0],
            [1.0, -1.0, 1.0],
            [1.0, 1.0, 1.0],
            [-1.0, 1.0, 1.0],
        ];
        let vertices = corners
            .iter()
            .map(|p| Vertex {
                position: *p,
                uv: [0.0, 0.0],
                normal: [p[0], p[1], p[2]],
            })
            .collect();
        let indices = vec![
            0, 1, 2, 0, 2, 3, // -z
            5, 4, 7, 5, 7, 6, // +z
            4, 0, 3, 4, 3, 7, // -x
            1, 5, 6, 1, 6, 2, // +x
            4, 5, 1, 4, 1, 0, // -y
            3, 2, 6, 3, 6, 7, // +y
        ];
        Self { vertices, indices }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Uploads vertex and index buffers.
    pub fn upload(&self, device: &wgpu::Device, label: &str) -> GpuMesh {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        #[allow(clippy::cast_possible_truncation)]
        GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

fn vertex_key(v: &Vertex) -> [u32; 8] {
    [
        v.position[0].to_bits(),
        v.position[1].to_bits(),
        v.position[2].to_bits(),
        v.uv[0].to_bits(),
        v.uv[1].to_bits(),
        v.normal[0].to_bits(),
        v.normal[1].to_bits(),
        v.normal[2].to_bits(),
    ]
}

fn scalar(elem: &DefaultElement, name: &str) -> RenderResult<f32> {
    match elem.get(name) {
        Some(Property::Float(v)) => Ok(*v),
        #[allow(clippy::cast_possible_truncation)]
        Some(Property::Double(v)) => Ok(*v as f32),
        _ => Err(RenderError::MeshLoadError(format!(
            "missing float property '{name}'"
        ))),
    }
}

#[allow(clippy::cast_sign_loss)]
fn index_list(prop: &Property) -> Option<Vec<u32>> {
    match prop {
        Property::ListInt(v) => Some(v.iter().map(|&i| i as u32).collect()),
        Property::ListUInt(v) => Some(v.clone()),
        Property::ListUShort(v) => Some(v.iter().map(|&i| u32::from(i)).collect()),
        _ => None,
    }
}

/// Geometry resident on the device.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_has_two_triangles() {
        let rect = MeshData::rect();
        assert_eq!(rect.vertices.len(), 4);
        assert_eq!(rect.indices.len(), 6);
    }

    #[test]
    fn test_cube_has_twelve_triangles() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertices.len(), 8);
        assert_eq!(cube.indices.len(), 36);
        assert!(cube.indices.iter().all(|&i| (i as usize) < 8));
    }

    #[test]
    fn test_deduplication_merges_identical_vertices() {
        let v = Vertex {
            position: [1.0, 2.0, 3.0],
            uv: [0.5, 0.5],
            normal: [0.0, 0.0, 1.0],
        };
        let mesh = MeshData {
            vertices: vec![v, v, v],
            indices: vec![0, 1, 2],
        }
        .deduplicated();
        assert_eq!(mesh.vertices.len(), 1);
        assert_eq!(mesh.indices, vec![0, 0, 0]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = MeshData::load_ply("/nonexistent/mesh.ply").unwrap_err();
        assert!(matches!(err, RenderError::IoError(_)));
    }
}
