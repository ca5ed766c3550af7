// src/rendering_lib/vertex.rs

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::engine_lib::geometry::MeshData;
use crate::engine_lib::scene_types::PointSprite;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    pub fn from_mesh(mesh: &MeshData) -> Vec<MeshVertex> {
        Self::interleave(&mesh.positions, &mesh.normals)
    }

    /// Pairs live positions with the mesh's rest normals.
    pub fn interleave(positions: &[Vec3], normals: &[Vec3]) -> Vec<MeshVertex> {
        positions
            .iter()
            .zip(normals.iter().chain(std::iter::repeat(&Vec3::Y)))
            .map(|(p, n)| MeshVertex { position: p.to_array(), normal: n.to_array() })
            .collect()
    }
}

/// One billboard per point, instanced over a six-vertex quad.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PointInstance {
    pub position: [f32; 3],
    pub size: f32,
    pub color: [f32; 4],
    pub phase: f32,
    pub _padding: [f32; 3],
}

impl PointInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32, 2 => Float32x4, 3 => Float32];

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

impl From<&PointSprite> for PointInstance {
    fn from(p: &PointSprite) -> Self {
        Self {
            position: p.position.to_array(),
            size: p.size,
            color: p.color.to_array(),
            phase: p.phase,
            _padding: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::geometry;

    #[test]
    fn layouts_match_struct_sizes() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 24);
        assert_eq!(std::mem::size_of::<PointInstance>(), 48);
        assert_eq!(MeshVertex::desc().array_stride, 24);
    }

    #[test]
    fn interleave_keeps_vertex_order() {
        let plane = geometry::plane(2.0, 2.0);
        let vertices = MeshVertex::from_mesh(&plane);
        assert_eq!(vertices.len(), 4);
        assert_eq!(vertices[2].position, [1.0, 1.0, 0.0]);
        assert_eq!(vertices[2].normal, [0.0, 0.0, 1.0]);
    }
}
