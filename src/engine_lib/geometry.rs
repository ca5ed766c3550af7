// src/engine_lib/geometry.rs
//
// Procedural meshes. Spheres take width/height segment counts, round
// shapes take a radial segment count.

use glam::{Mat3, Mat4, Vec3};
use std::f32::consts::{PI, TAU};

#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    /// Vertex positions are rewritten every frame (blob bodies).
    pub dynamic: bool,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Area-weighted smooth normals from the current positions.
    pub fn recompute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let face = (self.positions[b] - self.positions[a]).cross(self.positions[c] - self.positions[a]);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        for (n, old) in normals.iter_mut().zip(self.normals.iter()) {
            *n = n.try_normalize().unwrap_or(*old);
        }
        self.normals = normals;
    }

    pub fn transformed(&self, transform: Mat4) -> MeshData {
        let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
        MeshData {
            positions: self.positions.iter().map(|p| transform.transform_point3(*p)).collect(),
            normals: self
                .normals
                .iter()
                .map(|n| (normal_matrix * *n).normalize_or_zero())
                .collect(),
            indices: self.indices.clone(),
            dynamic: self.dynamic,
        }
    }

    pub fn merge(parts: &[MeshData]) -> MeshData {
        let mut merged = MeshData::default();
        for part in parts {
            let base = merged.positions.len() as u32;
            merged.positions.extend_from_slice(&part.positions);
            merged.normals.extend_from_slice(&part.normals);
            merged.indices.extend(part.indices.iter().map(|i| i + base));
        }
        merged
    }
}

pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let ws = width_segments.max(3);
    let hs = height_segments.max(2);
    let mut mesh = MeshData::default();

    for iy in 0..=hs {
        let v = iy as f32 / hs as f32;
        for ix in 0..=ws {
            let u = ix as f32 / ws as f32;
            let p = Vec3::new(
                -radius * (u * TAU).cos() * (v * PI).sin(),
                radius * (v * PI).cos(),
                radius * (u * TAU).sin() * (v * PI).sin(),
            );
            mesh.positions.push(p);
            mesh.normals.push(p.try_normalize().unwrap_or(Vec3::Y));
        }
    }

    let row = ws + 1;
    for iy in 0..hs {
        for ix in 0..ws {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            if iy != 0 {
                mesh.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != hs - 1 {
                mesh.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    mesh
}

/// Capped cylinder centred on the origin, axis along Y.
pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, radial_segments: u32) -> MeshData {
    let segments = radial_segments.max(3);
    let half = height / 2.0;
    let slope = (radius_bottom - radius_top) / height;
    let mut mesh = MeshData::default();

    for (y, radius) in [(half, radius_top), (-half, radius_bottom)] {
        for ix in 0..=segments {
            let theta = ix as f32 / segments as f32 * TAU;
            let (sin, cos) = theta.sin_cos();
            mesh.positions.push(Vec3::new(radius * sin, y, radius * cos));
            mesh.normals.push(Vec3::new(sin, slope, cos).normalize());
        }
    }
    let row = segments + 1;
    for ix in 0..segments {
        let (a, b, c, d) = (ix, row + ix, row + ix + 1, ix + 1);
        mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    for (y, radius, normal) in [(half, radius_top, Vec3::Y), (-half, radius_bottom, Vec3::NEG_Y)] {
        let center = mesh.positions.len() as u32;
        mesh.positions.push(Vec3::new(0.0, y, 0.0));
        mesh.normals.push(normal);
        for ix in 0..=segments {
            let theta = ix as f32 / segments as f32 * TAU;
            mesh.positions.push(Vec3::new(radius * theta.sin(), y, radius * theta.cos()));
            mesh.normals.push(normal);
        }
        for ix in 0..segments {
            mesh.indices.extend_from_slice(&[center, center + 1 + ix, center + 2 + ix]);
        }
    }
    mesh
}

/// Flat annulus in the XY plane facing +Z.
pub fn ring(inner_radius: f32, outer_radius: f32, segments: u32) -> MeshData {
    let segments = segments.max(3);
    let mut mesh = MeshData::default();
    for ix in 0..=segments {
        let theta = ix as f32 / segments as f32 * TAU;
        let (sin, cos) = theta.sin_cos();
        for radius in [inner_radius, outer_radius] {
            mesh.positions.push(Vec3::new(radius * cos, radius * sin, 0.0));
            mesh.normals.push(Vec3::Z);
        }
    }
    for ix in 0..segments {
        let i = ix * 2;
        mesh.indices.extend_from_slice(&[i, i + 1, i + 3, i, i + 3, i + 2]);
    }
    mesh
}

/// Rectangle in the XY plane facing +Z.
pub fn plane(width: f32, height: f32) -> MeshData {
    let (hw, hh) = (width / 2.0, height / 2.0);
    MeshData {
        positions: vec![
            Vec3::new(-hw, -hh, 0.0),
            Vec3::new(hw, -hh, 0.0),
            Vec3::new(hw, hh, 0.0),
            Vec3::new(-hw, hh, 0.0),
        ],
        normals: vec![Vec3::Z; 4],
        indices: vec![0, 1, 2, 0, 2, 3],
        dynamic: false,
    }
}

pub fn cuboid(width: f32, height: f32, depth: f32) -> MeshData {
    let half = Vec3::new(width, height, depth) / 2.0;
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];
    let mut mesh = MeshData::default();
    for (normal, u, v) in faces {
        let base = mesh.positions.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            mesh.positions.push((normal + u * su + v * sv) * half);
            mesh.normals.push(normal);
        }
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let sphere = uv_sphere(0.5, 32, 24);
        assert_eq!(sphere.vertex_count(), 33 * 25);
        assert!(sphere.positions.iter().all(|p| (p.length() - 0.5).abs() < 1e-5));
        assert!(sphere.indices.iter().all(|&i| (i as usize) < sphere.vertex_count()));
        // Poles contribute one triangle per segment instead of two.
        assert_eq!(sphere.indices.len(), (32 * 24 * 2 - 2 * 32) * 3);
    }

    #[test]
    fn cuboid_extents_match_dimensions() {
        let cube = cuboid(3.5, 2.5, 0.3);
        let max = cube.positions.iter().fold(Vec3::splat(f32::MIN), |m, p| m.max(*p));
        assert!((max - Vec3::new(1.75, 1.25, 0.15)).length() < 1e-5);
        assert_eq!(cube.indices.len(), 36);
    }

    #[test]
    fn merge_offsets_indices() {
        let merged = MeshData::merge(&[plane(1.0, 1.0), plane(2.0, 2.0)]);
        assert_eq!(merged.vertex_count(), 8);
        assert_eq!(&merged.indices[6..], &[4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn recompute_normals_keeps_sphere_normals_outward() {
        let mut sphere = uv_sphere(1.0, 16, 12);
        sphere.recompute_normals();
        for (p, n) in sphere.positions.iter().zip(&sphere.normals) {
            if p.y.abs() < 0.99 {
                assert!(p.normalize().dot(*n) > 0.9);
            }
        }
    }
}
