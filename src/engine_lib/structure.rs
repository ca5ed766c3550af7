// src/engine_lib/structure.rs
//
// The hexagonal prism: six framed screens at 60° steps, a base disc and a
// glowing ring. Built once per scene, no randomness.

use glam::{Mat4, Quat, Vec3};
use log::debug;

use crate::engine_lib::config::StructureStyle;
use crate::engine_lib::geometry::{self, MeshData};
use crate::engine_lib::scene_types::{Material, MeshId, StructureFace, FACE_ANGLE_STEP, FACE_COUNT};

/// Height of the screen centres above the group origin.
pub const FACE_CENTER_Y: f32 = 0.35;
pub const BASE_Y: f32 = -1.0;
pub const RING_Y: f32 = -0.8;
const FRAME_INSET: f32 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartKind {
    Shell,
    Base,
    Ring,
}

/// Non-navigable geometry; never picked.
#[derive(Clone, Copy, Debug)]
pub struct StructurePart {
    pub kind: PartKind,
    pub mesh: MeshId,
    pub transform: Mat4,
    pub material: Material,
    pub casts_shadow: bool,
}

#[derive(Clone, Debug)]
pub struct Structure {
    pub faces: Vec<StructureFace>,
    pub parts: Vec<StructurePart>,
}

/// Azimuth of face `index` in structure-local space. Rotating the group by
/// `+index * 60°` brings this face round to +Z, toward the camera.
pub fn face_azimuth(index: usize) -> f32 {
    -(index as f32) * FACE_ANGLE_STEP
}

fn push_mesh(meshes: &mut Vec<MeshData>, mesh: MeshData) -> MeshId {
    meshes.push(mesh);
    MeshId(meshes.len() - 1)
}

pub fn build_structure(style: &StructureStyle, meshes: &mut Vec<MeshData>) -> Structure {
    // One merged shell for the six frames.
    let frame = geometry::cuboid(style.frame_size.x, style.frame_size.y, style.frame_size.z);
    let frames: Vec<MeshData> = (0..FACE_COUNT)
        .map(|i| {
            let azimuth = face_azimuth(i);
            let rotation = Quat::from_rotation_y(azimuth);
            let center = rotation * Vec3::new(0.0, FACE_CENTER_Y, style.face_radius - FRAME_INSET);
            frame.transformed(Mat4::from_rotation_translation(rotation, center))
        })
        .collect();
    let shell = push_mesh(meshes, MeshData::merge(&frames));

    let panel = push_mesh(meshes, geometry::plane(style.panel_size.x, style.panel_size.y));
    let faces = (0..FACE_COUNT)
        .map(|index| {
            let angular_position = face_azimuth(index);
            let position =
                Quat::from_rotation_y(angular_position) * Vec3::new(0.0, FACE_CENTER_Y, style.face_radius + 0.05);
            StructureFace {
                index,
                angular_position,
                position,
                panel_size: style.panel_size,
                clearance_radius: style.face_clearance,
                mesh: panel,
                is_active: false,
                material: Material::lit(style.screen_idle, 0.3).with_emissive(style.screen_emissive, style.rest_emissive),
                scale: 1.0,
                pulse_remaining: 0.0,
            }
        })
        .collect();

    let base = push_mesh(meshes, geometry::cylinder(6.5, 7.0, 0.3, 6));
    let ring = push_mesh(meshes, geometry::ring(6.0, 6.8, 64));

    let parts = vec![
        StructurePart {
            kind: PartKind::Shell,
            mesh: shell,
            transform: Mat4::IDENTITY,
            material: Material::lit(style.frame_color, 0.6),
            casts_shadow: true,
        },
        StructurePart {
            kind: PartKind::Base,
            mesh: base,
            transform: Mat4::from_translation(Vec3::new(0.0, BASE_Y, 0.0)),
            material: Material::lit(style.base_color, 0.8).with_emissive(style.base_emissive, 0.2),
            casts_shadow: false,
        },
        StructurePart {
            kind: PartKind::Ring,
            mesh: ring,
            transform: Mat4::from_translation(Vec3::new(0.0, RING_Y, 0.0))
                * Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2),
            material: Material::unlit(style.ring_color, ring_opacity(0.0)),
            casts_shadow: false,
        },
    ];

    debug!("structure built: {} faces, {} meshes", FACE_COUNT, meshes.len());
    Structure { faces, parts }
}

pub fn ring_opacity(time: f32) -> f32 {
    0.2 + 0.1 * (time * 0.3).sin()
}

/// Ring pulse; the only per-frame change to the non-navigable parts.
pub fn animate_parts(parts: &mut [StructurePart], time: f32) {
    for part in parts.iter_mut().filter(|p| p.kind == PartKind::Ring) {
        part.material.opacity = ring_opacity(time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::config::SceneConfig;

    fn build() -> (Structure, Vec<MeshData>) {
        let mut meshes = Vec::new();
        let style = SceneConfig::default().theme().structure;
        (build_structure(&style, &mut meshes), meshes)
    }

    #[test]
    fn six_faces_at_sixty_degree_steps() {
        let (structure, _) = build();
        assert_eq!(structure.faces.len(), 6);
        for (i, face) in structure.faces.iter().enumerate() {
            assert_eq!(face.index, i);
            let expected = -(i as f32) * 60f32.to_radians();
            assert!((face.angular_position - expected).abs() < 1e-6);
            let horizontal = Vec3::new(face.position.x, 0.0, face.position.z);
            assert!(horizontal.normalize().abs_diff_eq(face.normal(), 1e-5));
        }
    }

    #[test]
    fn rotating_by_section_angle_faces_the_camera() {
        let (structure, _) = build();
        for face in &structure.faces {
            let group = Quat::from_rotation_y(face.index as f32 * FACE_ANGLE_STEP);
            assert!((group * face.normal()).abs_diff_eq(Vec3::Z, 1e-5));
        }
    }

    #[test]
    fn build_is_deterministic() {
        let (a, meshes_a) = build();
        let (b, meshes_b) = build();
        assert_eq!(meshes_a.len(), meshes_b.len());
        for (fa, fb) in a.faces.iter().zip(&b.faces) {
            assert_eq!(fa.position, fb.position);
        }
        assert_eq!(meshes_a[0].positions, meshes_b[0].positions);
    }

    #[test]
    fn ring_opacity_stays_in_band() {
        let (mut structure, _) = build();
        for step in 0..200 {
            animate_parts(&mut structure.parts, step as f32 * 0.37);
            let ring = structure.parts.iter().find(|p| p.kind == PartKind::Ring).expect("ring");
            assert!((0.1 - 1e-6..=0.3 + 1e-6).contains(&ring.material.opacity));
        }
    }
}
