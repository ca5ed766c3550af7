// src/engine_lib/interaction.rs
//
// Click picking against the navigable screens only. Blobs, particles and
// the structure body are never hit-tested.

use glam::{Mat4, Vec2};
use log::debug;
use std::f32::consts::PI;

use crate::engine_lib::camera::{Camera, Ray};
use crate::engine_lib::scene_types::StructureFace;

pub const PULSE_DURATION: f32 = 0.25;
pub const PULSE_SCALE: f32 = 1.15;

/// Scale multiplier for a face `remaining` seconds into its click pulse.
pub fn pulse_scale(remaining: f32) -> f32 {
    if remaining <= 0.0 {
        return 1.0;
    }
    let progress = 1.0 - (remaining / PULSE_DURATION).min(1.0);
    1.0 + (PULSE_SCALE - 1.0) * (progress * PI).sin()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceHit {
    pub index: usize,
    pub distance: f32,
}

/// Front-side intersection of `ray` with one panel, in world units.
fn intersect_face(ray: &Ray, face: &StructureFace, group: Mat4) -> Option<f32> {
    let world = group * face.local_transform();
    let inverse = world.inverse();
    let origin = inverse.transform_point3(ray.origin);
    let direction = inverse.transform_vector3(ray.direction);
    // Panels face +Z locally; rays arriving from behind miss.
    if direction.z >= -1e-6 {
        return None;
    }
    let t = -origin.z / direction.z;
    if t <= 0.0 {
        return None;
    }
    let hit = origin + direction * t;
    let half = face.panel_size * 0.5;
    if hit.x.abs() > half.x || hit.y.abs() > half.y {
        return None;
    }
    Some(world.transform_point3(hit).distance(ray.origin))
}

pub fn pick_face(ray: &Ray, faces: &[StructureFace], group: Mat4) -> Option<FaceHit> {
    faces
        .iter()
        .filter_map(|face| intersect_face(ray, face, group).map(|distance| FaceHit { index: face.index, distance }))
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Resolves a click at `client` pixels. On a hit the face starts its pulse
/// and the index is returned for the host callback.
pub fn click(
    faces: &mut [StructureFace],
    group: Mat4,
    camera: &Camera,
    client: Vec2,
    viewport: Vec2,
) -> Option<usize> {
    let ray = camera.ray_through(client, viewport)?;
    let Some(hit) = pick_face(&ray, faces, group) else {
        debug!("click at {client} hit nothing navigable");
        return None;
    };
    if let Some(face) = faces.iter_mut().find(|f| f.index == hit.index) {
        face.pulse_remaining = PULSE_DURATION;
    }
    Some(hit.index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::config::SceneConfig;
    use crate::engine_lib::controller::section_angle;
    use crate::engine_lib::structure::build_structure;

    const VIEWPORT: Vec2 = Vec2::new(1280.0, 720.0);

    fn setup() -> (Vec<StructureFace>, Camera) {
        let theme = SceneConfig::default().theme();
        let mut meshes = Vec::new();
        let structure = build_structure(&theme.structure, &mut meshes);
        let mut camera = Camera::from_rig(&theme.camera);
        camera.set_viewport(VIEWPORT.x as u32, VIEWPORT.y as u32);
        (structure.faces, camera)
    }

    #[test]
    fn clicking_each_face_reports_its_index() {
        let (mut faces, camera) = setup();
        for section in 0..6 {
            let group = Mat4::from_rotation_y(section_angle(section));
            let center = group.transform_point3(faces[section].position);
            let screen = camera.project_to_screen(center, VIEWPORT).expect("visible");
            assert_eq!(click(&mut faces, group, &camera, screen, VIEWPORT), Some(section));
            assert_eq!(faces[section].pulse_remaining, PULSE_DURATION);
        }
    }

    #[test]
    fn empty_space_is_a_no_op() {
        let (mut faces, camera) = setup();
        assert_eq!(click(&mut faces, Mat4::IDENTITY, &camera, Vec2::new(5.0, 5.0), VIEWPORT), None);
        assert!(faces.iter().all(|f| f.pulse_remaining == 0.0));
    }

    #[test]
    fn rays_from_behind_a_panel_miss_it() {
        let (faces, _) = setup();
        let face = &faces[0];
        let ray = Ray { origin: face.position - face.normal() * 2.0, direction: face.normal() };
        assert!(intersect_face(&ray, face, Mat4::IDENTITY).is_none());
        let front = Ray { origin: face.position + face.normal() * 2.0, direction: -face.normal() };
        let distance = intersect_face(&front, face, Mat4::IDENTITY).expect("front hit");
        assert!((distance - 2.0).abs() < 1e-4);
    }

    #[test]
    fn pulse_starts_and_ends_at_rest_scale() {
        assert_eq!(pulse_scale(0.0), 1.0);
        assert!((pulse_scale(PULSE_DURATION) - 1.0).abs() < 1e-6);
        assert!((pulse_scale(PULSE_DURATION / 2.0) - PULSE_SCALE).abs() < 1e-6);
    }
}
