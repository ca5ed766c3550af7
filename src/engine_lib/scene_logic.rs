// src/engine_lib/scene_logic.rs
//
// `SceneState` owns every piece of simulation data for one mounted scene and
// advances it in a fixed order. Nothing in here touches the GPU.

use glam::{Mat4, Vec2, Vec3};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::engine_lib::camera::Camera;
use crate::engine_lib::config::{BlobControls, SceneConfig, Theme};
use crate::engine_lib::controller::{self, RotationController};
use crate::engine_lib::geometry::MeshData;
use crate::engine_lib::interaction;
use crate::engine_lib::lighting::PointLight;
use crate::engine_lib::particles;
use crate::engine_lib::scene_types::{BlobEntity, DrawItem, Material, PointCloud, StructureFace};
use crate::engine_lib::soft_body::{self, EyeMeshes, StepContext};
use crate::engine_lib::structure::{self, StructurePart};

/// Longest step the simulation accepts; a stalled tab resumes calmly.
pub const MAX_FRAME_DT: f32 = 0.1;

pub struct SceneState {
    pub theme: Theme,
    pub controls: BlobControls,
    /// Every mesh in the scene; `MeshId` indexes into this.
    pub meshes: Vec<MeshData>,
    pub faces: Vec<StructureFace>,
    pub parts: Vec<StructurePart>,
    pub blobs: Vec<BlobEntity>,
    pub eye_meshes: EyeMeshes,
    pub ambient: PointCloud,
    pub decor: Vec<PointCloud>,
    pub rotation: RotationController,
    pub camera: Camera,
    pub time: f32,
    pub frame: u64,
    rng: StdRng,
}

impl SceneState {
    pub fn new(config: &SceneConfig) -> Self {
        Self::with_host(config, 0, false)
    }

    pub fn with_host(config: &SceneConfig, section: i64, reduced_motion: bool) -> Self {
        let theme = config.theme();
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut meshes = Vec::new();
        let structure = structure::build_structure(&theme.structure, &mut meshes);
        let population = soft_body::spawn_population(&theme, &structure.faces, &mut meshes, &mut rng);
        let ambient = particles::spawn_ambient(&theme.particles, &mut rng);
        let decor = theme.decor.iter().map(|kind| particles::spawn_decor(*kind, &mut rng)).collect();

        let rotation = RotationController::new(theme.spring, section, reduced_motion);
        let camera = Camera::from_rig(&theme.camera);

        info!(
            "scene '{}' ready: {} blobs, {} particles, {} meshes",
            theme.name,
            population.blobs.len(),
            ambient.len(),
            meshes.len()
        );

        let mut state = Self {
            controls: config.controls.sanitized(),
            meshes,
            faces: structure.faces,
            parts: structure.parts,
            blobs: population.blobs,
            eye_meshes: population.eyes,
            ambient,
            decor,
            rotation,
            camera,
            time: 0.0,
            frame: 0,
            rng,
            theme,
        };
        state.refresh_faces(0.0);
        state
    }

    pub fn group_transform(&self) -> Mat4 {
        Mat4::from_rotation_y(self.rotation.angle())
    }

    pub fn set_section(&mut self, section: i64) {
        let before = self.rotation.section();
        self.rotation.set_section(section);
        if before != self.rotation.section() {
            info!("section {} -> {}", before, self.rotation.section());
        }
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) {
        self.rotation.set_reduced_motion(reduced);
    }

    pub fn set_controls(&mut self, controls: BlobControls) {
        self.controls = controls.sanitized();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport(width, height);
    }

    fn refresh_faces(&mut self, dt: f32) {
        controller::update_faces(
            &mut self.faces,
            self.rotation.section(),
            &self.theme.structure,
            self.time,
            dt,
            self.rotation.reduced_motion(),
        );
    }

    /// One whole frame: rotation and face materials, then the blobs, then
    /// the particles. Rendering happens after this returns.
    pub fn advance_frame(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_FRAME_DT) } else { 0.0 };
        self.time += dt;
        self.frame += 1;

        self.rotation.update();
        self.refresh_faces(dt);
        structure::animate_parts(&mut self.parts, self.time);
        controller::update_camera(&mut self.camera, &self.theme.camera, self.time, self.rotation.reduced_motion());

        let ctx = StepContext {
            volume: &self.theme.volume,
            faces: &self.faces,
            controls: &self.controls,
            time: self.time,
            dt,
        };
        soft_body::step(&mut self.blobs, &ctx, &mut self.rng);

        particles::update_ambient(&mut self.ambient, &self.theme.particles, self.time, dt);
        for cloud in self.decor.iter_mut() {
            particles::update_decor(cloud, self.time, dt);
        }
    }

    /// Returns the picked section; the caller forwards it to the host.
    pub fn click(&mut self, client: Vec2, viewport: Vec2) -> Option<usize> {
        let group = self.group_transform();
        let hit = interaction::click(&mut self.faces, group, &self.camera, client, viewport);
        if let Some(index) = hit {
            debug!("face {} clicked", index);
        }
        hit
    }

    pub fn begin_drag(&mut self) {
        self.rotation.begin_drag();
    }

    pub fn drag_by(&mut self, dx_px: f32) {
        self.rotation.drag_by(dx_px);
    }

    pub fn end_drag(&mut self) {
        self.rotation.end_drag();
    }

    pub fn point_lights(&self) -> Vec<PointLight> {
        self.theme.lighting.point_lights(&self.blobs, self.group_transform())
    }

    /// Point clouds with their model matrices. The ambient field turns with
    /// the structure; decorative layers live in world space.
    pub fn point_clouds(&self) -> impl Iterator<Item = (&PointCloud, Mat4)> {
        let group = self.group_transform();
        std::iter::once((&self.ambient, group * Mat4::from_rotation_y(self.ambient.rotation_y)))
            .chain(self.decor.iter().map(|cloud| (cloud, Mat4::from_rotation_y(cloud.rotation_y))))
    }

    pub fn draw_items(&self) -> Vec<DrawItem> {
        let group = self.group_transform();
        let mut items = Vec::with_capacity(self.parts.len() + self.faces.len() + self.blobs.len() * 5);

        items.extend(self.parts.iter().map(|part| DrawItem {
            mesh: part.mesh,
            model: group * part.transform,
            material: part.material,
            casts_shadow: part.casts_shadow,
        }));
        items.extend(self.faces.iter().map(|face| DrawItem {
            mesh: face.mesh,
            model: group * face.local_transform(),
            material: face.material,
            casts_shadow: false,
        }));

        let eye_white = Material::unlit(Vec3::ONE, 1.0);
        let pupil = Material::unlit(self.theme.eye_color, 1.0);
        for blob in &self.blobs {
            let body = group * blob.local_transform();
            let tint = 1.0 + (self.time * 0.5 + blob.phases.pulse).sin() * 0.1;
            items.push(DrawItem {
                mesh: blob.mesh,
                model: body,
                material: Material::lit(blob.color.color * tint, 0.3)
                    .with_emissive(blob.color.emission, blob.glow * self.theme.blob_emissive),
                casts_shadow: true,
            });
            for eye in &blob.eyes {
                let eye_model = body
                    * Mat4::from_translation(eye.offset)
                    * Mat4::from_scale(Vec3::new(eye.radius, eye.radius * eye.scale_y, eye.radius));
                items.push(DrawItem { mesh: self.eye_meshes.white, model: eye_model, material: eye_white, casts_shadow: false });
                items.push(DrawItem {
                    mesh: self.eye_meshes.pupil,
                    model: eye_model * Mat4::from_translation(Vec3::new(0.0, 0.0, 0.7)) * Mat4::from_scale(Vec3::splat(0.45)),
                    material: pupil,
                    casts_shadow: false,
                });
            }
        }
        items
    }

    /// Clears the upload flags once the renderer has copied the live vertices.
    pub fn mark_geometry_uploaded(&mut self) {
        for blob in self.blobs.iter_mut() {
            blob.geometry_dirty = false;
        }
        self.ambient.dirty = false;
        for cloud in self.decor.iter_mut() {
            cloud.dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::config::ThemePreset;
    use crate::engine_lib::controller::section_angle;

    fn state(preset: ThemePreset, reduced: bool) -> SceneState {
        let config = SceneConfig { theme: preset, seed: Some(21), ..Default::default() };
        SceneState::with_host(&config, 0, reduced)
    }

    #[test]
    fn reduced_motion_is_deterministic_and_instant() {
        let mut s = state(ThemePreset::Default, true);
        s.set_section(4);
        s.advance_frame(1.0 / 60.0);
        assert!((s.rotation.settled_angle() - section_angle(4)).abs() < 1e-5);
        let camera = s.camera.position;
        s.advance_frame(1.0 / 60.0);
        assert_eq!(camera, s.camera.position);
    }

    #[test]
    fn out_of_range_sections_wrap_onto_faces() {
        let mut s = state(ThemePreset::Default, true);
        s.set_section(-2);
        s.advance_frame(0.016);
        assert!(s.faces[4].is_active);
        assert_eq!(s.faces.iter().filter(|f| f.is_active).count(), 1);
    }

    #[test]
    fn frame_keeps_every_blob_contained() {
        let mut s = state(ThemePreset::Cinematic, false);
        for _ in 0..300 {
            s.advance_frame(1.0 / 60.0);
            for blob in &s.blobs {
                assert!(s.theme.volume.contains(blob.position, blob.collision_radius(), blob.is_emerging, 1e-4));
            }
        }
    }

    #[test]
    fn huge_or_broken_dt_is_clamped() {
        let mut s = state(ThemePreset::Default, false);
        s.advance_frame(f32::NAN);
        s.advance_frame(30.0);
        assert!((s.time - MAX_FRAME_DT).abs() < 1e-6);
        assert_eq!(s.frame, 2);
    }

    #[test]
    fn click_on_front_face_selects_current_section() {
        let mut s = state(ThemePreset::Default, true);
        s.resize(1280, 720);
        s.set_section(2);
        s.advance_frame(0.016);
        let viewport = Vec2::new(1280.0, 720.0);
        let center = s.group_transform().transform_point3(s.faces[2].position);
        let screen = s.camera.project_to_screen(center, viewport).expect("visible");
        assert_eq!(s.click(screen, viewport), Some(2));
        assert_eq!(s.click(Vec2::new(2.0, 2.0), viewport), None);
    }

    #[test]
    fn draw_list_covers_every_entity() {
        let s = state(ThemePreset::Default, false);
        let items = s.draw_items();
        assert_eq!(items.len(), s.parts.len() + s.faces.len() + s.blobs.len() * 5);
        assert!(items.iter().all(|i| i.mesh.0 < s.meshes.len()));
        assert_eq!(s.point_clouds().count(), 1);
        let cinematic = state(ThemePreset::Cinematic, false);
        assert_eq!(cinematic.point_clouds().count(), 4);
    }

    #[test]
    fn upload_flags_clear() {
        let mut s = state(ThemePreset::Default, false);
        s.advance_frame(0.016);
        assert!(s.blobs.iter().all(|b| b.geometry_dirty));
        s.mark_geometry_uploaded();
        assert!(s.blobs.iter().all(|b| !b.geometry_dirty));
        assert!(!s.ambient.dirty);
    }
}
