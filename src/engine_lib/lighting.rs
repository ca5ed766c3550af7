// src/engine_lib/lighting.rs

use glam::{Mat4, Vec3};
use crate::engine_lib::scene_types::BlobEntity;

/// The GPU light block holds this many point lights.
pub const MAX_POINT_LIGHTS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    /// Lights shine from `position` toward the origin.
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl DirectionalLight {
    pub fn new(color: Vec3, intensity: f32, position: Vec3) -> Self {
        Self { position, color, intensity }
    }

    /// Unit vector pointing from the scene toward the light.
    pub fn direction(&self) -> Vec3 {
        self.position.normalize_or_zero()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HemisphereLight {
    pub sky: Vec3,
    pub ground: Vec3,
    pub intensity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowSettings {
    pub map_size: u32,
    /// Half-size of the orthographic shadow box.
    pub extent: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self { map_size: 1024, extent: 15.0, near: 0.1, far: 50.0 }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LightingRig {
    /// Casts the scene's only shadow.
    pub key: DirectionalLight,
    pub fill: DirectionalLight,
    pub rim: DirectionalLight,
    pub ambient: Vec3,
    pub ambient_intensity: f32,
    pub hemisphere: HemisphereLight,
    pub accents: Vec<PointLight>,
    /// Blob-following lights, filled in after the static accents.
    pub blob_lights: usize,
    pub shadow: ShadowSettings,
}

impl LightingRig {
    pub fn key_light_view_proj(&self) -> Mat4 {
        let e = self.shadow.extent;
        let up = if self.key.direction().abs_diff_eq(Vec3::Y, 1e-3) { Vec3::Z } else { Vec3::Y };
        let view = Mat4::look_at_rh(self.key.position, Vec3::ZERO, up);
        let proj = Mat4::orthographic_rh(-e, e, -e, e, self.shadow.near, self.shadow.far);
        proj * view
    }

    /// Static accents first, then lights riding on the first blobs, capped at
    /// `MAX_POINT_LIGHTS`. Blob lights follow the blob's glow pulse.
    pub fn point_lights(&self, blobs: &[BlobEntity], group: Mat4) -> Vec<PointLight> {
        let mut lights: Vec<PointLight> = self.accents.iter().copied().take(MAX_POINT_LIGHTS).collect();
        let room = MAX_POINT_LIGHTS - lights.len();
        lights.extend(blobs.iter().take(self.blob_lights.min(room)).map(|blob| PointLight {
            position: group.transform_point3(blob.position),
            color: blob.color.emission,
            intensity: blob.glow * 1.5,
            range: 4.0,
        }));
        lights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::config::{SceneConfig, ThemePreset};
    use crate::engine_lib::scene_logic::SceneState;

    #[test]
    fn point_lights_never_exceed_gpu_block() {
        let config = SceneConfig { theme: ThemePreset::Cinematic, seed: Some(3), ..Default::default() };
        let state = SceneState::new(&config);
        let mut rig = state.theme.lighting.clone();
        rig.blob_lights = 10;
        let lights = rig.point_lights(&state.blobs, Mat4::IDENTITY);
        assert_eq!(lights.len(), MAX_POINT_LIGHTS);
        assert_eq!(lights[0], rig.accents[0]);
    }

    #[test]
    fn key_light_projection_keeps_origin_in_depth_range() {
        let rig = SceneConfig::default().theme().lighting;
        let clip = rig.key_light_view_proj().project_point3(Vec3::ZERO);
        assert!(clip.x.abs() < 1e-4 && clip.y.abs() < 1e-4);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }
}
