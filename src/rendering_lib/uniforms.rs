// src/rendering_lib/uniforms.rs
//
// CPU-side mirrors of the WGSL uniform blocks. Everything is packed as
// vec4/mat4 so the std140-style layout needs no manual padding.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::engine_lib::lighting::{DirectionalLight, PointLight, MAX_POINT_LIGHTS};
use crate::engine_lib::scene_logic::SceneState;
use crate::engine_lib::scene_types::Material;

/// Dynamic-offset stride for `ObjectUniform`; every adapter we target
/// accepts 256.
pub const OBJECT_STRIDE: u64 = 256;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    /// xyz camera position, w scene time.
    pub camera: [f32; 4],
    /// xy viewport pixels, z exposure, w active point lights.
    pub viewport: [f32; 4],
    pub key_dir: [f32; 4],
    pub key_color: [f32; 4],
    pub fill_dir: [f32; 4],
    pub fill_color: [f32; 4],
    pub rim_dir: [f32; 4],
    pub rim_color: [f32; 4],
    pub ambient: [f32; 4],
    pub hemi_sky: [f32; 4],
    pub hemi_ground: [f32; 4],
    /// rgb fog color, w fog near.
    pub fog: [f32; 4],
    /// x fog far, y shadow texel size.
    pub fog_far: [f32; 4],
    /// xyz position, w range.
    pub point_pos: [[f32; 4]; MAX_POINT_LIGHTS],
    /// rgb color, w intensity.
    pub point_color: [[f32; 4]; MAX_POINT_LIGHTS],
}

fn directional(light: &DirectionalLight) -> ([f32; 4], [f32; 4]) {
    (light.direction().extend(0.0).to_array(), light.color.extend(light.intensity).to_array())
}

impl FrameUniform {
    pub fn from_state(state: &SceneState) -> Self {
        let rig = &state.theme.lighting;
        let fog = &state.theme.fog;
        let (key_dir, key_color) = directional(&rig.key);
        let (fill_dir, fill_color) = directional(&rig.fill);
        let (rim_dir, rim_color) = directional(&rig.rim);

        let lights: Vec<PointLight> = state.point_lights();
        let mut point_pos = [[0.0; 4]; MAX_POINT_LIGHTS];
        let mut point_color = [[0.0; 4]; MAX_POINT_LIGHTS];
        for (i, light) in lights.iter().take(MAX_POINT_LIGHTS).enumerate() {
            point_pos[i] = light.position.extend(light.range).to_array();
            point_color[i] = light.color.extend(light.intensity).to_array();
        }

        Self {
            view_proj: state.camera.view_projection().to_cols_array_2d(),
            light_view_proj: rig.key_light_view_proj().to_cols_array_2d(),
            camera: state.camera.position.extend(state.time).to_array(),
            viewport: [
                state.camera.viewport.x,
                state.camera.viewport.y,
                state.theme.exposure,
                lights.len().min(MAX_POINT_LIGHTS) as f32,
            ],
            key_dir,
            key_color,
            fill_dir,
            fill_color,
            rim_dir,
            rim_color,
            ambient: (rig.ambient * rig.ambient_intensity).extend(1.0).to_array(),
            hemi_sky: rig.hemisphere.sky.extend(rig.hemisphere.intensity).to_array(),
            hemi_ground: rig.hemisphere.ground.extend(0.0).to_array(),
            fog: fog.color.extend(fog.near).to_array(),
            fog_far: [fog.far, 1.0 / rig.shadow.map_size.max(1) as f32, 0.0, 0.0],
            point_pos,
            point_color,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    /// rgb base color, w opacity.
    pub color: [f32; 4],
    /// rgb emissive already scaled by intensity, w roughness.
    pub emissive: [f32; 4],
    /// x is 1 for unlit materials.
    pub flags: [f32; 4],
}

impl ObjectUniform {
    pub fn new(model: Mat4, material: &Material) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            color: material.color.extend(material.opacity).to_array(),
            emissive: (material.emissive * material.emissive_intensity).extend(material.roughness).to_array(),
            flags: [if material.unlit { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }

    /// Point clouds only need their model matrix.
    pub fn for_points(model: Mat4) -> Self {
        Self::new(model, &Material::unlit(Vec3::ONE, 1.0))
    }
}

/// Packs objects at `stride` bytes apart for dynamic-offset binding.
pub fn pack_objects(objects: &[ObjectUniform], stride: u64) -> Vec<u8> {
    let stride = stride as usize;
    let mut bytes = vec![0u8; objects.len() * stride];
    for (i, object) in objects.iter().enumerate() {
        let raw = bytemuck::bytes_of(object);
        bytes[i * stride..i * stride + raw.len()].copy_from_slice(raw);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::config::SceneConfig;

    #[test]
    fn object_block_fits_one_stride() {
        assert!(std::mem::size_of::<ObjectUniform>() as u64 <= OBJECT_STRIDE);
        assert_eq!(std::mem::size_of::<FrameUniform>() % 16, 0);
    }

    #[test]
    fn packed_objects_start_on_stride_boundaries() {
        let a = ObjectUniform::new(Mat4::IDENTITY, &Material::lit(Vec3::X, 0.5));
        let b = ObjectUniform::for_points(Mat4::from_translation(Vec3::Y));
        let bytes = pack_objects(&[a, b], OBJECT_STRIDE);
        assert_eq!(bytes.len(), 512);
        let second: &ObjectUniform = bytemuck::from_bytes(&bytes[256..256 + std::mem::size_of::<ObjectUniform>()]);
        assert_eq!(second.model[3], [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(second.flags[0], 1.0);
    }

    #[test]
    fn frame_block_reports_light_count() {
        let config = SceneConfig { seed: Some(5), ..Default::default() };
        let state = SceneState::new(&config);
        let frame = FrameUniform::from_state(&state);
        assert_eq!(frame.viewport[3] as usize, state.point_lights().len());
        assert_eq!(frame.viewport[2], state.theme.exposure);
    }
}
