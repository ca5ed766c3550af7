// src/engine_lib/scene_types.rs
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

pub const FACE_COUNT: usize = 6;
pub const FACE_ANGLE_STEP: f32 = std::f32::consts::TAU / FACE_COUNT as f32;

/// Index into `SceneState::meshes`; the renderer keeps GPU buffers in the same order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub color: Vec3,
    pub emissive: Vec3,
    pub emissive_intensity: f32,
    pub opacity: f32,
    pub roughness: f32,
    pub unlit: bool,
}

impl Material {
    pub fn lit(color: Vec3, roughness: f32) -> Self {
        Self {
            color,
            emissive: Vec3::ZERO,
            emissive_intensity: 0.0,
            opacity: 1.0,
            roughness,
            unlit: false,
        }
    }

    pub fn unlit(color: Vec3, opacity: f32) -> Self {
        Self {
            color,
            emissive: Vec3::ZERO,
            emissive_intensity: 0.0,
            opacity,
            roughness: 1.0,
            unlit: true,
        }
    }

    pub fn with_emissive(mut self, emissive: Vec3, intensity: f32) -> Self {
        self.emissive = emissive;
        self.emissive_intensity = intensity;
        self
    }
}

/// One mesh draw for the current frame, with its final world matrix.
#[derive(Clone, Copy, Debug)]
pub struct DrawItem {
    pub mesh: MeshId,
    pub model: Mat4,
    pub material: Material,
    pub casts_shadow: bool,
}

/// Cylindrical region the blobs swim in, in structure-local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayVolume {
    pub radius: f32,
    pub floor_y: f32,
    pub ceiling_y: f32,
    /// Lowest height an emerging blob may occupy while it rises into the volume.
    pub emergence_floor_y: f32,
}

impl PlayVolume {
    pub fn horizontal_limit(&self, collision_radius: f32) -> f32 {
        (self.radius - collision_radius).max(0.0)
    }

    pub fn contains(&self, position: Vec3, collision_radius: f32, emerging: bool, eps: f32) -> bool {
        let horizontal = Vec2::new(position.x, position.z).length();
        let floor = if emerging { self.emergence_floor_y } else { self.floor_y };
        horizontal <= self.horizontal_limit(collision_radius) + eps
            && position.y >= floor - eps
            && position.y <= self.ceiling_y + eps
    }
}

/// A navigable screen on the hexagonal structure.
#[derive(Clone, Debug)]
pub struct StructureFace {
    pub index: usize,
    /// Fixed azimuth in structure-local space.
    pub angular_position: f32,
    pub position: Vec3,
    pub panel_size: Vec2,
    /// Blobs keep at least this far from `position`.
    pub clearance_radius: f32,
    pub mesh: MeshId,
    pub is_active: bool,
    pub material: Material,
    pub scale: f32,
    /// Seconds left on the click feedback pulse.
    pub pulse_remaining: f32,
}

impl StructureFace {
    /// Outward-facing unit normal in structure-local space.
    pub fn normal(&self) -> Vec3 {
        Vec3::new(self.angular_position.sin(), 0.0, self.angular_position.cos())
    }

    pub fn local_transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_y(self.angular_position),
            self.position,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlobClass {
    Small,
    Medium,
    Large,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlobColor {
    pub color: Vec3,
    pub emission: Vec3,
}

/// Independent random phases so a population never moves in lockstep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlobPhases {
    pub jelly: f32,
    pub pulse: f32,
    pub swim: f32,
    pub squish: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlobMotion {
    pub swim_speed: f32,
    pub swim_amplitude: f32,
    pub jelly_speed: f32,
    pub jelly_intensity: f32,
    pub pulse_speed: f32,
    pub pulse_intensity: f32,
    pub squishiness: f32,
    pub squish_speed: f32,
    /// Radians per second about Y.
    pub rotation_speed: f32,
    pub happiness: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Emergence {
    pub target_y: f32,
    pub anchor: Vec2,
    pub spiral_angle: f32,
    pub spiral_speed: f32,
    pub spiral_radius: f32,
    pub rise_speed: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Eye {
    pub rest_offset: Vec3,
    pub offset: Vec3,
    pub radius: f32,
    pub scale_y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BlinkState {
    Open { timer: f32 },
    Closed { left: f32, right: f32, depth: f32 },
}

#[derive(Clone, Debug)]
pub struct BlobEntity {
    pub mesh: MeshId,
    pub class: BlobClass,
    pub color: BlobColor,
    pub position: Vec3,
    pub current_direction: Vec3,
    pub target_direction: Vec3,
    base_radius: f32,
    collision_radius: f32,
    original_vertices: Vec<Vec3>,
    pub live_vertices: Vec<Vec3>,
    pub geometry_dirty: bool,
    pub phases: BlobPhases,
    pub motion: BlobMotion,
    pub is_emerging: bool,
    pub emergence: Emergence,
    /// Euler angles (x, y, z) in radians.
    pub rotation: Vec3,
    pub scale: Vec3,
    pub eyes: [Eye; 2],
    pub blink: BlinkState,
    pub glow: f32,
}

impl BlobEntity {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mesh: MeshId,
        class: BlobClass,
        color: BlobColor,
        position: Vec3,
        heading: Vec3,
        base_radius: f32,
        collision_scale: f32,
        original_vertices: Vec<Vec3>,
        phases: BlobPhases,
        motion: BlobMotion,
        is_emerging: bool,
        emergence: Emergence,
        eyes: [Eye; 2],
        blink_timer: f32,
    ) -> Self {
        let live_vertices = original_vertices.clone();
        Self {
            mesh,
            class,
            color,
            position,
            current_direction: heading,
            target_direction: heading,
            base_radius,
            collision_radius: base_radius * collision_scale,
            original_vertices,
            live_vertices,
            geometry_dirty: false,
            phases,
            motion,
            is_emerging,
            emergence,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            eyes,
            blink: BlinkState::Open { timer: blink_timer },
            glow: motion.pulse_intensity,
        }
    }

    pub fn base_radius(&self) -> f32 {
        self.base_radius
    }

    pub fn collision_radius(&self) -> f32 {
        self.collision_radius
    }

    /// The undeformed baseline; never mutated after spawn.
    pub fn original_vertices(&self) -> &[Vec3] {
        &self.original_vertices
    }

    /// Recomputes every live vertex from its baseline and flags the buffer.
    pub fn rebuild_live_vertices(&mut self, offset: impl Fn(Vec3) -> Vec3) {
        for (live, original) in self.live_vertices.iter_mut().zip(&self.original_vertices) {
            *live = *original + offset(*original);
        }
        self.geometry_dirty = true;
    }

    pub fn local_transform(&self) -> Mat4 {
        let rotation = Quat::from_euler(glam::EulerRot::YXZ, self.rotation.y, self.rotation.x, self.rotation.z);
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointSprite {
    pub position: Vec3,
    pub velocity: Vec3,
    pub size: f32,
    pub color: Vec4,
    pub phase: f32,
    /// Rate used by the decorative layers (drift, twinkle or float speed).
    pub speed: f32,
    pub anchor: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointCloudKind {
    /// Main ambient field; lives inside the rotating structure group.
    Ambient,
    Dust,
    Stars,
    Orbs,
}

#[derive(Clone, Debug)]
pub struct PointCloud {
    pub kind: PointCloudKind,
    pub points: Vec<PointSprite>,
    /// Spin about Y, applied on top of the parent transform.
    pub rotation_y: f32,
    pub dirty: bool,
}

impl PointCloud {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
