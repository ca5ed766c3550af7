// src/engine_lib/config.rs
//
// One scene engine, several looks. A `Theme` is the fully resolved set of
// cosmetic choices; `SceneConfig` is what a host hands us (and what the
// native binary reads from JSON).

use std::path::Path;

use glam::{Vec2, Vec3};
use serde::Deserialize;

use crate::engine_lib::lighting::{DirectionalLight, HemisphereLight, LightingRig, PointLight, ShadowSettings};
use crate::engine_lib::scene_types::{BlobClass, BlobColor, PlayVolume, PointCloudKind};
use crate::error::{Result, SceneError};

/// Populations above this are simulated but the pairwise step gets expensive.
pub const RECOMMENDED_MAX_BLOBS: usize = 60;
/// Viewports narrower than this (logical px) use the compact layout.
pub const COMPACT_WIDTH: f64 = 768.0;
pub const COMPACT_MAX_BLOBS: usize = 8;

pub fn is_compact_width(logical_width: f64) -> bool {
    logical_width > 0.0 && logical_width < COMPACT_WIDTH
}

/// Host page sections, one per structure face.
pub const SECTION_LABELS: [&str; 6] = ["Home", "Features", "Marketplace", "Therion", "Enterprise", "Contact"];

pub fn hex(rgb: u32) -> Vec3 {
    Vec3::new(
        ((rgb >> 16) & 0xff) as f32 / 255.0,
        ((rgb >> 8) & 0xff) as f32 / 255.0,
        (rgb & 0xff) as f32 / 255.0,
    )
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreset {
    #[default]
    Default,
    Clean,
    Cinematic,
}

impl ThemePreset {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "default" => Some(Self::Default),
            "clean" => Some(Self::Clean),
            "cinematic" => Some(Self::Cinematic),
            _ => None,
        }
    }
}

/// Live tuning knobs for the blob population.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BlobControls {
    pub movement_speed: f32,
    pub random_direction_factor: f32,
    pub jiggle_intensity: f32,
    /// Multiplier on the summed radii inside which headings repel.
    pub avoidance_distance: f32,
    pub rotation_speed: f32,
}

impl BlobControls {
    pub const MAX_JIGGLE: f32 = 2.0;

    pub fn sanitized(self) -> Self {
        let clamp = |v: f32, max: f32| if v.is_finite() { v.clamp(0.0, max) } else { 1.0 };
        Self {
            movement_speed: clamp(self.movement_speed, 3.0),
            random_direction_factor: clamp(self.random_direction_factor, 3.0),
            jiggle_intensity: clamp(self.jiggle_intensity, Self::MAX_JIGGLE),
            avoidance_distance: clamp(self.avoidance_distance, 4.0),
            rotation_speed: clamp(self.rotation_speed, 3.0),
        }
    }
}

impl Default for BlobControls {
    fn default() -> Self {
        Self {
            movement_speed: 1.0,
            random_direction_factor: 1.0,
            jiggle_intensity: 1.0,
            avoidance_distance: 2.0,
            rotation_speed: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub theme: ThemePreset,
    pub blob_count: Option<usize>,
    pub particle_count: Option<usize>,
    pub controls: BlobControls,
    /// Fixed seed for reproducible populations; random when absent.
    pub seed: Option<u64>,
    pub compact: bool,
    pub show_controls: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            theme: ThemePreset::Default,
            blob_count: None,
            particle_count: None,
            controls: BlobControls::default(),
            seed: None,
            compact: false,
            show_controls: false,
        }
    }
}

impl SceneConfig {
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text).map_err(|source| SceneError::Config { path: path.to_path_buf(), source })
    }

    /// Resolves the preset and applies overrides and the compact layout.
    pub fn theme(&self) -> Theme {
        let mut theme = match self.theme {
            ThemePreset::Default => Theme::default_preset(),
            ThemePreset::Clean => Theme::clean(),
            ThemePreset::Cinematic => Theme::cinematic(),
        };
        if let Some(count) = self.blob_count {
            theme.max_blobs = count;
        }
        if let Some(count) = self.particle_count {
            theme.particles.count = count;
        }
        if self.compact {
            theme.max_blobs = theme.max_blobs.min(COMPACT_MAX_BLOBS);
            theme.particles.count /= 2;
            theme.camera.fov_deg = theme.camera.compact_fov_deg;
            theme.camera.position = theme.camera.compact_position;
        }
        theme
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlobClassSpec {
    pub class: BlobClass,
    pub count: usize,
    pub radius: (f32, f32),
    /// Larger classes spawn closer to the axis.
    pub placement_scale: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParticleStyle {
    pub count: usize,
    /// Colour and relative pick weight.
    pub palette: Vec<(Vec3, f32)>,
    /// Upper bound of the random blend toward white.
    pub white_mix: f32,
    pub brightness: (f32, f32),
    pub size: (f32, f32),
    pub spawn_radius: f32,
    pub spawn_height: f32,
    /// Half extents of the bounce box.
    pub bounds: Vec3,
    /// Max per-frame velocity component.
    pub max_velocity: f32,
    /// Radians per second.
    pub spin: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StructureStyle {
    pub face_radius: f32,
    pub panel_size: Vec2,
    pub frame_size: Vec3,
    pub frame_color: Vec3,
    pub screen_active: Vec3,
    pub screen_idle: Vec3,
    pub screen_emissive: Vec3,
    /// Centre and half-amplitude of the active face's emissive oscillation.
    pub active_emissive: (f32, f32),
    pub rest_emissive: f32,
    pub base_color: Vec3,
    pub base_emissive: Vec3,
    pub ring_color: Vec3,
    pub face_clearance: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraRig {
    pub fov_deg: f32,
    pub position: Vec3,
    pub compact_fov_deg: f32,
    pub compact_position: Vec3,
    pub znear: f32,
    pub zfar: f32,
    pub idle_vertical: f32,
    pub idle_lateral: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringParams {
    pub strength: f32,
    pub damping: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FogSettings {
    pub color: Vec3,
    pub near: f32,
    pub far: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Theme {
    pub name: &'static str,
    pub background: Vec3,
    pub fog: FogSettings,
    pub exposure: f32,
    pub blob_classes: Vec<BlobClassSpec>,
    pub max_blobs: usize,
    pub blob_palette: Vec<BlobColor>,
    /// Fraction of the glow pulse that shows up as body emission.
    pub blob_emissive: f32,
    pub eye_color: Vec3,
    pub emergence_chance: f32,
    pub particles: ParticleStyle,
    pub decor: Vec<PointCloudKind>,
    pub structure: StructureStyle,
    pub lighting: LightingRig,
    pub camera: CameraRig,
    pub spring: SpringParams,
    pub volume: PlayVolume,
    pub allow_drag: bool,
}

const CYAN: BlobColor = BlobColor { color: Vec3::new(0.0, 1.0, 1.0), emission: Vec3::new(0.267, 1.0, 1.0) };
const YELLOW: BlobColor = BlobColor { color: Vec3::new(1.0, 1.0, 0.0), emission: Vec3::new(1.0, 1.0, 0.533) };

impl Theme {
    fn default_preset() -> Self {
        Self {
            name: "default",
            background: hex(0x0a0e1a),
            fog: FogSettings { color: Vec3::ZERO, near: 5.0, far: 25.0 },
            exposure: 1.2,
            blob_classes: vec![
                BlobClassSpec { class: BlobClass::Small, count: 8, radius: (0.15, 0.25), placement_scale: 1.0 },
                BlobClassSpec { class: BlobClass::Medium, count: 4, radius: (0.25, 0.4), placement_scale: 0.85 },
                BlobClassSpec { class: BlobClass::Large, count: 1, radius: (0.4, 0.6), placement_scale: 0.7 },
            ],
            max_blobs: 13,
            blob_palette: vec![CYAN, YELLOW],
            blob_emissive: 0.35,
            eye_color: Vec3::ZERO,
            emergence_chance: 0.1,
            particles: ParticleStyle {
                count: 120,
                palette: vec![
                    (hex(0x0a1b3d), 0.3),
                    (hex(0xffff00), 0.25),
                    (hex(0x06b6d4), 0.25),
                    (hex(0xffff44), 0.2),
                ],
                white_mix: 0.0,
                brightness: (0.6, 1.0),
                size: (0.2, 1.0),
                spawn_radius: 5.5,
                spawn_height: 3.5,
                bounds: Vec3::new(6.0, 3.0, 6.0),
                max_velocity: 0.0075,
                spin: 0.012,
            },
            decor: Vec::new(),
            structure: StructureStyle {
                face_radius: 5.0,
                panel_size: Vec2::new(3.0, 2.0),
                frame_size: Vec3::new(3.5, 2.5, 0.3),
                frame_color: hex(0x4a4a4a),
                screen_active: hex(0x00e1ff),
                screen_idle: hex(0x1a1d20),
                screen_emissive: hex(0x003344),
                active_emissive: (0.5, 0.1),
                rest_emissive: 0.1,
                base_color: hex(0x2a2a3a),
                base_emissive: hex(0x001122),
                ring_color: hex(0x00e1ff),
                face_clearance: 1.5,
            },
            lighting: LightingRig {
                key: DirectionalLight::new(hex(0x4ecdc4), 1.8, Vec3::new(8.0, 12.0, 6.0)),
                fill: DirectionalLight::new(hex(0xffe66d), 0.8, Vec3::new(-6.0, 8.0, 4.0)),
                rim: DirectionalLight::new(hex(0xffd700), 0.4, Vec3::new(0.0, -5.0, -10.0)),
                ambient: hex(0x95e1d3),
                ambient_intensity: 0.4,
                hemisphere: HemisphereLight { sky: hex(0x00e1ff), ground: hex(0x131619), intensity: 0.3 },
                accents: vec![PointLight {
                    position: Vec3::new(0.0, 8.0, 0.0),
                    color: hex(0xa8e6cf),
                    intensity: 1.2,
                    range: 25.0,
                }],
                blob_lights: 3,
                shadow: ShadowSettings::default(),
            },
            camera: CameraRig {
                fov_deg: 45.0,
                position: Vec3::new(0.0, 2.0, 12.0),
                compact_fov_deg: 55.0,
                compact_position: Vec3::new(0.0, 1.5, 10.0),
                znear: 0.1,
                zfar: 1000.0,
                idle_vertical: 0.05,
                idle_lateral: 0.02,
            },
            spring: SpringParams { strength: 0.025, damping: 0.9 },
            volume: PlayVolume { radius: 3.8, floor_y: -0.8, ceiling_y: 1.5, emergence_floor_y: -1.5 },
            allow_drag: false,
        }
    }

    fn clean() -> Self {
        let mut theme = Self::default_preset();
        theme.name = "clean";
        theme.blob_classes.truncate(2);
        theme.max_blobs = 12;
        theme.blob_palette = vec![
            BlobColor { color: hex(0x00e1ff), emission: hex(0x66eeff) },
            BlobColor { color: hex(0x39ff14), emission: hex(0x88ff66) },
        ];
        theme.particles.count = 200;
        theme.particles.palette = vec![(hex(0x00e1ff), 0.5), (hex(0x39ff14), 0.5)];
        theme.particles.white_mix = 0.35;
        theme.particles.brightness = (0.8, 1.0);
        theme.particles.size = (1.0, 3.0);
        theme.particles.spawn_radius = 6.0;
        theme.particles.spawn_height = 4.0;
        theme.lighting = LightingRig {
            key: DirectionalLight::new(hex(0x00e1ff), 0.8, Vec3::new(10.0, 10.0, 5.0)),
            fill: DirectionalLight::new(hex(0x39ff14), 0.3, Vec3::new(-5.0, 5.0, 5.0)),
            rim: DirectionalLight::new(hex(0xffd700), 0.4, Vec3::new(0.0, -5.0, -10.0)),
            ambient: hex(0x1a1d20),
            ambient_intensity: 0.2,
            hemisphere: HemisphereLight { sky: hex(0x00e1ff), ground: hex(0x131619), intensity: 0.3 },
            accents: vec![
                PointLight { position: Vec3::new(4.0, 6.0, 4.0), color: hex(0x00e1ff), intensity: 0.8, range: 20.0 },
                PointLight { position: Vec3::new(-4.0, 6.0, -4.0), color: hex(0x39ff14), intensity: 0.6, range: 20.0 },
            ],
            blob_lights: 2,
            shadow: ShadowSettings { map_size: 2048, ..ShadowSettings::default() },
        };
        theme.spring = SpringParams { strength: 0.05, damping: 0.8 };
        theme.camera.idle_vertical = 0.1;
        theme
    }

    fn cinematic() -> Self {
        let mut theme = Self::default_preset();
        theme.name = "cinematic";
        theme.background = hex(0x000422);
        theme.fog = FogSettings { color: hex(0x000422), near: 8.0, far: 60.0 };
        theme.blob_classes = vec![
            BlobClassSpec { class: BlobClass::Small, count: 40, radius: (0.12, 0.2), placement_scale: 1.0 },
            BlobClassSpec { class: BlobClass::Medium, count: 16, radius: (0.2, 0.3), placement_scale: 0.85 },
            BlobClassSpec { class: BlobClass::Large, count: 4, radius: (0.3, 0.4), placement_scale: 0.7 },
        ];
        theme.max_blobs = 60;
        theme.blob_palette = [0x00ffff, 0x0099ff, 0x3366ff, 0x6600ff, 0xff0099, 0xff6600]
            .into_iter()
            .map(|rgb| BlobColor { color: hex(rgb), emission: hex(rgb) })
            .collect();
        theme.blob_emissive = 0.5;
        theme.emergence_chance = 0.15;
        theme.decor = vec![PointCloudKind::Dust, PointCloudKind::Stars, PointCloudKind::Orbs];
        theme.camera.fov_deg = 50.0;
        theme.camera.position = Vec3::new(0.0, 3.0, 14.0);
        theme.lighting.accents.push(PointLight {
            position: Vec3::new(0.0, -3.0, 6.0),
            color: hex(0xff0099),
            intensity: 0.8,
            range: 18.0,
        });
        theme.lighting.blob_lights = 2;
        theme.allow_drag = true;
        theme
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_layout_below_breakpoint_only() {
        assert!(is_compact_width(375.0));
        assert!(!is_compact_width(COMPACT_WIDTH));
        assert!(!is_compact_width(1280.0));
        // An unsized container is not a phone.
        assert!(!is_compact_width(0.0));
    }

    #[test]
    fn hex_unpacks_channels() {
        assert_eq!(hex(0xff8000), Vec3::new(1.0, 128.0 / 255.0, 0.0));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = SceneConfig::from_json_str(r#"{ "theme": "cinematic", "controls": { "jiggle_intensity": 1.5 } }"#)
            .expect("valid config");
        assert_eq!(config.theme, ThemePreset::Cinematic);
        assert_eq!(config.controls.jiggle_intensity, 1.5);
        assert_eq!(config.controls.movement_speed, 1.0);
        assert!(config.seed.is_none());
    }

    #[test]
    fn unknown_theme_is_rejected() {
        assert!(SceneConfig::from_json_str(r#"{ "theme": "neon" }"#).is_err());
        assert_eq!(ThemePreset::from_name(" Clean "), Some(ThemePreset::Clean));
    }

    #[test]
    fn compact_layout_caps_population_and_widens_view() {
        let config = SceneConfig { compact: true, ..Default::default() };
        let theme = config.theme();
        assert_eq!(theme.max_blobs, COMPACT_MAX_BLOBS);
        assert_eq!(theme.particles.count, 60);
        assert_eq!(theme.camera.fov_deg, 55.0);
    }

    #[test]
    fn presets_keep_populations_in_documented_range() {
        for preset in [ThemePreset::Default, ThemePreset::Clean, ThemePreset::Cinematic] {
            let theme = SceneConfig { theme: preset, ..Default::default() }.theme();
            let from_classes: usize = theme.blob_classes.iter().map(|c| c.count).sum();
            assert_eq!(from_classes, theme.max_blobs, "{}", theme.name);
            assert!((12..=RECOMMENDED_MAX_BLOBS).contains(&theme.max_blobs));
            assert!(theme.particles.count >= 120);
            assert!(!theme.lighting.accents.is_empty());
        }
    }

    #[test]
    fn sanitized_controls_clamp_and_repair() {
        let wild = BlobControls { jiggle_intensity: 9.0, movement_speed: f32::NAN, ..Default::default() }.sanitized();
        assert_eq!(wild.jiggle_intensity, BlobControls::MAX_JIGGLE);
        assert_eq!(wild.movement_speed, 1.0);
    }
}
