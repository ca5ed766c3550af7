// src/engine_lib/mod.rs
//
// Platform-independent scene logic: configuration, simulation, picking and
// host lifecycle. No wgpu, no windows.
pub mod camera;
pub mod clock;
pub mod config;
pub mod controller;
pub mod geometry;
pub mod interaction;
pub mod lifecycle;
pub mod lighting;
pub mod particles;
pub mod scene_logic;
pub mod scene_types;
pub mod soft_body;
pub mod structure;

pub use camera::Camera;
pub use config::{BlobControls, SceneConfig, Theme, ThemePreset};
pub use controller::{PointerController, RotationController};
pub use lifecycle::{emit_section_change, FrameLoop, HostBridge, SharedBridge};
pub use scene_logic::SceneState;
