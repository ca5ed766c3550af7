// src/engine_lib/controller.rs

use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};
use winit::event::{ElementState, MouseButton, WindowEvent};

use crate::engine_lib::camera::Camera;
use crate::engine_lib::config::{CameraRig, SpringParams, StructureStyle};
use crate::engine_lib::interaction::pulse_scale;
use crate::engine_lib::scene_types::{StructureFace, FACE_ANGLE_STEP, FACE_COUNT};

/// Press/release closer than this (physical px) is a click, not a drag.
pub const CLICK_SLOP: f32 = 5.0;
/// Radians of rotation per pixel of horizontal drag.
pub const DRAG_SENSITIVITY: f32 = 0.005;
const FACE_SETTLE: f32 = 0.1;

/// Wraps any host-supplied section index onto a face.
pub fn normalize_section(section: i64) -> usize {
    section.rem_euclid(FACE_COUNT as i64) as usize
}

pub fn section_angle(section: usize) -> f32 {
    section as f32 * FACE_ANGLE_STEP
}

/// Signed difference `to - from` folded into (-π, π].
fn shortest_delta(from: f32, to: f32) -> f32 {
    let d = (to - from).rem_euclid(TAU);
    if d > PI {
        d - TAU
    } else {
        d
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlState {
    Tracking,
    UserInteracting,
}

/// Spring-damped rotation of the structure group about Y.
#[derive(Clone, Debug)]
pub struct RotationController {
    current: f32,
    velocity: f32,
    target: f32,
    section: usize,
    state: ControlState,
    spring: SpringParams,
    reduced_motion: bool,
}

impl RotationController {
    /// Starts settled on `section`.
    pub fn new(spring: SpringParams, section: i64, reduced_motion: bool) -> Self {
        let section = normalize_section(section);
        let angle = section_angle(section);
        Self {
            current: angle,
            velocity: 0.0,
            target: angle,
            section,
            state: ControlState::Tracking,
            spring,
            reduced_motion,
        }
    }

    pub fn angle(&self) -> f32 {
        self.current
    }

    /// The current angle folded into [0, 2π).
    pub fn settled_angle(&self) -> f32 {
        self.current.rem_euclid(TAU)
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn section(&self) -> usize {
        self.section
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    /// Retargets without touching velocity, so a change mid-animation
    /// carries on smoothly along the shortest arc.
    pub fn set_section(&mut self, section: i64) {
        self.section = normalize_section(section);
        self.retarget();
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) {
        self.reduced_motion = reduced;
    }

    fn retarget(&mut self) {
        self.target = self.current + shortest_delta(self.current, section_angle(self.section));
    }

    pub fn begin_drag(&mut self) {
        self.state = ControlState::UserInteracting;
        self.velocity = 0.0;
    }

    pub fn drag_by(&mut self, dx_px: f32) {
        if self.state == ControlState::UserInteracting {
            self.current += dx_px * DRAG_SENSITIVITY;
        }
    }

    pub fn end_drag(&mut self) {
        if self.state == ControlState::UserInteracting {
            self.state = ControlState::Tracking;
            self.retarget();
        }
    }

    pub fn update(&mut self) {
        match self.state {
            ControlState::UserInteracting => {}
            ControlState::Tracking if self.reduced_motion => {
                self.current = self.target;
                self.velocity = 0.0;
            }
            ControlState::Tracking => {
                self.velocity += (self.target - self.current) * self.spring.strength;
                self.velocity *= self.spring.damping;
                self.current += self.velocity;
            }
        }
    }
}

/// Small low-frequency sway around the rest position; the look-at target
/// never moves.
pub fn update_camera(camera: &mut Camera, rig: &CameraRig, time: f32, reduced_motion: bool) {
    camera.position = if reduced_motion {
        camera.home
    } else {
        camera.home
            + Vec3::new((time * 0.3).sin() * rig.idle_lateral, (time * 0.5).sin() * rig.idle_vertical, 0.0)
    };
    camera.target = Vec3::ZERO;
}

/// Highlights the face for `section` and lets the others settle.
pub fn update_faces(
    faces: &mut [StructureFace],
    section: usize,
    style: &StructureStyle,
    time: f32,
    dt: f32,
    reduced_motion: bool,
) {
    let (center, amplitude) = style.active_emissive;
    for face in faces.iter_mut() {
        face.is_active = face.index == section;
        face.pulse_remaining = (face.pulse_remaining - dt).max(0.0);
        let material = &mut face.material;
        let base_scale = if face.is_active {
            material.color = style.screen_active;
            if reduced_motion {
                material.emissive_intensity = center;
                1.0
            } else {
                material.emissive_intensity = center + amplitude * (time * 2.0).sin();
                1.0 + 0.05 * (time * 2.0).sin()
            }
        } else {
            material.color = style.screen_idle;
            material.emissive_intensity += (style.rest_emissive - material.emissive_intensity) * FACE_SETTLE;
            1.0
        };
        face.scale = base_scale * pulse_scale(face.pulse_remaining);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerAction {
    Click(Vec2),
    Drag(f32),
    DragEnd,
}

/// Turns raw pointer events into clicks and drags.
#[derive(Debug, Default)]
pub struct PointerController {
    cursor: Vec2,
    pressed_at: Option<Vec2>,
    dragging: bool,
    allow_drag: bool,
}

impl PointerController {
    pub fn new(allow_drag: bool) -> Self {
        Self { allow_drag, ..Default::default() }
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) -> Option<PointerAction> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer_moved(Vec2::new(position.x as f32, position.y as f32))
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => match state {
                ElementState::Pressed => {
                    self.pointer_pressed();
                    None
                }
                ElementState::Released => self.pointer_released(),
            },
            WindowEvent::CursorLeft { .. } if self.dragging => {
                self.pressed_at = None;
                self.dragging = false;
                Some(PointerAction::DragEnd)
            }
            _ => None,
        }
    }

    pub fn pointer_moved(&mut self, position: Vec2) -> Option<PointerAction> {
        let dx = position.x - self.cursor.x;
        self.cursor = position;
        let origin = self.pressed_at?;
        if !self.allow_drag {
            return None;
        }
        if !self.dragging && origin.distance(position) >= CLICK_SLOP {
            self.dragging = true;
            return Some(PointerAction::Drag(position.x - origin.x));
        }
        self.dragging.then_some(PointerAction::Drag(dx))
    }

    pub fn pointer_pressed(&mut self) {
        self.pressed_at = Some(self.cursor);
        self.dragging = false;
    }

    pub fn pointer_released(&mut self) -> Option<PointerAction> {
        let origin = self.pressed_at.take()?;
        if std::mem::take(&mut self.dragging) {
            return Some(PointerAction::DragEnd);
        }
        (origin.distance(self.cursor) < CLICK_SLOP).then_some(PointerAction::Click(self.cursor))
    }
}
