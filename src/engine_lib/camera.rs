// src/engine_lib/camera.rs

use glam::{Mat4, Vec2, Vec3};

use crate::engine_lib::config::CameraRig;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub fov_y_rad: f32,
    pub znear: f32,
    pub zfar: f32,
    pub aspect: f32,
    /// Rest position; idle motion is an offset from here.
    pub home: Vec3,
    pub position: Vec3,
    pub target: Vec3,
    /// Last non-zero viewport in pixels.
    pub viewport: Vec2,
}

impl Camera {
    pub fn new(fov_y_deg: f32, znear: f32, zfar: f32, position: Vec3) -> Self {
        Self {
            fov_y_rad: fov_y_deg.to_radians(),
            znear,
            zfar,
            aspect: 1.0,
            home: position,
            position,
            target: Vec3::ZERO,
            viewport: Vec2::ONE,
        }
    }

    pub fn from_rig(rig: &CameraRig) -> Self {
        Self::new(rig.fov_deg, rig.znear, rig.zfar, rig.position)
    }

    /// Zero-sized viewports keep the previous aspect.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
            self.viewport = Vec2::new(width as f32, height as f32);
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_rad, self.aspect, self.znear, self.zfar)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Client pixel coordinates to normalised device coordinates (y up).
    pub fn screen_to_ndc(client: Vec2, viewport: Vec2) -> Vec2 {
        Vec2::new(client.x / viewport.x * 2.0 - 1.0, -(client.y / viewport.y) * 2.0 + 1.0)
    }

    /// Returns `None` for degenerate viewports.
    pub fn ray_through(&self, client: Vec2, viewport: Vec2) -> Option<Ray> {
        if viewport.x <= 0.0 || viewport.y <= 0.0 {
            return None;
        }
        let ndc = Self::screen_to_ndc(client, viewport);
        let inverse = self.view_projection().inverse();
        // wgpu clip depth runs 0..1.
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        let direction = (far - near).try_normalize()?;
        Some(Ray { origin: self.position, direction })
    }

    /// Inverse of `ray_through`, used by tests and the overlay.
    pub fn project_to_screen(&self, world: Vec3, viewport: Vec2) -> Option<Vec2> {
        let view = self.view_matrix().transform_point3(world);
        if -view.z < self.znear || -view.z > self.zfar {
            return None;
        }
        let ndc = self.view_projection().project_point3(world);
        Some(Vec2::new((ndc.x + 1.0) * 0.5 * viewport.x, (1.0 - ndc.y) * 0.5 * viewport.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        let mut camera = Camera::new(45.0, 0.1, 1000.0, Vec3::new(0.0, 2.0, 12.0));
        camera.set_viewport(1280, 720);
        camera
    }

    #[test]
    fn screen_centre_maps_to_ndc_origin() {
        let ndc = Camera::screen_to_ndc(Vec2::new(640.0, 360.0), Vec2::new(1280.0, 720.0));
        assert!(ndc.abs_diff_eq(Vec2::ZERO, 1e-6));
        let corner = Camera::screen_to_ndc(Vec2::ZERO, Vec2::new(1280.0, 720.0));
        assert_eq!(corner, Vec2::new(-1.0, 1.0));
    }

    #[test]
    fn centre_ray_points_at_target() {
        let camera = camera();
        let ray = camera.ray_through(Vec2::new(640.0, 360.0), Vec2::new(1280.0, 720.0)).expect("ray");
        let expected = (camera.target - camera.position).normalize();
        assert!(ray.direction.abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn projection_and_unprojection_agree() {
        let camera = camera();
        let viewport = Vec2::new(1280.0, 720.0);
        let world = Vec3::new(1.5, 0.5, 5.0);
        let screen = camera.project_to_screen(world, viewport).expect("in front of camera");
        let ray = camera.ray_through(screen, viewport).expect("ray");
        let t = (world - ray.origin).length();
        assert!((ray.origin + ray.direction * t).abs_diff_eq(world, 1e-3));
    }

    #[test]
    fn zero_viewport_is_ignored() {
        let mut camera = camera();
        camera.set_viewport(0, 300);
        assert!((camera.aspect - 1280.0 / 720.0).abs() < 1e-6);
        assert!(camera.ray_through(Vec2::ZERO, Vec2::ZERO).is_none());
    }
}
