//! Turntable camera orbiting the center of the loaded volume.

use glam::{Mat4, Vec3};

const MIN_PITCH: f32 = -1.55;
const MAX_PITCH: f32 = 1.55;

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub radius: f32,
    /// Rotation about +Y in radians; zero looks down -Z.
    pub yaw: f32,
    pub pitch: f32,
    pub fov_y: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            radius: 5.0,
            yaw: 0.0,
            pitch: 0.0,
            fov_y: 30f32.to_radians(),
        }
    }
}

impl OrbitCamera {
    pub fn with_fov_degrees(fov_y_degrees: f32) -> Self {
        Self {
            fov_y: fov_y_degrees.clamp(5.0, 120.0).to_radians(),
            ..Self::default()
        }
    }

    /// Centers on the box and backs off until its bounding sphere fits the view.
    pub fn frame_bounds(&mut self, min: Vec3, max: Vec3) {
        self.target = (min + max) * 0.5;
        let half_diagonal = ((max - min).length() * 0.5).max(1e-3);
        self.radius = half_diagonal / (self.fov_y * 0.5).sin() * 1.05;
        self.yaw = 0.0;
        self.pitch = 0.0;
    }

    #[must_use]
    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target + self.radius * Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    #[must_use]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    #[must_use]
    pub fn projection(&self, aspect: f32) -> Mat4 {
        let near = (self.radius * 0.01).max(1e-3);
        let far = self.radius * 10.0;
        Mat4::perspective_rh(self.fov_y, aspect.max(1e-3), near, far)
    }

    #[must_use]
    pub fn inverse_view_projection(&self, aspect: f32) -> Mat4 {
        (self.projection(aspect) * self.view()).inverse()
    }

    /// Drag in radians.
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw = (self.yaw + delta_yaw).rem_euclid(std::f32::consts::TAU);
        self.pitch = (self.pitch + delta_pitch).clamp(MIN_PITCH, MAX_PITCH);
    }

    /// Positive steps move closer.
    pub fn zoom(&mut self, steps: f32) {
        self.radius = (self.radius * 0.9f32.powf(steps)).max(1e-3);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_centers_on_the_volume() {
        let mut camera = OrbitCamera::default();
        camera.frame_bounds(Vec3::ZERO, Vec3::new(9.0, 3.0, 3.0));
        assert_eq!(camera.target, Vec3::new(4.5, 1.5, 1.5));
        let distance = (camera.eye() - camera.target).length();
        assert!((distance - camera.radius).abs() < 1e-4);
        assert!(camera.radius > Vec3::new(9.0, 3.0, 3.0).length() * 0.5);
    }

    #[test]
    fn screen_center_looks_at_the_target() {
        let mut camera = OrbitCamera::default();
        camera.frame_bounds(Vec3::splat(-1.0), Vec3::splat(1.0));
        camera.orbit(0.7, 0.3);
        let inv = camera.inverse_view_projection(16.0 / 9.0);
        let near = inv.project_point3(Vec3::new(0.0, 0.0, 0.0));
        let far = inv.project_point3(Vec3::new(0.0, 0.0, 1.0));
        let ray = (far - near).normalize();
        let to_target = (camera.target - camera.eye()).normalize();
        assert!(ray.dot(to_target) > 0.9999);
    }

    #[test]
    fn pitch_is_clamped_and_zoom_stays_positive() {
        let mut camera = OrbitCamera::default();
        camera.orbit(0.0, 10.0);
        assert_eq!(camera.pitch, MAX_PITCH);
        camera.zoom(1000.0);
        assert!(camera.radius > 0.0);
    }
}
