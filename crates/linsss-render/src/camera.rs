//! Orbit camera.
//!
//! Matches the demo's viewing setup: the mesh sits at the origin, the camera
//! orbits it with Euler rotations and a dolly distance. Any change to the
//! orbit restarts the translucent-shadow-map accumulation, so the camera
//! tracks a dirty flag the engine consumes once per frame.

use glam::{Mat4, Vec3};

/// Vertical field of view of the viewing camera, in degrees.
pub const CAMERA_FOV_DEG: f32 = 60.0;
const CAMERA_NEAR: f32 = 0.001;
const CAMERA_FAR: f32 = 256.0;

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    /// Euler rotation around x/y/z, in degrees.
    rotation: Vec3,
    /// Dolly offset along the view axis (negative = away from the origin).
    zoom: f32,
    aspect: f32,
    changed: bool,
}

impl OrbitCamera {
    pub fn new(aspect: f32) -> Self {
        Self {
            rotation: Vec3::new(180.0, 0.0, 0.0),
            zoom: -3.5,
            aspect,
            changed: true,
        }
    }

    /// Adds a drag delta to the orbit rotation, in degrees.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        if dx != 0.0 || dy != 0.0 {
            self.rotation.x += dy;
            self.rotation.y += dx;
            self.changed = true;
        }
    }

    /// Dollies toward (positive) or away from (negative) the origin.
    pub fn dolly(&mut self, delta: f32) {
        if delta != 0.0 {
            self.zoom += delta;
            self.changed = true;
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > f32::EPSILON {
            self.aspect = aspect;
            self.changed = true;
        }
    }

    /// Returns whether the view changed since the last call, clearing the flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 0.0, self.zoom))
            * Mat4::from_rotation_x(self.rotation.x.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_z(self.rotation.z.to_radians())
    }

    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(CAMERA_FOV_DEG.to_radians(), self.aspect, CAMERA_NEAR, CAMERA_FAR)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj() * self.view()
    }

    /// World-space eye position.
    pub fn eye(&self) -> Vec3 {
        self.view().inverse().transform_point3(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_camera_is_dirty_once() {
        let mut cam = OrbitCamera::new(1.0);
        assert!(cam.take_changed());
        assert!(!cam.take_changed());
    }

    #[test]
    fn test_rotate_marks_changed() {
        let mut cam = OrbitCamera::new(1.0);
        cam.take_changed();
        cam.rotate(0.0, 0.0);
        assert!(!cam.take_changed());
        cam.rotate(1.0, 0.0);
        assert!(cam.take_changed());
    }

    #[test]
    fn test_dolly_moves_eye() {
        let mut cam = OrbitCamera::new(1.0);
        let before = cam.eye().length();
        cam.dolly(-1.0);
        assert!(cam.eye().length() > before);
    }

    #[test]
    fn test_default_eye_distance() {
        let cam = OrbitCamera::new(1.0);
        assert!((cam.eye().length() - 3.5).abs() < 1e-4);
    }
}
