/// Free-look camera and view matrix derivation
use nalgebra::{Matrix4, Point3, Vector3};

use crate::error::GeometryResult;
use crate::transform::{normalize, Transform};

/// Default margin kept between the look direction and straight up/down.
pub const DEFAULT_PITCH_CLAMP_DEGREES: f32 = 1.0;

fn world_up() -> Vector3<f32> {
    Vector3::new(0.0, 1.0, 0.0)
}

/// Camera position and look direction.
///
/// `right` and `up` are rederived from `forward` on every query, and the
/// pitch is measured from `forward` rather than stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    forward: Vector3<f32>,
    pitch_clamp: f32,
}

impl Camera {
    /// Create a camera at `position` looking along `forward`.
    ///
    /// Fails when `forward` is zero or points straight up or down.
    pub fn new(position: Point3<f32>, forward: Vector3<f32>) -> GeometryResult<Self> {
        let forward = normalize(&forward)?;
        normalize(&world_up().cross(&forward))?;
        Ok(Self {
            position,
            forward,
            pitch_clamp: DEFAULT_PITCH_CLAMP_DEGREES.to_radians(),
        })
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.forward
    }

    pub fn right(&self) -> Vector3<f32> {
        world_up()
            .cross(&self.forward)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::x)
    }

    pub fn up(&self) -> Vector3<f32> {
        self.forward.cross(&self.right()).normalize()
    }

    /// Angle between the look direction and world up, in radians.
    pub fn pitch(&self) -> f32 {
        world_up().dot(&self.forward).clamp(-1.0, 1.0).acos()
    }

    /// Set the margin (in degrees) kept from straight up and straight down.
    pub fn set_pitch_clamp(&mut self, degrees: f32) {
        self.pitch_clamp = degrees.abs().to_radians();
    }

    /// Tilt the view up (positive `angle`) or down, in radians.
    ///
    /// Returns `false` and leaves the camera untouched when the new
    /// direction would come within the pitch clamp of either pole.
    pub fn change_pitch(&mut self, angle: f32) -> bool {
        let target = self.pitch() - angle;
        if target < self.pitch_clamp || target > std::f32::consts::PI - self.pitch_clamp {
            return false;
        }
        let rotation = Transform::rotation_axis(&self.right(), -angle);
        match normalize(&rotation.transform_vector(&self.forward)) {
            Ok(forward) => {
                self.forward = forward;
                true
            }
            Err(_) => false,
        }
    }

    /// Turn right (positive `angle`) or left around world up, in radians.
    pub fn change_yaw(&mut self, angle: f32) {
        let rotation = Transform::rotation_axis(&world_up(), angle);
        let candidate = rotation.transform_vector(&self.forward);
        if let Ok(forward) = normalize(&candidate) {
            self.forward = forward;
        }
    }

    pub fn move_by(&mut self, step: Vector3<f32>) {
        self.position += step;
    }

    /// World-to-view transform: translate by `-position`, then rotate so
    /// that `right`, `up` and `forward` become the x, y and z axes.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        let right = self.right();
        let up = self.up();
        let forward = self.forward;
        #[rustfmt::skip]
        let rotation = Matrix4::new(
            right.x, right.y, right.z, 0.0,
            up.x, up.y, up.z, 0.0,
            forward.x, forward.y, forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let translation =
            Transform::translation_matrix(-self.position.x, -self.position.y, -self.position.z);
        Transform::compose(&[translation, rotation])
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, -5.0),
            forward: Vector3::new(0.0, 0.0, 1.0),
            pitch_clamp: DEFAULT_PITCH_CLAMP_DEGREES.to_radians(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeometryError;
    use crate::transform::point;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(Point3::new(0.0, 0.0, -10.0), Vector3::new(0.0, 0.0, 3.0)).unwrap();
        assert_relative_eq!(camera.forward(), Vector3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(camera.right(), Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(camera.up(), Vector3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(camera.pitch(), FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn test_camera_rejects_degenerate_forward() {
        assert_eq!(
            Camera::new(Point3::origin(), Vector3::zeros()),
            Err(GeometryError::DegenerateVector)
        );
        assert!(Camera::new(Point3::origin(), Vector3::new(0.0, -2.0, 0.0)).is_err());
    }

    #[test]
    fn test_view_matrix() {
        let camera = Camera::new(Point3::new(0.0, 0.0, -10.0), Vector3::z()).unwrap();
        let view = camera.view_matrix();
        assert_relative_eq!(view * point(0.0, 0.0, -10.0), point(0.0, 0.0, 0.0));
        assert_relative_eq!(view * point(1.0, 2.0, 0.0), point(1.0, 2.0, 10.0));
    }

    #[test]
    fn test_view_matrix_puts_forward_on_z() {
        let mut camera = Camera::new(Point3::new(3.0, 1.0, -2.0), Vector3::z()).unwrap();
        camera.change_yaw(0.8);
        camera.change_pitch(0.3);
        let view = camera.view_matrix();
        let ahead = camera.position + camera.forward() * 4.0;
        assert_relative_eq!(
            view * ahead.to_homogeneous(),
            point(0.0, 0.0, 4.0),
            epsilon = 1e-5
        );
        // Rows stay orthonormal.
        assert_relative_eq!(camera.right().dot(&camera.up()), 0.0, epsilon = 1e-6);
        assert_relative_eq!(camera.right().dot(&camera.forward()), 0.0, epsilon = 1e-6);
        assert_relative_eq!(camera.up().dot(&camera.forward()), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_yaw_turns_right() {
        let mut camera = Camera::default();
        camera.change_yaw(FRAC_PI_2);
        assert_relative_eq!(camera.forward(), Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_pitch_looks_up() {
        let mut camera = Camera::default();
        assert!(camera.change_pitch(FRAC_PI_4));
        assert!(camera.forward().y > 0.0);
        assert_relative_eq!(camera.pitch(), FRAC_PI_4, epsilon = 1e-5);
    }

    #[test]
    fn test_pitch_clamp_rejects_flip() {
        let mut camera = Camera::default();
        assert!(camera.change_pitch(FRAC_PI_4));
        let before = camera.clone();
        // Another 45 degrees would look straight up.
        assert!(!camera.change_pitch(FRAC_PI_4));
        assert_eq!(camera, before);
        assert!(!camera.change_pitch(-std::f32::consts::PI));

        camera.set_pitch_clamp(50.0);
        assert!(!camera.change_pitch(0.01));
        assert!(camera.change_pitch(-0.2));
    }

    #[test]
    fn test_move_by() {
        let mut camera = Camera::default();
        camera.move_by(Vector3::new(1.0, 0.0, 2.0));
        assert_relative_eq!(camera.position, Point3::new(1.0, 0.0, -3.0));
    }
}
