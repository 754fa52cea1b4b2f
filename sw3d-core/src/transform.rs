/// Matrix builders, homogeneous helpers and model rotation state
///
/// Conventions used throughout the crate:
/// - column vectors, so a matrix applies to a point as `m * p`
/// - left-handed view space: x right, y up, z forward (into the screen)
/// - clip-space depth in `[0, 1]` (near plane maps to 0, far plane to 1)
/// - screen space has its origin at the top-left corner, y growing downwards
use nalgebra::{Matrix4, Rotation3, SVector, Unit, Vector3, Vector4};

use crate::error::{GeometryError, GeometryResult};

/// Vectors shorter than this cannot be normalized.
pub const NORMALIZE_EPSILON: f32 = 1e-8;

/// Points whose |w| falls below this are rejected by the perspective divide.
pub const W_EPSILON: f32 = 1e-6;

/// Homogeneous point (w = 1).
pub fn point(x: f32, y: f32, z: f32) -> Vector4<f32> {
    Vector4::new(x, y, z, 1.0)
}

/// Homogeneous direction (w = 0).
pub fn direction(x: f32, y: f32, z: f32) -> Vector4<f32> {
    Vector4::new(x, y, z, 0.0)
}

/// Normalize a 2, 3 or 4 component vector.
///
/// Fails with [`GeometryError::DegenerateVector`] instead of producing NaN
/// when the vector has (nearly) zero length or a non-finite component.
/// The vector is scaled by its largest component first, so lengths that
/// would overflow `f32` when squared still normalize.
pub fn normalize<const D: usize>(v: &SVector<f32, D>) -> GeometryResult<SVector<f32, D>> {
    if v.iter().any(|c| !c.is_finite()) {
        return Err(GeometryError::DegenerateVector);
    }
    let scale = v.amax();
    if scale == 0.0 {
        return Err(GeometryError::DegenerateVector);
    }
    let scaled = v / scale;
    let length = scaled.norm();
    if scale * length < NORMALIZE_EPSILON {
        return Err(GeometryError::DegenerateVector);
    }
    let unit = scaled / length;
    if unit.iter().all(|c| c.is_finite()) {
        Ok(unit)
    } else {
        Err(GeometryError::DegenerateVector)
    }
}

/// Divide a clip-space point by its w component.
pub fn perspective_divide(p: &Vector4<f32>) -> GeometryResult<Vector3<f32>> {
    if !p.w.is_finite() || p.w.abs() < W_EPSILON {
        return Err(GeometryError::DivideByZeroW { w: p.w });
    }
    Ok(p.xyz() / p.w)
}

/// Rotation state around three axes (in radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Rotate by delta amounts (in radians)
    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }
}

impl Default for RotationState {
    fn default() -> Self {
        Self::zero()
    }
}

/// Placement of a mesh in the world: scale, then rotate X, Y, Z, then translate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTransform {
    pub translation: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub rotation: RotationState,
}

impl ModelTransform {
    pub fn new(translation: Vector3<f32>, scale: Vector3<f32>, rotation: RotationState) -> Self {
        Self {
            translation,
            scale,
            rotation,
        }
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        Transform::compose(&[
            Transform::scale_matrix(self.scale.x, self.scale.y, self.scale.z),
            Transform::rotation_matrix(&self.rotation),
            Transform::translation_matrix(
                self.translation.x,
                self.translation.y,
                self.translation.z,
            ),
        ])
    }
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            translation: Vector3::zeros(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            rotation: RotationState::zero(),
        }
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    pub fn identity() -> Matrix4<f32> {
        Matrix4::identity()
    }

    /// Create a rotation matrix from a rotation state, applying X, then Y, then Z
    pub fn rotation_matrix(rotation: &RotationState) -> Matrix4<f32> {
        Self::compose(&[
            Self::rotation_x(rotation.x),
            Self::rotation_y(rotation.y),
            Self::rotation_z(rotation.z),
        ])
    }

    pub fn rotation_x(angle: f32) -> Matrix4<f32> {
        Rotation3::from_axis_angle(&Vector3::x_axis(), angle).to_homogeneous()
    }

    pub fn rotation_y(angle: f32) -> Matrix4<f32> {
        Rotation3::from_axis_angle(&Vector3::y_axis(), angle).to_homogeneous()
    }

    pub fn rotation_z(angle: f32) -> Matrix4<f32> {
        Rotation3::from_axis_angle(&Vector3::z_axis(), angle).to_homogeneous()
    }

    /// Rotation by `angle` radians around `axis`.
    ///
    /// `axis` must already be unit length; a non-unit axis produces a shear,
    /// not a rotation.
    pub fn rotation_axis(axis: &Vector3<f32>, angle: f32) -> Matrix4<f32> {
        debug_assert!(
            (axis.norm() - 1.0).abs() < 1e-3,
            "rotation axis must be normalized"
        );
        Rotation3::from_axis_angle(&Unit::new_unchecked(*axis), angle).to_homogeneous()
    }

    /// Create a translation matrix
    pub fn translation_matrix(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Create a scale matrix
    pub fn scale_matrix(sx: f32, sy: f32, sz: f32) -> Matrix4<f32> {
        Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz))
    }

    /// Left-handed perspective projection.
    ///
    /// View-space depth `near..far` lands in clip depth `0..1` after the
    /// divide; w carries the view-space z.
    #[rustfmt::skip]
    pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
        let f = 1.0 / (fov / 2.0).tan();
        let depth = far - near;
        Matrix4::new(
            f / aspect, 0.0, 0.0, 0.0,
            0.0, f, 0.0, 0.0,
            0.0, 0.0, far / depth, -near * far / depth,
            0.0, 0.0, 1.0, 0.0,
        )
    }

    /// Map normalized device coordinates onto a `width` x `height` screen.
    ///
    /// x `-1..1` goes to `0..width`, y `-1..1` goes to `height..0` and depth
    /// is left untouched.
    #[rustfmt::skip]
    pub fn viewport(width: f32, height: f32) -> Matrix4<f32> {
        let hw = width / 2.0;
        let hh = height / 2.0;
        Matrix4::new(
            hw, 0.0, 0.0, hw,
            0.0, -hh, 0.0, hh,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Fold a transform chain so that the first matrix is applied first:
    /// `compose(&[a, b, c]) == c * b * a`.
    pub fn compose(chain: &[Matrix4<f32>]) -> Matrix4<f32> {
        chain
            .iter()
            .fold(Self::identity(), |acc, m| m * acc)
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(
        model: &Matrix4<f32>,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
    ) -> Matrix4<f32> {
        Self::compose(&[*model, *view, *projection])
    }
}
