//! Math utilities and types
//!
//! Provides fundamental math types for 3D rendering, re-exported from
//! `nalgebra` under short aliases.

pub use nalgebra::{Matrix3, Matrix4, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Convert degrees to radians
#[must_use]
pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees * std::f32::consts::PI / 180.0
}

/// Build a right-handed look-at view matrix from eye position, focus
/// point and up direction.
#[must_use]
pub fn look_at(position: Vec3, focus: Vec3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(&Point3::from(position), &Point3::from(focus), &up)
}

/// Build an off-center perspective frustum projection matrix.
///
/// `near` must be positive and strictly smaller than `far`.
#[must_use]
pub fn frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let mut m = Mat4::zeros();
    m[(0, 0)] = 2.0 * near / (right - left);
    m[(0, 2)] = (right + left) / (right - left);
    m[(1, 1)] = 2.0 * near / (top - bottom);
    m[(1, 2)] = (top + bottom) / (top - bottom);
    m[(2, 2)] = -(far + near) / (far - near);
    m[(2, 3)] = -2.0 * far * near / (far - near);
    m[(3, 2)] = -1.0;
    m
}

/// Build an orthographic projection matrix.
#[must_use]
pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    Mat4::new_orthographic(left, right, bottom, top, near, far)
}

/// Build a rotation matrix around an arbitrary axis, angle in radians.
///
/// A zero axis yields the identity (the rotation is undefined, but callers
/// feed user input here and a no-op beats a NaN-filled matrix).
#[must_use]
pub fn rotation_axis_angle(axis: Vec3, angle_radians: f32) -> Mat4 {
    if axis.norm_squared() <= f32::EPSILON {
        return Mat4::identity();
    }
    let axis = Unit::new_normalize(axis);
    nalgebra::Rotation3::from_axis_angle(&axis, angle_radians).to_homogeneous()
}

/// Transform a point by a homogeneous matrix (translation applies).
#[must_use]
pub fn transform_point(m: &Mat4, p: Vec3) -> Vec3 {
    m.transform_point(&Point3::from(p)).coords
}

/// Transform a direction vector by a homogeneous matrix (translation ignored).
#[must_use]
pub fn transform_vector(m: &Mat4, v: Vec3) -> Vec3 {
    m.transform_vector(&v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn deg_to_rad_right_angle() {
        assert_relative_eq!(deg_to_rad(90.0), std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn rotation_preserves_length() {
        let r = rotation_axis_angle(Vec3::new(0.0, 1.0, 0.0), deg_to_rad(90.0));
        let v = transform_vector(&r, Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(v.z, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn zero_axis_rotation_is_identity() {
        let r = rotation_axis_angle(Vec3::zeros(), 1.0);
        assert_eq!(r, Mat4::identity());
    }

    #[test]
    fn transform_point_applies_translation() {
        let t = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let p = transform_point(&t, Vec3::zeros());
        assert_relative_eq!(p.x, 1.0);
        assert_relative_eq!(p.y, 2.0);
        assert_relative_eq!(p.z, 3.0);
    }
}
