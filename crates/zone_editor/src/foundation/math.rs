//! Math utilities and types
//!
//! Double-precision nalgebra aliases used by every spatial query in the editor.
//! Entity data stores rotation, scale and size as `f32`; they are widened to
//! `f64` at the boundary so intersection tests run in one precision.

pub use nalgebra::{Matrix3, Matrix4, Unit, Vector2, Vector3, Vector4};

/// Scalar type for all spatial computations
pub type Real = f64;

/// 2D vector type
pub type Vec2 = Vector2<Real>;

/// 3D vector type
pub type Vec3 = Vector3<Real>;

/// 4D vector type
pub type Vec4 = Vector4<Real>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<Real>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<Real>;

/// 3D point type
pub type Point3 = nalgebra::Point3<Real>;

/// Quaternion type for rotations
pub type Quat = nalgebra::UnitQuaternion<Real>;

/// Lengths below this are treated as zero when normalizing directions
pub const DEGENERATE_LENGTH: Real = 1.0e-12;

/// Build a quaternion from an axis-angle `[x, y, z, angle]` as stored on entities.
///
/// A zero-length axis yields the identity rotation.
pub fn quat_from_axis_angle(axis_angle: [f32; 4]) -> Quat {
    let axis = Vec3::new(
        Real::from(axis_angle[0]),
        Real::from(axis_angle[1]),
        Real::from(axis_angle[2]),
    );
    Unit::try_new(axis, DEGENERATE_LENGTH).map_or_else(Quat::identity, |axis| {
        Quat::from_axis_angle(&axis, Real::from(axis_angle[3]))
    })
}

/// Convert a quaternion back to the entity axis-angle layout.
#[allow(clippy::cast_possible_truncation)]
pub fn axis_angle_from_quat(rotation: &Quat) -> [f32; 4] {
    rotation.axis_angle().map_or([0.0, 0.0, 1.0, 0.0], |(axis, angle)| {
        [axis.x as f32, axis.y as f32, axis.z as f32, angle as f32]
    })
}

/// Widen an `f32` triple to a vector.
pub fn vec3_from_f32(v: [f32; 3]) -> Vec3 {
    Vec3::new(Real::from(v[0]), Real::from(v[1]), Real::from(v[2]))
}

/// Narrow a vector to an `f32` triple.
#[allow(clippy::cast_possible_truncation)]
pub fn vec3_to_f32(v: &Vec3) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}

/// Normalize a direction, returning `None` for degenerate vectors.
pub fn try_normalize(v: &Vec3) -> Option<Vec3> {
    v.try_normalize(DEGENERATE_LENGTH)
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f64 = std::f64::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f64 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Real};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: Real) -> Real {
        degrees * constants::DEG_TO_RAD
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a right-handed look-at view matrix
    fn look_at(eye: &Point3, target: &Point3, up: &Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn look_at(eye: &Point3, target: &Point3, up: &Vec3) -> Mat4 {
        Mat4::look_at_rh(eye, target, up)
    }
}
