//! # Viewing camera
//!
//! Perspective camera used to turn pointer positions into pick rays and
//! pointer deltas into world-space motion.
//!
//! ## Coordinate System
//! The scene is Z-up and right-handed: floor zones lie in z = 0 and the
//! default camera looks down at the origin from above and behind.

use crate::foundation::math::{utils, Mat4, Mat4Ext, Point3, Real, Vec2, Vec3, Vec4};
use crate::physics::collision::Ray;

/// Half extents of the view frustum cross-section at a given distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewFrustum {
    /// Half the visible width in world units
    pub half_width: Real,
    /// Half the visible height in world units
    pub half_height: Real,
}

impl ViewFrustum {
    /// Map a normalized device delta (`[-1, 1]` per axis) to world units
    pub fn scale_device_delta(&self, dx: Real, dy: Real) -> (Real, Real) {
        (dx * self.half_width, dy * self.half_height)
    }
}

/// 3D perspective camera
///
/// Matrices are computed on demand rather than cached.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Point3,

    /// Point the camera is looking at in world space
    pub target: Point3,

    /// Up vector for camera orientation (typically +Z)
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: Real,

    /// Aspect ratio (width / height)
    pub aspect: Real,

    /// Distance to near clipping plane
    pub near: Real,

    /// Distance to far clipping plane
    pub far: Real,
}

impl Camera {
    /// Create a perspective camera looking at the origin with +Z up
    pub fn perspective(position: Point3, fov_degrees: Real, aspect: Real, near: Real, far: Real) -> Self {
        Self {
            position,
            target: Point3::origin(),
            up: Vec3::z(),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Point3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Update camera target (look-at point)
    pub fn set_target(&mut self, target: Point3) {
        self.target = target;
    }

    /// Update aspect ratio after a viewport resize
    pub fn set_aspect_ratio(&mut self, aspect: Real) {
        if aspect > 0.0 {
            self.aspect = aspect;
        } else {
            log::warn!("Ignoring non-positive aspect ratio {}", aspect);
        }
    }

    /// Distance from position to target
    pub fn distance(&self) -> Real {
        (self.target - self.position).norm()
    }

    /// Unit vector from position toward target
    pub fn forward(&self) -> Option<Vec3> {
        (self.target - self.position).try_normalize(1.0e-12)
    }

    /// Unit vector pointing to the right of the view
    pub fn right(&self) -> Option<Vec3> {
        self.forward()?.cross(&self.up).try_normalize(1.0e-12)
    }

    /// World-to-view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(&self.position, &self.target, &self.up)
    }

    /// Perspective projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    /// Combined `P * V`
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Frustum cross-section at `distance` in front of the camera
    pub fn frustum_at(&self, distance: Real) -> ViewFrustum {
        let half_height = distance * (self.fov * 0.5).tan();
        ViewFrustum {
            half_width: half_height * self.aspect,
            half_height,
        }
    }

    /// Frustum cross-section at the target
    pub fn frustum_at_target(&self) -> ViewFrustum {
        self.frustum_at(self.distance())
    }

    /// World-space ray through normalized device coordinates
    /// (`x` left to right, `y` bottom to top, both in `[-1, 1]`).
    ///
    /// `None` when the camera matrices are singular.
    pub fn screen_to_world_ray(&self, ndc_x: Real, ndc_y: Real) -> Option<Ray> {
        let inverse = self.view_projection_matrix().try_inverse()?;
        let unproject = |z: Real| {
            let h = inverse * Vec4::new(ndc_x, ndc_y, z, 1.0);
            (h.w.abs() > Real::EPSILON).then(|| Point3::new(h.x / h.w, h.y / h.w, h.z / h.w))
        };
        let near = unproject(-1.0)?;
        let far = unproject(1.0)?;
        Ray::new(self.position, far - near)
    }

    /// Project a world point to normalized device coordinates.
    ///
    /// `None` for points on the camera plane.
    pub fn world_to_ndc(&self, point: &Point3) -> Option<Vec2> {
        let clip = self.view_projection_matrix() * point.to_homogeneous();
        (clip.w.abs() > Real::EPSILON).then(|| Vec2::new(clip.x / clip.w, clip.y / clip.w))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, -6.0, 6.0),
            target: Point3::origin(),
            up: Vec3::z(),
            fov: std::f64::consts::FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_center_ray_points_at_target() {
        let camera = Camera::default();
        let ray = camera.screen_to_world_ray(0.0, 0.0).unwrap();
        assert_relative_eq!(ray.direction, camera.forward().unwrap(), epsilon = 1e-9);
        assert_relative_eq!(ray.origin, camera.position, epsilon = 1e-12);
    }

    #[test]
    fn test_top_edge_ray_tilts_up() {
        let camera = Camera::perspective(Point3::new(0.0, -10.0, 0.0), 90.0, 1.0, 0.1, 100.0);
        let ray = camera.screen_to_world_ray(0.0, 1.0).unwrap();
        // 90 degree fov: the top edge is 45 degrees above the view axis.
        assert_relative_eq!(ray.direction.z, ray.direction.y, epsilon = 1e-9);
        assert!(ray.direction.z > 0.0);
    }

    #[test]
    fn test_world_to_ndc_inverts_ray() {
        let camera = Camera::default();
        let ray = camera.screen_to_world_ray(0.25, -0.5).unwrap();
        let ndc = camera.world_to_ndc(&ray.point_at(4.0)).unwrap();
        assert_relative_eq!(ndc, Vec2::new(0.25, -0.5), epsilon = 1e-9);
        assert_relative_eq!(camera.world_to_ndc(&camera.target).unwrap(), Vec2::zeros(), epsilon = 1e-9);
    }

    #[test]
    fn test_frustum_at_distance() {
        let camera = Camera::perspective(Point3::new(0.0, -10.0, 0.0), 90.0, 2.0, 0.1, 100.0);
        let frustum = camera.frustum_at_target();
        assert_relative_eq!(frustum.half_height, 10.0, epsilon = 1e-9);
        assert_relative_eq!(frustum.half_width, 20.0, epsilon = 1e-9);
        let (dx, dy) = frustum.scale_device_delta(0.5, -0.5);
        assert_relative_eq!(dx, 10.0, epsilon = 1e-9);
        assert_relative_eq!(dy, -5.0, epsilon = 1e-9);
    }
}
