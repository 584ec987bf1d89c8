//! Ray and triangle primitives shared by picking and mesh intersection

use crate::foundation::math::{try_normalize, Mat4, Point3, Real, Vec3};

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Point3,
    /// The direction of the ray (unit length)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray, or `None` when the direction has no length
    pub fn new(origin: Point3, direction: Vec3) -> Option<Self> {
        try_normalize(&direction).map(|direction| Self { origin, direction })
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: Real) -> Point3 {
        self.origin + self.direction * t
    }

    /// Distance along the ray to the plane through `point` with `normal`.
    ///
    /// Returns `None` when the ray is parallel to the plane or the plane is
    /// behind the origin.
    pub fn intersect_plane(&self, point: &Point3, normal: &Vec3) -> Option<Real> {
        let denom = normal.dot(&self.direction);
        if denom.abs() < 1.0e-12 {
            return None;
        }
        let t = normal.dot(&(point - self.origin)) / denom;
        (t >= 0.0).then_some(t)
    }
}

/// A triangle for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub v0: Point3,
    /// Second vertex
    pub v1: Point3,
    /// Third vertex
    pub v2: Point3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Point3, v1: Point3, v2: Point3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Unnormalized face normal (right-hand rule); zero for degenerate triangles
    pub fn face_normal(&self) -> Vec3 {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Transform all three vertices
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            v0: matrix.transform_point(&self.v0),
            v1: matrix.transform_point(&self.v1),
            v2: matrix.transform_point(&self.v2),
        }
    }

    /// Möller-Trumbore ray-triangle intersection
    ///
    /// Returns the distance along the ray to the hit, or `None`.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<Real> {
        const EPSILON: Real = 1.0e-12;

        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(&edge2);
        let a = edge1.dot(&h);

        // Ray parallel to triangle
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        (t >= 0.0).then_some(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn floor_triangle() -> Triangle {
        Triangle::new(
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_ray_rejects_zero_direction() {
        assert!(Ray::new(Point3::origin(), Vec3::zeros()).is_none());
    }

    #[test]
    fn test_ray_hits_triangle_from_above() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0)).unwrap();
        let t = floor_triangle().intersect_ray(&ray).unwrap();
        assert_relative_eq!(t, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ray_misses_triangle_outside_edges() {
        let ray = Ray::new(Point3::new(3.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0)).unwrap();
        assert!(floor_triangle().intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_ray_plane_behind_origin() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, 1.0)).unwrap();
        assert!(ray.intersect_plane(&Point3::origin(), &Vec3::z()).is_none());
    }

    #[test]
    fn test_face_normal_winding() {
        assert_relative_eq!(floor_triangle().face_normal().normalize(), Vec3::z(), epsilon = 1e-12);
    }
}
