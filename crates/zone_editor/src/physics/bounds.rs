//! Oriented bounding boxes
//!
//! Boxes keep their world-space centre, three unit axes and half extents
//! baked in after [`OrientedBoundingBox::transform`], so every intersection
//! test runs directly on those values with the separating-axis theorem.
//!
//! With `use_epsilon` the boxes count as intersecting when the gap along
//! every candidate axis is at most the tolerance. Objects resting exactly on
//! each other then register as touching regardless of rounding.

use super::collision::Ray;
use crate::core::config::DEFAULT_COLLISION_EPSILON;
use crate::foundation::math::{Mat4, Point3, Real, Vec3, DEGENERATE_LENGTH};

/// Added to rotation terms so near-parallel edges do not produce a
/// spurious separating axis from their near-zero cross product.
const PARALLEL_SLACK: Real = 1.0e-9;

/// A box with arbitrary position, orientation and extents.
#[derive(Debug, Clone, PartialEq)]
pub struct OrientedBoundingBox {
    center: Point3,
    axes: [Vec3; 3],
    half_extents: Vec3,
    epsilon: Real,
}

impl OrientedBoundingBox {
    /// Creates a box from local extents and a per-axis scale.
    ///
    /// Components with `min > max` are swapped.
    pub fn new(min: Vec3, max: Vec3, scale: Vec3) -> Self {
        let mut lo = min;
        let mut hi = max;
        for i in 0..3 {
            if lo[i] > hi[i] {
                log::warn!("Bounds axis {} has min {} > max {}; swapping", i, lo[i], hi[i]);
                std::mem::swap(&mut lo[i], &mut hi[i]);
            }
        }
        let center = (lo + hi).component_mul(&scale) * 0.5;
        let half_extents = ((hi - lo) * 0.5).component_mul(&scale.abs());
        Self {
            center: Point3::from(center),
            axes: [Vec3::x(), Vec3::y(), Vec3::z()],
            half_extents,
            epsilon: DEFAULT_COLLISION_EPSILON,
        }
    }

    /// Creates a box of full dimensions `size` centred on the origin
    pub fn from_size(size: Vec3, scale: Vec3) -> Self {
        let half = size * 0.5;
        Self::new(-half, half, scale)
    }

    /// Builder pattern: set the tolerance used in epsilon mode
    pub fn with_epsilon(mut self, epsilon: Real) -> Self {
        self.epsilon = epsilon.abs();
        self
    }

    /// Returns the center of the box.
    pub fn center(&self) -> Point3 {
        self.center
    }

    /// Returns the unit axes of the box.
    pub fn axes(&self) -> &[Vec3; 3] {
        &self.axes
    }

    /// Returns the half extents along each axis.
    pub fn half_extents(&self) -> Vec3 {
        self.half_extents
    }

    /// Tolerance used in epsilon mode
    pub fn epsilon(&self) -> Real {
        self.epsilon
    }

    /// Applies an affine matrix to the box in place.
    pub fn transform(&mut self, matrix: &Mat4) {
        self.center = matrix.transform_point(&self.center);
        for i in 0..3 {
            let edge = matrix.transform_vector(&(self.axes[i] * self.half_extents[i]));
            let length = edge.norm();
            if length > DEGENERATE_LENGTH {
                self.axes[i] = edge / length;
                self.half_extents[i] = length;
            } else {
                // Flat box: keep a usable axis direction.
                if let Some(axis) = matrix.transform_vector(&self.axes[i]).try_normalize(DEGENERATE_LENGTH) {
                    self.axes[i] = axis;
                }
                self.half_extents[i] = 0.0;
            }
        }
    }

    /// Returns a copy of the box transformed by `matrix`.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let mut result = self.clone();
        result.transform(matrix);
        result
    }

    /// The eight corners of the box.
    pub fn corners(&self) -> [Point3; 8] {
        let [a, b, c] = self.axes;
        let h = self.half_extents;
        let mut corners = [self.center; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let sx = if i & 1 == 0 { -1.0 } else { 1.0 };
            let sy = if i & 2 == 0 { -1.0 } else { 1.0 };
            let sz = if i & 4 == 0 { -1.0 } else { 1.0 };
            *corner += a * (sx * h.x) + b * (sy * h.y) + c * (sz * h.z);
        }
        corners
    }

    fn tolerance(&self, other_epsilon: Real, use_epsilon: bool) -> Real {
        if use_epsilon {
            self.epsilon.max(other_epsilon)
        } else {
            0.0
        }
    }

    /// Coordinates of a world point in the box frame, relative to the centre
    fn to_local(&self, point: &Point3) -> Vec3 {
        let d = point - self.center;
        Vec3::new(d.dot(&self.axes[0]), d.dot(&self.axes[1]), d.dot(&self.axes[2]))
    }

    /// Separating-axis test against another box (15 axes).
    pub fn intersects(&self, other: &Self, use_epsilon: bool) -> bool {
        let tol = self.tolerance(other.epsilon, use_epsilon);
        let a = &self.half_extents;
        let b = &other.half_extents;

        let mut r = [[0.0; 3]; 3];
        let mut abs_r = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                r[i][j] = self.axes[i].dot(&other.axes[j]);
                abs_r[i][j] = r[i][j].abs() + PARALLEL_SLACK;
            }
        }
        let t = self.to_local(&other.center);

        // Face axes of self
        for i in 0..3 {
            let rb = b[0] * abs_r[i][0] + b[1] * abs_r[i][1] + b[2] * abs_r[i][2];
            if t[i].abs() > a[i] + rb + tol {
                return false;
            }
        }

        // Face axes of other
        for j in 0..3 {
            let ra = a[0] * abs_r[0][j] + a[1] * abs_r[1][j] + a[2] * abs_r[2][j];
            let dist = t[0] * r[0][j] + t[1] * r[1][j] + t[2] * r[2][j];
            if dist.abs() > ra + b[j] + tol {
                return false;
            }
        }

        // Edge cross products
        for i in 0..3 {
            let (i1, i2) = ((i + 1) % 3, (i + 2) % 3);
            for j in 0..3 {
                let (j1, j2) = ((j + 1) % 3, (j + 2) % 3);
                let ra = a[i1] * abs_r[i2][j] + a[i2] * abs_r[i1][j];
                let rb = b[j1] * abs_r[i][j2] + b[j2] * abs_r[i][j1];
                let dist = t[i2] * r[i1][j] - t[i1] * r[i2][j];
                let axis_length = (1.0 - r[i][j] * r[i][j]).max(0.0).sqrt();
                if dist.abs() > ra + rb + tol * axis_length {
                    return false;
                }
            }
        }

        true
    }

    /// Separating-axis test against a single triangle (13 axes).
    pub fn intersects_triangle(&self, p0: &Point3, p1: &Point3, p2: &Point3, use_epsilon: bool) -> bool {
        let tol = self.tolerance(self.epsilon, use_epsilon);
        let h = &self.half_extents;
        let v = [self.to_local(p0), self.to_local(p1), self.to_local(p2)];

        // Box face axes
        for i in 0..3 {
            let min = v[0][i].min(v[1][i]).min(v[2][i]);
            let max = v[0][i].max(v[1][i]).max(v[2][i]);
            if min > h[i] + tol || max < -h[i] - tol {
                return false;
            }
        }

        let edges = [v[1] - v[0], v[2] - v[1], v[0] - v[2]];
        let separated_on = |axis: &Vec3| {
            let length = axis.norm();
            if length <= DEGENERATE_LENGTH {
                return false;
            }
            let d = [axis.dot(&v[0]), axis.dot(&v[1]), axis.dot(&v[2])];
            let min = d[0].min(d[1]).min(d[2]);
            let max = d[0].max(d[1]).max(d[2]);
            let radius = h.x * axis.x.abs() + h.y * axis.y.abs() + h.z * axis.z.abs();
            min > radius + tol * length || max < -radius - tol * length
        };

        // Triangle normal
        if separated_on(&edges[0].cross(&edges[1])) {
            return false;
        }

        // Box axes crossed with triangle edges
        let basis = [Vec3::x(), Vec3::y(), Vec3::z()];
        for unit in &basis {
            for edge in &edges {
                if separated_on(&unit.cross(edge)) {
                    return false;
                }
            }
        }

        true
    }

    /// Slab test; distance along the ray to the entry point, or `0` when the
    /// origin is inside the box.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<Real> {
        let origin = self.to_local(&ray.origin);
        let direction = Vec3::new(
            ray.direction.dot(&self.axes[0]),
            ray.direction.dot(&self.axes[1]),
            ray.direction.dot(&self.axes[2]),
        );

        let mut t_min = Real::NEG_INFINITY;
        let mut t_max = Real::INFINITY;
        for i in 0..3 {
            let h = self.half_extents[i];
            if direction[i].abs() < DEGENERATE_LENGTH {
                if origin[i].abs() > h {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction[i];
            let mut t1 = (-h - origin[i]) * inv;
            let mut t2 = (h - origin[i]) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }

        if t_max < 0.0 {
            return None;
        }
        Some(t_min.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;

    fn unit_box_at(x: f64, y: f64, z: f64) -> OrientedBoundingBox {
        OrientedBoundingBox::from_size(Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 1.0, 1.0))
            .transformed(&Mat4::new_translation(&Vec3::new(x, y, z)))
    }

    fn rotated_z(angle: f64) -> Mat4 {
        Quat::from_axis_angle(&Vec3::z_axis(), angle).to_homogeneous()
    }

    #[test]
    fn test_new_swaps_inverted_extents() {
        let b = OrientedBoundingBox::new(Vec3::new(1.0, -1.0, 0.0), Vec3::new(-1.0, 1.0, 2.0), Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(b.half_extents(), Vec3::new(1.0, 1.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(b.center(), Point3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_self_intersection() {
        let boxes = [
            unit_box_at(0.0, 0.0, 0.0),
            unit_box_at(3.0, -2.0, 1.0).transformed(&rotated_z(0.7)),
            OrientedBoundingBox::from_size(Vec3::new(0.0, 2.0, 1.0), Vec3::new(1.0, 1.0, 1.0)),
        ];
        for b in &boxes {
            assert!(b.intersects(b, false));
        }
    }

    #[test]
    fn test_symmetry() {
        let boxes = [
            unit_box_at(0.0, 0.0, 0.0),
            unit_box_at(0.9, 0.0, 0.0),
            unit_box_at(1.0 + 5e-5, 0.0, 0.0),
            unit_box_at(1.2, 1.2, 0.0).transformed(&rotated_z(std::f64::consts::FRAC_PI_4)),
            unit_box_at(0.0, 0.0, 3.0),
        ];
        for a in &boxes {
            for b in &boxes {
                for eps in [false, true] {
                    assert_eq!(a.intersects(b, eps), b.intersects(a, eps));
                }
            }
        }
    }

    #[test]
    fn test_epsilon_band() {
        let a = unit_box_at(0.0, 0.0, 0.0);
        let eps = a.epsilon();

        let within = unit_box_at(1.0 + eps * 0.5, 0.0, 0.0);
        assert!(within.intersects(&a, true));
        assert!(!within.intersects(&a, false));

        let beyond = unit_box_at(1.0 + eps * 2.0, 0.0, 0.0);
        assert!(!beyond.intersects(&a, true));
        assert!(!beyond.intersects(&a, false));
    }

    #[test]
    fn test_rotated_box_separated_where_aabbs_overlap() {
        let a = unit_box_at(0.0, 0.0, 0.0);
        let b = OrientedBoundingBox::from_size(Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 1.0, 1.0))
            .transformed(&(Mat4::new_translation(&Vec3::new(1.2, 1.2, 0.0)) * rotated_z(std::f64::consts::FRAC_PI_4)));
        assert!(!a.intersects(&b, false));
        assert!(!a.intersects(&b, true));
    }

    #[test]
    fn test_scale_applies_to_extents() {
        let b = OrientedBoundingBox::from_size(Vec3::new(1.0, 1.0, 1.0), Vec3::new(2.0, 1.0, 1.0))
            .transformed(&Mat4::new_scaling(3.0));
        assert_relative_eq!(b.half_extents(), Vec3::new(3.0, 1.5, 1.5), epsilon = 1e-12);
    }

    #[test]
    fn test_triangle_crossing_box() {
        let b = unit_box_at(0.0, 0.0, 0.0);
        let hit = b.intersects_triangle(
            &Point3::new(-2.0, -2.0, 0.0),
            &Point3::new(2.0, -2.0, 0.0),
            &Point3::new(0.0, 2.0, 0.0),
            false,
        );
        assert!(hit);
    }

    #[test]
    fn test_triangle_beside_box() {
        let b = unit_box_at(0.0, 0.0, 0.0);
        // Diagonal triangle near a corner; only its normal separates it.
        let hit = b.intersects_triangle(
            &Point3::new(1.2, 0.0, -1.0),
            &Point3::new(0.0, 1.2, -1.0),
            &Point3::new(0.6, 0.6, 1.0),
            false,
        );
        assert!(!hit);
    }

    #[test]
    fn test_triangle_within_epsilon_of_face() {
        let b = unit_box_at(0.0, 0.0, 0.0);
        let z = 0.5 + b.epsilon() * 0.5;
        let (p0, p1, p2) = (
            Point3::new(-1.0, -1.0, z),
            Point3::new(1.0, -1.0, z),
            Point3::new(0.0, 1.0, z),
        );
        assert!(b.intersects_triangle(&p0, &p1, &p2, true));
        assert!(!b.intersects_triangle(&p0, &p1, &p2, false));
    }

    #[test]
    fn test_ray_slab() {
        let b = unit_box_at(0.0, 0.0, 0.0);
        let ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vec3::x()).unwrap();
        assert_relative_eq!(b.intersect_ray(&ray).unwrap(), 4.5, epsilon = 1e-12);

        let miss = Ray::new(Point3::new(-5.0, 2.0, 0.0), Vec3::x()).unwrap();
        assert!(b.intersect_ray(&miss).is_none());

        let inside = Ray::new(Point3::origin(), Vec3::y()).unwrap();
        assert_relative_eq!(b.intersect_ray(&inside).unwrap(), 0.0);

        let behind = Ray::new(Point3::new(5.0, 0.0, 0.0), Vec3::x()).unwrap();
        assert!(b.intersect_ray(&behind).is_none());
    }

    #[test]
    fn test_corners_span_extents() {
        let b = unit_box_at(1.0, 0.0, 0.0);
        let corners = b.corners();
        let max_x = corners.iter().map(|c| c.x).fold(f64::MIN, f64::max);
        assert_relative_eq!(max_x, 1.5, epsilon = 1e-12);
    }
}
