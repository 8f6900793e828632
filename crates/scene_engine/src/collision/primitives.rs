//! Primitive collision shapes and intersection algorithms
//!
//! Provides rays and triangles with the intersection tests used by picking,
//! triangle selectors and the collision response animator.

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::scene::{Aabb, NodeId};

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Ray from `start` through `end`
    pub fn from_points(start: Vec3, end: Vec3) -> Self {
        Self::new(start, end - start)
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Result of a ray query against scene nodes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The node that was hit
    pub node: NodeId,
    /// The distance from the ray origin to the hit point
    pub distance: f32,
    /// The point of intersection in world space
    pub point: Vec3,
}

/// Result of a ray query against triangles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// The triangle that was hit
    pub triangle: Triangle,
    /// The distance from the ray origin to the hit point
    pub distance: f32,
    /// The point of intersection in world space
    pub point: Vec3,
    /// The node owning the triangle, when the selector knows it
    pub node: Option<NodeId>,
}

/// A triangle for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Calculates the normal of the triangle (right-hand rule)
    pub fn normal(&self) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        edge1.cross(&edge2).normalize()
    }

    /// Calculates the centroid (center point) of the triangle
    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Whether the triangle has (near) zero area
    pub fn is_degenerate(&self) -> bool {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0)).magnitude_squared() < f32::EPSILON
    }

    /// Whether the front face points against `direction`
    pub fn is_front_facing(&self, direction: Vec3) -> bool {
        self.normal().dot(&direction) <= 0.0
    }

    /// Signed distance from the triangle plane to a point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        let normal = self.normal();
        let v0_to_point = point - self.v0;
        normal.dot(&v0_to_point)
    }

    /// Bounding box of the three vertices
    pub fn bounding_box(&self) -> Aabb {
        let mut aabb = Aabb::from_point(self.v0);
        aabb.add_point(self.v1);
        aabb.add_point(self.v2);
        aabb
    }

    /// Triangle with every vertex transformed by `matrix`
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            v0: matrix.transform_point3(self.v0),
            v1: matrix.transform_point3(self.v1),
            v2: matrix.transform_point3(self.v2),
        }
    }

    /// Whether a point on the triangle plane lies inside the triangle
    pub fn is_point_inside(&self, point: Vec3) -> bool {
        const TOLERANCE: f32 = 1e-5;
        let Some((u, v)) = self.barycentric(point) else {
            return false;
        };
        u >= -TOLERANCE && v >= -TOLERANCE && u + v <= 1.0 + TOLERANCE
    }

    /// Barycentric coordinates of `point` relative to `v1` and `v2`
    fn barycentric(&self, point: Vec3) -> Option<(f32, f32)> {
        let e0 = self.v1 - self.v0;
        let e1 = self.v2 - self.v0;
        let p = point - self.v0;

        let d00 = e0.dot(&e0);
        let d01 = e0.dot(&e1);
        let d11 = e1.dot(&e1);
        let d20 = p.dot(&e0);
        let d21 = p.dot(&e1);

        let denom = d00 * d11 - d01 * d01;
        if denom.abs() < f32::EPSILON {
            return None;
        }
        let u = (d11 * d20 - d01 * d21) / denom;
        let v = (d00 * d21 - d01 * d20) / denom;
        Some((u, v))
    }

    /// Möller-Trumbore ray-triangle intersection algorithm
    /// Returns (t, u, v) barycentric coordinates if hit, None otherwise
    ///
    /// See: "Fast, Minimum Storage Ray/Triangle Intersection" by Möller & Trumbore
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32, f32)> {
        const EPSILON: f32 = 0.000_001;

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
        (t >= 0.0).then_some((t, u, v))
    }

    /// Get the closest point on the triangle to a given point
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        let v0_to_point = point - self.v0;

        let d1 = edge1.dot(&v0_to_point);
        let d2 = edge2.dot(&v0_to_point);

        // Vertex region outside v0
        if d1 <= 0.0 && d2 <= 0.0 {
            return self.v0;
        }

        // Vertex region outside v1
        let v1_to_point = point - self.v1;
        let d3 = edge1.dot(&v1_to_point);
        let d4 = edge2.dot(&v1_to_point);
        if d3 >= 0.0 && d4 <= d3 {
            return self.v1;
        }

        // Vertex region outside v2
        let v2_to_point = point - self.v2;
        let d5 = edge1.dot(&v2_to_point);
        let d6 = edge2.dot(&v2_to_point);
        if d6 >= 0.0 && d5 <= d6 {
            return self.v2;
        }

        // Edge regions
        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v_val = d1 / (d1 - d3);
            return self.v0 + edge1 * v_val;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return self.v0 + edge2 * w;
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return self.v1 + (self.v2 - self.v1) * w;
        }

        // Inside the triangle
        let denom = 1.0 / (va + vb + vc);
        let v_val = vb * denom;
        let w = vc * denom;
        self.v0 + edge1 * v_val + edge2 * w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ground() -> Triangle {
        Triangle::new(
            Vec3::new(-10.0, 0.0, -10.0),
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(10.0, 0.0, -10.0),
        )
    }

    #[test]
    fn test_ray_triangle_intersection() {
        let triangle = ground();
        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let (t, _, _) = triangle.intersect_ray(&ray).unwrap();
        assert_relative_eq!(t, 5.0);

        let miss = Ray::new(Vec3::new(50.0, 5.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        assert!(triangle.intersect_ray(&miss).is_none());

        let away = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        assert!(triangle.intersect_ray(&away).is_none());
    }

    #[test]
    fn test_normal_and_facing() {
        let triangle = ground();
        assert_relative_eq!(triangle.normal(), Vec3::new(0.0, 1.0, 0.0));
        assert!(triangle.is_front_facing(Vec3::new(0.0, -1.0, 0.0)));
        assert!(!triangle.is_front_facing(Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_point_inside() {
        let triangle = ground();
        assert!(triangle.is_point_inside(Vec3::new(0.0, 0.0, 0.0)));
        assert!(!triangle.is_point_inside(Vec3::new(9.0, 0.0, 9.0)));
    }

    #[test]
    fn test_closest_point_regions() {
        let triangle = ground();
        assert_relative_eq!(triangle.closest_point(Vec3::new(0.0, 3.0, 0.0)), Vec3::zeros());
        assert_relative_eq!(
            triangle.closest_point(Vec3::new(-20.0, 0.0, -20.0)),
            Vec3::new(-10.0, 0.0, -10.0)
        );
    }
}
