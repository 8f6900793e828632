//! View frustum used for automatic culling

use crate::foundation::math::{Mat4, Vec3};
use super::aabb::Aabb;

/// Plane defined by normal and distance from origin
///
/// Points with a positive signed distance lie on the inner side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (normalized)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal: normal.normalize(), distance }
    }

    /// Plane from the raw coefficients `a·x + b·y + c·z + d = 0`, normalized
    fn from_coefficients(a: f32, b: f32, c: f32, d: f32) -> Self {
        let normal = Vec3::new(a, b, c);
        let length = normal.magnitude();
        if length > f32::EPSILON {
            Self { normal: normal / length, distance: d / length }
        } else {
            Self { normal: Vec3::zeros(), distance: 0.0 }
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// Index of each frustum plane in [`Frustum::planes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumPlane {
    /// Left clipping plane
    Left = 0,
    /// Right clipping plane
    Right = 1,
    /// Bottom clipping plane
    Bottom = 2,
    /// Top clipping plane
    Top = 3,
    /// Near clipping plane
    Near = 4,
    /// Far clipping plane
    Far = 5,
}

/// Frustum for visibility culling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Six planes in [`FrustumPlane`] order, normals pointing inwards
    pub planes: [Plane; 6],
}

impl Default for Frustum {
    fn default() -> Self {
        Self::from_matrix(&Mat4::identity())
    }
}

impl Frustum {
    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a view-projection matrix
    ///
    /// Gribb-Hartmann extraction for clip-space depth in `[-w, w]`.
    pub fn from_matrix(vp_matrix: &Mat4) -> Self {
        let m = vp_matrix;
        let row = |r: usize| (m[(r, 0)], m[(r, 1)], m[(r, 2)], m[(r, 3)]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let add = |a: (f32, f32, f32, f32), b: (f32, f32, f32, f32)| {
            Plane::from_coefficients(a.0 + b.0, a.1 + b.1, a.2 + b.2, a.3 + b.3)
        };
        let sub = |a: (f32, f32, f32, f32), b: (f32, f32, f32, f32)| {
            Plane::from_coefficients(a.0 - b.0, a.1 - b.1, a.2 - b.2, a.3 - b.3)
        };

        Self {
            planes: [
                add(r3, r0),
                sub(r3, r0),
                add(r3, r1),
                sub(r3, r1),
                add(r3, r2),
                sub(r3, r2),
            ],
        }
    }

    /// Get one plane
    pub fn plane(&self, which: FrustumPlane) -> &Plane {
        &self.planes[which as usize]
    }

    /// Check if a point lies inside the frustum
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|p| p.distance_to_point(point) >= 0.0)
    }

    /// Check if an AABB is inside or intersects the frustum
    ///
    /// Conservative: boxes near a frustum corner may be reported as visible.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            // Corner of the box furthest along the plane normal
            let mut p = aabb.min;
            if plane.normal.x >= 0.0 { p.x = aabb.max.x; }
            if plane.normal.y >= 0.0 { p.y = aabb.max.y; }
            if plane.normal.z >= 0.0 { p.z = aabb.max.z; }

            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4Ext;

    fn camera_frustum() -> Frustum {
        let view = Mat4::look_at(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 1.0, 0.0));
        let projection = Mat4::perspective(60.0_f32.to_radians(), 1.0, 1.0, 100.0);
        Frustum::from_matrix(&(projection * view))
    }

    #[test]
    fn test_point_containment() {
        let frustum = camera_frustum();
        assert!(frustum.contains_point(Vec3::new(0.0, 0.0, -10.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 10.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -200.0)));
        assert!(!frustum.contains_point(Vec3::new(50.0, 0.0, -10.0)));
    }

    #[test]
    fn test_box_culling() {
        let frustum = camera_frustum();
        let ahead = Aabb::from_center_extents(Vec3::new(0.0, 0.0, -20.0), Vec3::new(1.0, 1.0, 1.0));
        let behind = Aabb::from_center_extents(Vec3::new(0.0, 0.0, 20.0), Vec3::new(1.0, 1.0, 1.0));
        let straddling = Aabb::from_center_extents(Vec3::new(0.0, 0.0, 0.0), Vec3::new(5.0, 5.0, 5.0));

        assert!(frustum.intersects_aabb(&ahead));
        assert!(!frustum.intersects_aabb(&behind));
        assert!(frustum.intersects_aabb(&straddling));
    }

    #[test]
    fn test_near_plane_faces_forward() {
        let frustum = camera_frustum();
        let near = frustum.plane(FrustumPlane::Near);
        assert!(near.normal.z < 0.0);
    }
}
