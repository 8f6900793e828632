//! Swept-ellipsoid collide and slide
//!
//! Moves an ellipsoid through the triangles of a [`TriangleSelector`],
//! sliding along whatever it touches. Work happens in "ellipsoid space",
//! where the ellipsoid is a unit sphere: triangles are fetched already
//! scaled by the inverse radius.
//!
//! This is a discrete approximation. A velocity longer than the geometry
//! is thick can tunnel through it.
//!
//! See: "Improved Collision detection and Response" by Kasper Fauerby

use crate::foundation::math::{Mat4, Vec3};
use crate::scene::selectors::{TriangleQuery, TriangleSelector};
use crate::scene::{Aabb, NodeId, SceneGraph};

use super::primitives::Triangle;

/// Slide iterations before giving up
const MAX_RECURSION_DEPTH: u32 = 5;

/// One collide-and-slide request, in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideRequest {
    /// Ellipsoid centre before moving
    pub position: Vec3,
    /// Ellipsoid radii
    pub radius: Vec3,
    /// Requested movement
    pub velocity: Vec3,
    /// Extra movement applied in a second pass to detect falling
    pub gravity: Vec3,
    /// Distance kept between the ellipsoid and any surface
    pub sliding_speed: f32,
}

/// Outcome of a collide-and-slide request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideResult {
    /// Final ellipsoid centre
    pub position: Vec3,
    /// Whether the gravity pass touched nothing
    pub falling: bool,
    /// Nearest triangle hit in the last pass, in world space
    pub triangle: Option<Triangle>,
    /// Contact point on that triangle, in world space
    pub point: Option<Vec3>,
    /// Node owning the hit triangle, when the selector knows it
    pub node: Option<NodeId>,
}

/// Per-request collision state, all vectors in ellipsoid space
struct CollisionPacket<'a> {
    selector: &'a dyn TriangleSelector,
    scene: &'a SceneGraph,
    radius: Vec3,
    world_position: Vec3,
    world_velocity: Vec3,
    sliding_speed: f32,

    velocity: Vec3,
    normalized_velocity: Vec3,
    base_point: Vec3,
    found_collision: bool,
    nearest_distance: f32,
    intersection_point: Vec3,
    intersection_triangle: Option<(Triangle, Option<NodeId>)>,
    triangle_hits: usize,
    triangles: Vec<(Triangle, Option<NodeId>)>,
}

/// Move an ellipsoid through the selector's triangles
///
/// The ellipsoid slides along surfaces it hits. When `gravity` is non-zero
/// a second pass moves it by `gravity` from the slide result and reports
/// whether it fell freely.
pub fn collide_and_slide(
    selector: &dyn TriangleSelector,
    scene: &SceneGraph,
    request: &SlideRequest,
) -> SlideResult {
    let radius = request.radius;
    let mut packet = CollisionPacket {
        selector,
        scene,
        radius,
        world_position: request.position,
        world_velocity: request.velocity,
        sliding_speed: request.sliding_speed,
        velocity: Vec3::zeros(),
        normalized_velocity: Vec3::zeros(),
        base_point: Vec3::zeros(),
        found_collision: false,
        nearest_distance: f32::MAX,
        intersection_point: Vec3::zeros(),
        intersection_triangle: None,
        triangle_hits: 0,
        triangles: Vec::new(),
    };

    let mut position = packet.collide_with_world(
        0,
        request.position.component_div(&radius),
        request.velocity.component_div(&radius),
    );

    let mut falling = false;
    if request.gravity != Vec3::zeros() {
        packet.world_position = position.component_mul(&radius);
        packet.world_velocity = request.gravity;
        packet.triangle_hits = 0;
        position = packet.collide_with_world(0, position, request.gravity.component_div(&radius));
        falling = packet.triangle_hits == 0;
    }

    let (triangle, point, node) = match packet.intersection_triangle {
        Some((triangle, node)) if packet.triangle_hits > 0 => {
            let scale = Mat4::new_nonuniform_scaling(&radius);
            (
                Some(triangle.transformed(&scale)),
                Some(packet.intersection_point.component_mul(&radius)),
                node,
            )
        }
        _ => (None, None, None),
    };

    SlideResult {
        position: position.component_mul(&radius),
        falling,
        triangle,
        point,
        node,
    }
}

impl CollisionPacket<'_> {
    fn collide_with_world(&mut self, depth: u32, position: Vec3, velocity: Vec3) -> Vec3 {
        let very_close_distance = self.sliding_speed;
        if depth > MAX_RECURSION_DEPTH {
            return position;
        }

        self.velocity = velocity;
        self.normalized_velocity = velocity.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros);
        self.base_point = position;
        self.found_collision = false;
        self.nearest_distance = f32::MAX;

        self.fetch_triangles();
        let triangles = std::mem::take(&mut self.triangles);
        for (triangle, node) in &triangles {
            self.test_triangle(triangle, *node);
        }
        self.triangles = triangles;

        if !self.found_collision {
            return position + velocity;
        }

        let destination = position + velocity;
        let mut new_base_point = position;

        if self.nearest_distance >= very_close_distance {
            let direction = velocity.normalize();
            new_base_point = self.base_point + direction * (self.nearest_distance - very_close_distance);
            self.intersection_point -= direction * very_close_distance;
        }

        let slide_origin = self.intersection_point;
        let Some(slide_normal) = (new_base_point - slide_origin).try_normalize(f32::EPSILON) else {
            return new_base_point;
        };
        let distance_to_plane = slide_normal.dot(&(destination - slide_origin));
        let new_destination = destination - slide_normal * distance_to_plane;
        let new_velocity = new_destination - slide_origin;

        if new_velocity.magnitude() < very_close_distance {
            return new_base_point;
        }

        self.collide_with_world(depth + 1, new_base_point, new_velocity)
    }

    /// Triangles around the whole world-space sweep, scaled into ellipsoid space
    fn fetch_triangles(&mut self) {
        let mut bounds = Aabb::from_point(self.world_position);
        bounds.add_point(self.world_position + self.world_velocity);
        bounds.min -= self.radius;
        bounds.max += self.radius;

        let inverse_radius = Vec3::new(1.0 / self.radius.x, 1.0 / self.radius.y, 1.0 / self.radius.z);
        let query = TriangleQuery::in_box(bounds).with_transform(Mat4::new_nonuniform_scaling(&inverse_radius));

        self.triangles.clear();
        self.selector.get_triangles_with_owner(self.scene, &query, &mut self.triangles);
    }

    fn test_triangle(&mut self, triangle: &Triangle, node: Option<NodeId>) {
        if triangle.is_degenerate() || !triangle.is_front_facing(self.normalized_velocity) {
            return;
        }

        let normal = triangle.normal();
        let signed_distance = triangle.distance_to_point(self.base_point);
        let normal_dot_velocity = normal.dot(&self.velocity);

        // Start of the sweep interval during which the sphere touches the plane
        let embedded_in_plane = normal_dot_velocity.abs() < f32::EPSILON;
        let t0 = if embedded_in_plane {
            if signed_distance.abs() >= 1.0 {
                return;
            }
            0.0
        } else {
            let reciprocal = 1.0 / normal_dot_velocity;
            let mut t0 = (-1.0 - signed_distance) * reciprocal;
            let mut t1 = (1.0 - signed_distance) * reciprocal;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t0 > 1.0 || t1 < 0.0 {
                return;
            }
            t0.clamp(0.0, 1.0)
        };

        let mut collision_point = Vec3::zeros();
        let mut found = false;
        let mut t = 1.0;

        // Inside the triangle
        if !embedded_in_plane {
            let plane_point = self.base_point - normal + self.velocity * t0;
            if triangle.is_point_inside(plane_point) {
                found = true;
                t = t0;
                collision_point = plane_point;
            }
        }

        if !found {
            let velocity = self.velocity;
            let base = self.base_point;
            let velocity_sq = velocity.magnitude_squared();

            // Vertices
            for p in [triangle.v0, triangle.v1, triangle.v2] {
                let b = 2.0 * velocity.dot(&(base - p));
                let c = (p - base).magnitude_squared() - 1.0;
                if let Some(root) = lowest_root(velocity_sq, b, c, t) {
                    t = root;
                    found = true;
                    collision_point = p;
                }
            }

            // Edges
            for (p1, p2) in [
                (triangle.v0, triangle.v1),
                (triangle.v1, triangle.v2),
                (triangle.v2, triangle.v0),
            ] {
                let edge = p2 - p1;
                let base_to_vertex = p1 - base;
                let edge_sq = edge.magnitude_squared();
                let edge_dot_velocity = edge.dot(&velocity);
                let edge_dot_base_to_vertex = edge.dot(&base_to_vertex);

                let a = edge_sq * -velocity_sq + edge_dot_velocity * edge_dot_velocity;
                let b = edge_sq * (2.0 * velocity.dot(&base_to_vertex))
                    - 2.0 * edge_dot_velocity * edge_dot_base_to_vertex;
                let c = edge_sq * (1.0 - base_to_vertex.magnitude_squared())
                    + edge_dot_base_to_vertex * edge_dot_base_to_vertex;

                if let Some(root) = lowest_root(a, b, c, t) {
                    let f = (edge_dot_velocity * root - edge_dot_base_to_vertex) / edge_sq;
                    if (0.0..=1.0).contains(&f) {
                        t = root;
                        found = true;
                        collision_point = p1 + edge * f;
                    }
                }
            }
        }

        if !found {
            return;
        }

        let distance = t * self.velocity.magnitude();
        if !self.found_collision || distance < self.nearest_distance {
            self.nearest_distance = distance;
            self.intersection_point = collision_point;
            self.intersection_triangle = Some((*triangle, node));
            self.found_collision = true;
            self.triangle_hits += 1;
        }
    }
}

/// Smallest root of `a·x² + b·x + c` in `(0, max)`
fn lowest_root(a: f32, b: f32, c: f32, max: f32) -> Option<f32> {
    let determinant = b * b - 4.0 * a * c;
    if determinant < 0.0 || a == 0.0 {
        return None;
    }

    let sqrt_d = determinant.sqrt();
    let mut r1 = (-b - sqrt_d) / (2.0 * a);
    let mut r2 = (-b + sqrt_d) / (2.0 * a);
    if r1 > r2 {
        std::mem::swap(&mut r1, &mut r2);
    }

    if r1 > 0.0 && r1 < max {
        return Some(r1);
    }
    if r2 > 0.0 && r2 < max {
        return Some(r2);
    }
    None
}
