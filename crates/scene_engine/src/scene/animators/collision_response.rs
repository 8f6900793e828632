//! Collision response and gravity
//!
//! Keeps a node from passing through the triangles of a world selector. The
//! node is treated as an ellipsoid; whatever moved it since the last frame
//! (user code, other animators) is taken as the requested movement and run
//! through [`collide_and_slide`]. Gravity accumulates into a falling
//! velocity that resets whenever the node stands on something.

use std::any::Any;
use std::rc::Rc;

use crate::collision::{collide_and_slide, SlideRequest, Triangle};
use crate::foundation::math::Vec3;
use crate::scene::node::NodeId;
use crate::scene::nodes::CameraNode;
use crate::scene::selectors::TriangleSelector;

use super::{Animator, AnimatorContext, AnimatorType};

/// Default gap kept between the ellipsoid and any surface
pub const DEFAULT_SLIDING_SPEED: f32 = 0.0005;

/// Slides its node along the triangles of a world selector
pub struct CollisionResponseAnimator {
    world: Option<Rc<dyn TriangleSelector>>,
    radius: Vec3,
    /// Acceleration in units per second squared
    gravity: Vec3,
    translation: Vec3,
    sliding_speed: f32,
    animate_camera_target: bool,

    target: Option<NodeId>,
    needs_reset: bool,
    last_position: Vec3,
    last_time: Option<u32>,
    /// Units per second
    falling_velocity: Vec3,
    falling: bool,

    collision_occurred: bool,
    collision_point: Option<Vec3>,
    collision_triangle: Option<Triangle>,
    collision_node: Option<NodeId>,
}

impl std::fmt::Debug for CollisionResponseAnimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionResponseAnimator")
            .field("has_world", &self.world.is_some())
            .field("radius", &self.radius)
            .field("gravity", &self.gravity)
            .field("target", &self.target)
            .field("falling", &self.falling)
            .finish_non_exhaustive()
    }
}

impl CollisionResponseAnimator {
    /// Collide with `world` using an ellipsoid of `radius`
    ///
    /// `gravity` is an acceleration per second; `translation` offsets the
    /// ellipsoid centre from the node position.
    pub fn new(world: Option<Rc<dyn TriangleSelector>>, radius: Vec3, gravity: Vec3, translation: Vec3) -> Self {
        Self {
            world,
            radius,
            gravity,
            translation,
            sliding_speed: DEFAULT_SLIDING_SPEED,
            animate_camera_target: true,
            target: None,
            needs_reset: true,
            last_position: Vec3::zeros(),
            last_time: None,
            falling_velocity: Vec3::zeros(),
            falling: false,
            collision_occurred: false,
            collision_point: None,
            collision_triangle: None,
            collision_node: None,
        }
    }

    /// Builder-style sliding speed
    pub fn with_sliding_speed(mut self, sliding_speed: f32) -> Self {
        self.sliding_speed = sliding_speed;
        self
    }

    /// Replace the world selector
    pub fn set_world(&mut self, world: Option<Rc<dyn TriangleSelector>>) {
        self.world = world;
        self.falling = false;
        self.last_time = None;
    }

    /// World selector
    pub fn world(&self) -> Option<&Rc<dyn TriangleSelector>> {
        self.world.as_ref()
    }

    /// Retarget the animator and forget the last known position
    ///
    /// Call after teleporting the node so the jump is not treated as
    /// movement to collide.
    pub fn set_target_node(&mut self, node: NodeId) {
        self.target = Some(node);
        self.needs_reset = true;
    }

    /// Node the animator last ran on
    pub fn target_node(&self) -> Option<NodeId> {
        self.target
    }

    /// Ellipsoid radii
    pub fn ellipsoid_radius(&self) -> Vec3 {
        self.radius
    }

    /// Set the ellipsoid radii
    pub fn set_ellipsoid_radius(&mut self, radius: Vec3) {
        self.radius = radius;
    }

    /// Offset of the ellipsoid centre from the node position
    pub fn ellipsoid_translation(&self) -> Vec3 {
        self.translation
    }

    /// Set the offset of the ellipsoid centre from the node position
    pub fn set_ellipsoid_translation(&mut self, translation: Vec3) {
        self.translation = translation;
    }

    /// Gravity acceleration per second
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Set the gravity acceleration per second
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    /// Distance kept between the ellipsoid and any surface
    pub fn sliding_speed(&self) -> f32 {
        self.sliding_speed
    }

    /// Whether a camera node's target moves along with it
    pub fn set_animate_camera_target(&mut self, enabled: bool) {
        self.animate_camera_target = enabled;
    }

    /// Whether nothing was below the node on the last frame
    pub fn is_falling(&self) -> bool {
        self.falling
    }

    /// Push the node against gravity with `speed` units per second
    pub fn jump(&mut self, speed: f32) {
        if let Some(down) = self.gravity.try_normalize(f32::EPSILON) {
            self.falling_velocity -= down * speed;
            self.falling = true;
        }
    }

    /// Whether the last frame hit anything
    pub fn collision_occurred(&self) -> bool {
        self.collision_occurred
    }

    /// Contact point of the last hit
    pub fn collision_point(&self) -> Option<Vec3> {
        self.collision_point
    }

    /// Triangle of the last hit
    pub fn collision_triangle(&self) -> Option<Triangle> {
        self.collision_triangle
    }

    /// Node owning the triangle of the last hit, when known
    pub fn collision_node(&self) -> Option<NodeId> {
        self.collision_node
    }
}

impl Animator for CollisionResponseAnimator {
    #[allow(clippy::cast_precision_loss)]
    fn animate_node(&mut self, ctx: &mut AnimatorContext<'_>, node: NodeId, time_ms: u32) {
        self.collision_occurred = false;

        let Some(position) = ctx.node(node).map(|n| n.position()) else {
            return;
        };
        if self.target != Some(node) || self.needs_reset {
            self.target = Some(node);
            self.needs_reset = false;
            self.last_position = position;
            self.last_time = Some(time_ms);
        }
        let Some(world) = self.world.clone() else { return };

        let elapsed = self.last_time.map_or(0, |last| time_ms.wrapping_sub(last));
        self.last_time = Some(time_ms);
        let seconds = elapsed as f32 * 0.001;

        let velocity = position - self.last_position;
        self.falling_velocity += self.gravity * seconds;
        let fall = self.falling_velocity * seconds;

        if velocity != Vec3::zeros() || fall != Vec3::zeros() {
            let result = collide_and_slide(
                world.as_ref(),
                ctx.scene(),
                &SlideRequest {
                    position: self.last_position - self.translation,
                    radius: self.radius,
                    velocity,
                    gravity: fall,
                    sliding_speed: self.sliding_speed,
                },
            );

            self.collision_occurred = result.triangle.is_some();
            self.collision_point = result.point;
            self.collision_triangle = result.triangle;
            self.collision_node = result.node;

            self.falling = result.falling;
            if !self.falling {
                self.falling_velocity = Vec3::zeros();
            }

            if let Some(target) = ctx.node_mut(node) {
                target.set_position(result.position + self.translation);
            }
        }

        let Some(target) = ctx.node_mut(node) else { return };
        let final_position = target.position();
        if self.animate_camera_target {
            let shift = final_position - position;
            if let Some(camera) = target.kind_as_mut::<CameraNode>() {
                if shift != Vec3::zeros() {
                    camera.set_target(camera.target() + shift);
                }
            }
        }
        self.last_position = final_position;
    }

    fn animator_type(&self) -> AnimatorType {
        AnimatorType::CollisionResponse
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::Triangle;
    use crate::scene::animators::test_support::{run, scene_with_node};
    use crate::scene::selectors::MeshTriangleSelector;
    use approx::assert_relative_eq;

    fn floor() -> Rc<dyn TriangleSelector> {
        let a = Vec3::new(-100.0, 0.0, -100.0);
        let b = Vec3::new(-100.0, 0.0, 100.0);
        let c = Vec3::new(100.0, 0.0, 100.0);
        let d = Vec3::new(100.0, 0.0, -100.0);
        Rc::new(MeshTriangleSelector::from_triangles(
            vec![Triangle::new(a, b, c), Triangle::new(c, d, a)],
            None,
        ))
    }

    #[test]
    fn test_gravity_settles_on_floor() {
        let (mut scene, node) = scene_with_node();
        scene.get_mut(node).unwrap().set_position(Vec3::new(0.0, 20.0, 0.0));

        let mut animator = CollisionResponseAnimator::new(
            Some(floor()),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, -100.0, 0.0),
            Vec3::zeros(),
        );

        run(&mut animator, &mut scene, node, 0);
        for frame in 1..=100 {
            run(&mut animator, &mut scene, node, frame * 50);
        }

        let y = scene.get(node).unwrap().position().y;
        assert_relative_eq!(y, 1.0, epsilon = 0.01);
        assert!(y >= 1.0 - 1e-3);
        assert!(!animator.is_falling());
    }

    #[test]
    fn test_falls_without_world_geometry_below() {
        let (mut scene, node) = scene_with_node();
        scene.get_mut(node).unwrap().set_position(Vec3::new(500.0, 20.0, 0.0));

        let mut animator = CollisionResponseAnimator::new(
            Some(floor()),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, -10.0, 0.0),
            Vec3::zeros(),
        );
        run(&mut animator, &mut scene, node, 0);
        run(&mut animator, &mut scene, node, 1000);

        assert!(animator.is_falling());
        assert!(scene.get(node).unwrap().position().y < 20.0);
    }

    #[test]
    fn test_jump_needs_gravity() {
        let mut weightless = CollisionResponseAnimator::new(None, Vec3::new(1.0, 1.0, 1.0), Vec3::zeros(), Vec3::zeros());
        weightless.jump(10.0);
        assert!(!weightless.is_falling());

        let mut heavy = CollisionResponseAnimator::new(
            None,
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, -10.0, 0.0),
            Vec3::zeros(),
        );
        heavy.jump(10.0);
        assert!(heavy.is_falling());
    }

    #[test]
    fn test_jump_lifts_node() {
        let (mut scene, node) = scene_with_node();
        scene.get_mut(node).unwrap().set_position(Vec3::new(0.0, 1.001, 0.0));

        let mut animator = CollisionResponseAnimator::new(
            Some(floor()),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, -10.0, 0.0),
            Vec3::zeros(),
        );
        run(&mut animator, &mut scene, node, 0);
        animator.jump(20.0);
        run(&mut animator, &mut scene, node, 100);

        assert!(scene.get(node).unwrap().position().y > 1.5);
        assert!(animator.is_falling());
    }
}
