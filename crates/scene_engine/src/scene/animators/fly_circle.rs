//! Circular flight path

use std::any::Any;

use crate::foundation::math::Vec3;
use crate::scene::node::NodeId;

use super::{Animator, AnimatorContext, AnimatorType};

/// Moves its node around a circle (or ellipse) in the plane normal to `direction`
#[derive(Debug, Clone, PartialEq)]
pub struct FlyCircleAnimator {
    center: Vec3,
    direction: Vec3,
    radius: f32,
    radius_ellipsoid: f32,
    /// Radians per millisecond
    speed: f32,
    start_time: u32,
    axis_u: Vec3,
    axis_v: Vec3,
}

impl FlyCircleAnimator {
    /// Circle of `radius` around `center`; `speed` is in radians per millisecond
    pub fn new(start_time: u32, center: Vec3, radius: f32, speed: f32, direction: Vec3) -> Self {
        let mut animator = Self {
            center,
            direction: Vec3::new(0.0, 1.0, 0.0),
            radius,
            radius_ellipsoid: radius,
            speed,
            start_time,
            axis_u: Vec3::zeros(),
            axis_v: Vec3::zeros(),
        };
        animator.set_direction(direction);
        animator
    }

    /// Builder-style second radius, turning the circle into an ellipse
    pub fn with_ellipsoid_radius(mut self, radius_ellipsoid: f32) -> Self {
        self.radius_ellipsoid = radius_ellipsoid;
        self
    }

    /// Set the plane normal; a zero vector keeps the current one
    pub fn set_direction(&mut self, direction: Vec3) {
        let Some(direction) = direction.try_normalize(f32::EPSILON) else { return };
        self.direction = direction;

        // Any helper vector not parallel to the normal spans the plane
        let helper = if direction.y == 0.0 {
            Vec3::new(0.0, 50.0, 0.0)
        } else {
            Vec3::new(50.0, 0.0, 0.0)
        };
        self.axis_v = helper.cross(&direction).normalize();
        self.axis_u = self.axis_v.cross(&direction).normalize();
    }

    /// Plane normal
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Position on the path at `time_ms`
    #[allow(clippy::cast_precision_loss)]
    pub fn position_at(&self, time_ms: u32) -> Vec3 {
        let t = time_ms.wrapping_sub(self.start_time) as f32 * self.speed;
        self.center + self.axis_u * (self.radius_ellipsoid * t.sin()) + self.axis_v * (self.radius * t.cos())
    }
}

impl Animator for FlyCircleAnimator {
    fn animate_node(&mut self, ctx: &mut AnimatorContext<'_>, node: NodeId, time_ms: u32) {
        let position = self.position_at(time_ms);
        if let Some(node) = ctx.node_mut(node) {
            node.set_position(position);
        }
    }

    fn animator_type(&self) -> AnimatorType {
        AnimatorType::FlyCircle
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
