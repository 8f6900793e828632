//! Hermite spline path

use std::any::Any;

use crate::foundation::math::Vec3;
use crate::scene::node::NodeId;

use super::{Animator, AnimatorContext, AnimatorType};

/// Moves its node along a Hermite spline through control points
///
/// Tangents are `(next - previous) * tightness`; 0.5 gives a Catmull-Rom
/// spline. `speed` is in control points per second.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowSplineAnimator {
    points: Vec<Vec3>,
    speed: f32,
    tightness: f32,
    start_time: u32,
    looped: bool,
    ping_pong: bool,
    finished: bool,
}

impl FollowSplineAnimator {
    /// Follow `points` starting at `start_time`, looping back to the first point
    pub fn new(start_time: u32, points: Vec<Vec3>, speed: f32, tightness: f32) -> Self {
        Self {
            points,
            speed,
            tightness,
            start_time,
            looped: true,
            ping_pong: false,
            finished: false,
        }
    }

    /// Builder-style loop and ping-pong flags
    ///
    /// Without looping the node stops at the last point; with ping-pong it
    /// walks the points back and forth.
    pub fn with_looping(mut self, looped: bool, ping_pong: bool) -> Self {
        self.looped = looped;
        self.ping_pong = ping_pong;
        self
    }

    /// Control points
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Position on the spline at `time_ms`, and whether the path is over
    ///
    /// `None` when there are no control points.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn position_at(&self, time_ms: u32) -> Option<(Vec3, bool)> {
        let count = self.points.len();
        match count {
            0 => return None,
            1 => return Some((self.points[0], !self.looped)),
            _ => {}
        }

        let elapsed = time_ms.wrapping_sub(self.start_time) as f32;
        let dt = elapsed * self.speed * 0.001;
        let unwrapped = dt.floor() as i64;
        let size = count as i64;

        if !self.looped && unwrapped >= size - 1 {
            return Some((self.points[count - 1], true));
        }

        let pong = self.ping_pong && (unwrapped / (size - 1)) % 2 == 1;
        let fraction = dt - dt.floor();
        let u = if pong { 1.0 - fraction } else { fraction };
        let index = if pong {
            (size - 2) - unwrapped % (size - 1)
        } else if self.ping_pong {
            unwrapped % (size - 1)
        } else {
            unwrapped % size
        };

        let point = |offset: i64| self.points[wrap_index(index + offset, size)];
        let (p0, p1, p2, p3) = (point(-1), point(0), point(1), point(2));

        let h1 = 2.0 * u * u * u - 3.0 * u * u + 1.0;
        let h2 = -2.0 * u * u * u + 3.0 * u * u;
        let h3 = u * u * u - 2.0 * u * u + u;
        let h4 = u * u * u - u * u;

        let t1 = (p2 - p0) * self.tightness;
        let t2 = (p3 - p1) * self.tightness;

        Some((p1 * h1 + p2 * h2 + t1 * h3 + t2 * h4, false))
    }
}

/// Wrap an index one step past either end of the point list
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn wrap_index(index: i64, size: i64) -> usize {
    let wrapped = if index < 0 {
        size + index
    } else if index >= size {
        index - size
    } else {
        index
    };
    wrapped.clamp(0, size - 1) as usize
}

impl Animator for FollowSplineAnimator {
    fn animate_node(&mut self, ctx: &mut AnimatorContext<'_>, node: NodeId, time_ms: u32) {
        let Some((position, finished)) = self.position_at(time_ms) else {
            self.finished = !self.looped;
            return;
        };
        self.finished = finished;
        if let Some(node) = ctx.node_mut(node) {
            node.set_position(position);
        }
    }

    fn animator_type(&self) -> AnimatorType {
        AnimatorType::FollowSpline
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
