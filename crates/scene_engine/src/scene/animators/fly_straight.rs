//! Straight flight between two points

use std::any::Any;

use crate::foundation::math::Vec3;
use crate::scene::node::NodeId;

use super::{Animator, AnimatorContext, AnimatorType};

/// Moves its node from `start` to `end` over a fixed duration
#[derive(Debug, Clone, PartialEq)]
pub struct FlyStraightAnimator {
    start: Vec3,
    end: Vec3,
    duration_ms: u32,
    start_time: u32,
    looped: bool,
    ping_pong: bool,
    finished: bool,
}

impl FlyStraightAnimator {
    /// Fly from `start` to `end` in `duration_ms`, beginning at `start_time`
    ///
    /// With `looped` the flight restarts from `start` every period; with
    /// `ping_pong` it alternates direction instead.
    pub fn new(start: Vec3, end: Vec3, duration_ms: u32, start_time: u32, looped: bool, ping_pong: bool) -> Self {
        Self {
            start,
            end,
            duration_ms: duration_ms.max(1),
            start_time,
            looped,
            ping_pong,
            finished: false,
        }
    }

    /// Position on the path at `time_ms`, and whether the flight is over
    #[allow(clippy::cast_precision_loss)]
    pub fn position_at(&self, time_ms: u32) -> (Vec3, bool) {
        let elapsed = time_ms.wrapping_sub(self.start_time);
        let duration = self.duration_ms;

        if !self.looped && !self.ping_pong && elapsed >= duration {
            return (self.end, true);
        }
        if !self.looped && self.ping_pong && elapsed >= duration.saturating_mul(2) {
            return (self.start, true);
        }

        let phase = (elapsed % duration) as f32 / duration as f32;
        let travelled = (self.end - self.start) * phase;
        let pong = self.ping_pong && (elapsed / duration) % 2 == 1;
        let position = if pong {
            self.end - travelled
        } else {
            self.start + travelled
        };
        (position, false)
    }
}

impl Animator for FlyStraightAnimator {
    fn animate_node(&mut self, ctx: &mut AnimatorContext<'_>, node: NodeId, time_ms: u32) {
        let (position, finished) = self.position_at(time_ms);
        self.finished = finished;
        if let Some(node) = ctx.node_mut(node) {
            node.set_position(position);
        }
    }

    fn animator_type(&self) -> AnimatorType {
        AnimatorType::FlyStraight
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
