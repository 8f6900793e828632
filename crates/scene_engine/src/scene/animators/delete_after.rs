//! Timed node removal

use std::any::Any;

use crate::scene::node::NodeId;

use super::{Animator, AnimatorContext, AnimatorType};

/// Queues its node for deletion once `finish_time` has passed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAfterAnimator {
    finish_time: u32,
    finished: bool,
}

impl DeleteAfterAnimator {
    /// Delete the node `delay_ms` after `now_ms`
    pub fn new(now_ms: u32, delay_ms: u32) -> Self {
        Self {
            finish_time: now_ms.saturating_add(delay_ms),
            finished: false,
        }
    }

    /// Time after which the node is deleted
    pub fn finish_time(&self) -> u32 {
        self.finish_time
    }
}

impl Animator for DeleteAfterAnimator {
    fn animate_node(&mut self, ctx: &mut AnimatorContext<'_>, node: NodeId, time_ms: u32) {
        if time_ms > self.finish_time {
            self.finished = true;
            ctx.queue_deletion(node);
        }
    }

    fn animator_type(&self) -> AnimatorType {
        AnimatorType::DeleteAfter
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
