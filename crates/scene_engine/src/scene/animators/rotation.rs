//! Constant rotation

use std::any::Any;

use crate::foundation::math::{utils, Vec3};
use crate::scene::node::NodeId;

use super::{Animator, AnimatorContext, AnimatorType};

/// Rotates its node by a fixed Euler rate
#[derive(Debug, Clone, PartialEq)]
pub struct RotationAnimator {
    /// Degrees per second around each axis
    rotation_per_second: Vec3,
    last_time: Option<u32>,
}

impl RotationAnimator {
    /// Rotate by `rotation_per_second` degrees, starting at the first frame it sees
    pub fn new(rotation_per_second: Vec3) -> Self {
        Self {
            rotation_per_second,
            last_time: None,
        }
    }

    /// Rotate starting at an explicit time
    pub fn with_start_time(rotation_per_second: Vec3, start_ms: u32) -> Self {
        Self {
            rotation_per_second,
            last_time: Some(start_ms),
        }
    }

    /// Rotation rate in degrees per second
    pub fn rotation_per_second(&self) -> Vec3 {
        self.rotation_per_second
    }
}

impl Animator for RotationAnimator {
    fn animate_node(&mut self, ctx: &mut AnimatorContext<'_>, node: NodeId, time_ms: u32) {
        let Some(last) = self.last_time else {
            self.last_time = Some(time_ms);
            return;
        };

        let elapsed = time_ms.wrapping_sub(last);
        if elapsed == 0 {
            return;
        }
        let Some(node) = ctx.node_mut(node) else { return };

        #[allow(clippy::cast_precision_loss)]
        let delta = self.rotation_per_second * (elapsed as f32 / 1000.0);
        let rotation = (node.rotation() + delta).map(utils::wrap_degrees);
        node.set_rotation(rotation);
        self.last_time = Some(time_ms);
    }

    fn animator_type(&self) -> AnimatorType {
        AnimatorType::Rotation
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
