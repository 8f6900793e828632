//! Scene node animators
//!
//! An [`Animator`] is attached to exactly one node and mutates it once per
//! frame, before transforms are propagated and nodes are registered. The
//! scene manager takes a node's animators out while running them, so an
//! animator can freely read and write any node through its
//! [`AnimatorContext`], including the one it is attached to.
//!
//! Animators cannot change the tree structure. Removal goes through the
//! deletion queue, which the scene manager drains after the frame is drawn.

mod collision_response;
mod delete_after;
mod fly_circle;
mod fly_straight;
mod follow_spline;
mod rotation;

pub use collision_response::CollisionResponseAnimator;
pub use delete_after::DeleteAfterAnimator;
pub use fly_circle::FlyCircleAnimator;
pub use fly_straight::FlyStraightAnimator;
pub use follow_spline::FollowSplineAnimator;
pub use rotation::RotationAnimator;

use std::any::Any;

use super::graph::SceneGraph;
use super::node::{NodeId, SceneNode};

/// Type tag of an animator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimatorType {
    /// Constant rotation
    Rotation,
    /// Circular path
    FlyCircle,
    /// Straight path between two points
    FlyStraight,
    /// Hermite spline through control points
    FollowSpline,
    /// Queues its node for deletion after a delay
    DeleteAfter,
    /// Ellipsoid collision and gravity
    CollisionResponse,
    /// User-defined animator
    Custom(u32),
}

/// Per-frame mutator attached to a node
pub trait Animator: 'static {
    /// Update `node` for the frame at `time_ms`
    fn animate_node(&mut self, ctx: &mut AnimatorContext<'_>, node: NodeId, time_ms: u32);

    /// Type tag
    fn animator_type(&self) -> AnimatorType;

    /// Whether the animation has run to completion
    ///
    /// Finished animators stay attached until removed.
    fn is_finished(&self) -> bool {
        false
    }

    /// Upcast for downcasting to the concrete animator
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete animator
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn Animator {
    /// Downcast to a concrete animator
    pub fn downcast_ref<T: Animator>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably downcast to a concrete animator
    pub fn downcast_mut<T: Animator>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// What an animator may touch while it runs
///
/// Gives read access to the whole graph and write access to individual
/// nodes, but no way to insert, remove or reparent them.
#[derive(Debug)]
pub struct AnimatorContext<'a> {
    scene: &'a mut SceneGraph,
    deletion_queue: &'a mut Vec<NodeId>,
}

impl<'a> AnimatorContext<'a> {
    pub(crate) fn new(scene: &'a mut SceneGraph, deletion_queue: &'a mut Vec<NodeId>) -> Self {
        Self { scene, deletion_queue }
    }

    /// Read access to the whole graph
    pub fn scene(&self) -> &SceneGraph {
        self.scene
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.scene.get(id)
    }

    /// Look up a node for modification
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.scene.get_mut(id)
    }

    /// Ask for a node to be removed once the current frame is drawn
    pub fn queue_deletion(&mut self, id: NodeId) {
        if !self.deletion_queue.contains(&id) {
            self.deletion_queue.push(id);
        }
    }
}
