//! Application hook around the light and draw passes
//!
//! A [`LightManager`] replaces the scene manager's default light handling:
//! it receives the frame's light nodes before any hardware light is bound,
//! may reorder or trim them, and is told when each pass and each node is
//! drawn. A typical use is enabling only the lights nearest to the node
//! about to be drawn on hardware with few light slots.
//!
//! All callbacks run synchronously inside `draw_all`.

use crate::video::VideoDriver;

use super::graph::SceneGraph;
use super::node::NodeId;
use super::render_queue::RenderPass;

/// Callbacks bracketing light binding, passes and node draws
///
/// Every method has an empty default so implementors only override what
/// they need.
#[allow(unused_variables)]
pub trait LightManager {
    /// Called after registration with the light nodes of this frame
    ///
    /// The lights in `lights` are bound in order once this returns; remove
    /// entries to keep them unbound.
    fn on_pre_render(&mut self, lights: &mut Vec<NodeId>, scene: &SceneGraph) {}

    /// Called after the last pass; the light list is no longer valid
    fn on_post_render(&mut self) {}

    /// Called before any node of `pass` is drawn
    fn on_render_pass_pre_render(&mut self, pass: RenderPass) {}

    /// Called after every node of `pass` was drawn
    fn on_render_pass_post_render(&mut self, pass: RenderPass) {}

    /// Called before `node` is drawn
    ///
    /// `driver` gives access to the hardware lights bound in the light pass,
    /// for example to switch them with
    /// [`turn_light_on`](VideoDriver::turn_light_on).
    fn on_node_pre_render(&mut self, node: NodeId, scene: &SceneGraph, driver: &mut dyn VideoDriver) {}

    /// Called after `node` was drawn
    fn on_node_post_render(&mut self, node: NodeId, scene: &SceneGraph, driver: &mut dyn VideoDriver) {}
}
