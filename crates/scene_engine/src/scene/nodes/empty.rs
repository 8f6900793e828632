//! Grouping node

use std::any::Any;

use crate::scene::aabb::Aabb;
use crate::scene::kind::{RegisterContext, RenderContext, SceneNodeKind, SceneNodeType};
use crate::video::DriverResult;

/// Node without geometry, used to group and transform children
///
/// Never queued for drawing; its children still register.
#[derive(Debug, Clone, Default)]
pub struct EmptyNode {
    bounding_box: Aabb,
}

impl EmptyNode {
    /// Create an empty node
    pub fn new() -> Self {
        Self::default()
    }
}

impl SceneNodeKind for EmptyNode {
    fn node_type(&self) -> SceneNodeType {
        SceneNodeType::Empty
    }

    fn on_register(&mut self, _ctx: &mut RegisterContext<'_>) {}

    fn render(&mut self, _ctx: &mut RenderContext<'_>) -> DriverResult<()> {
        Ok(())
    }

    fn bounding_box(&self) -> Aabb {
        self.bounding_box
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
