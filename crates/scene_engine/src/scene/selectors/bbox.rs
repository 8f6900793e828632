//! Selector made of a node's world-space bounding box

use crate::collision::Triangle;
use crate::scene::graph::SceneGraph;
use crate::scene::node::NodeId;

use super::{remaining, TriangleQuery, TriangleSelector};

/// Twelve outward-facing triangles around a node's transformed bounds
///
/// The box is rebuilt on every query, so it follows the node as it moves
/// and resizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxTriangleSelector {
    node: NodeId,
}

impl BoxTriangleSelector {
    /// Selector following `node`
    pub fn new(node: NodeId) -> Self {
        Self { node }
    }
}

impl TriangleSelector for BoxTriangleSelector {
    fn triangle_count(&self, _scene: &SceneGraph) -> usize {
        12
    }

    fn get_triangles(&self, scene: &SceneGraph, query: &TriangleQuery, out: &mut Vec<Triangle>) {
        let Some(node) = scene.get(self.node) else { return };
        let bounds = node.transformed_bounding_box();
        if let Some(region) = &query.bounds {
            if !bounds.intersects(region) {
                return;
            }
        }

        let start = out.len();
        for [q0, q1, q2, q3] in bounds.face_quads() {
            for triangle in [Triangle::new(q0, q1, q2), Triangle::new(q2, q3, q0)] {
                if remaining(query, out, start) == 0 {
                    return;
                }
                out.push(query.apply(&triangle));
            }
        }
    }

    fn node(&self) -> Option<NodeId> {
        Some(self.node)
    }
}
