//! Triangle selectors
//!
//! A [`TriangleSelector`] answers "which triangles are near here?" for
//! collision and picking. Callers treat it as an opaque spatial query: the
//! collision response animator does not know whether the triangles come
//! from a flat list, an octree or a node's bounding box.
//!
//! Selectors that follow a node resolve its current absolute transformation
//! through the [`SceneGraph`] on every query, so they never hold the node
//! alive. Once the node is removed they return no triangles.

mod bbox;
mod mesh;
mod meta;
mod octree;

pub use bbox::BoxTriangleSelector;
pub use mesh::MeshTriangleSelector;
pub use meta::MetaTriangleSelector;
pub use octree::{OctreeTriangleSelector, TriangleOctreeConfig};

use crate::collision::Triangle;
use crate::foundation::math::Mat4;

use super::aabb::Aabb;
use super::graph::SceneGraph;
use super::node::NodeId;

/// Parameters of a triangle query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleQuery {
    /// Maximum number of triangles to append
    pub max: usize,
    /// World-space region of interest; all triangles when `None`
    pub bounds: Option<Aabb>,
    /// Applied to every returned triangle after the world transformation
    pub transform: Option<Mat4>,
}

impl Default for TriangleQuery {
    fn default() -> Self {
        Self {
            max: usize::MAX,
            bounds: None,
            transform: None,
        }
    }
}

impl TriangleQuery {
    /// Query for every triangle
    pub fn all() -> Self {
        Self::default()
    }

    /// Query for triangles overlapping a world-space box
    pub fn in_box(bounds: Aabb) -> Self {
        Self {
            bounds: Some(bounds),
            ..Self::default()
        }
    }

    /// Builder-style post transformation
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Builder-style triangle cap
    pub fn with_max(mut self, max: usize) -> Self {
        self.max = max;
        self
    }

    /// Bring a world-space triangle into the caller's space
    pub(crate) fn apply(&self, triangle: &Triangle) -> Triangle {
        match &self.transform {
            Some(matrix) => triangle.transformed(matrix),
            None => *triangle,
        }
    }
}

/// Source of triangles for collision and picking
pub trait TriangleSelector {
    /// Number of triangles a full query could return
    fn triangle_count(&self, scene: &SceneGraph) -> usize;

    /// Append triangles matching `query` to `out`
    ///
    /// Selectors may return triangles outside `query.bounds`; the bounds are
    /// a hint to skip obviously distant geometry.
    fn get_triangles(&self, scene: &SceneGraph, query: &TriangleQuery, out: &mut Vec<Triangle>);

    /// Node the triangles belong to, if any
    fn node(&self) -> Option<NodeId> {
        None
    }

    /// Append triangles together with the node they belong to
    fn get_triangles_with_owner(
        &self,
        scene: &SceneGraph,
        query: &TriangleQuery,
        out: &mut Vec<(Triangle, Option<NodeId>)>,
    ) {
        let mut triangles = Vec::new();
        self.get_triangles(scene, query, &mut triangles);
        let owner = self.node();
        out.extend(triangles.into_iter().map(|t| (t, owner)));
    }
}

/// Remaining room under the query's cap
pub(crate) fn remaining<T>(query: &TriangleQuery, out: &[T], start: usize) -> usize {
    query.max.saturating_sub(out.len() - start)
}

/// World transformation of a selector's node, `None` once the node is gone
pub(crate) fn node_transform(scene: &SceneGraph, node: Option<NodeId>) -> Option<Mat4> {
    match node {
        Some(id) => scene.get(id).map(|n| *n.absolute_transformation()),
        None => Some(Mat4::identity()),
    }
}
