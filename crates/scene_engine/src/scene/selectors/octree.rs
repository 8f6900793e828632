//! Octree triangle selector
//!
//! Divides a mesh's local space into hierarchical octants so queries with a
//! small region of interest only touch nearby triangles. A triangle is
//! stored in the deepest octant that fully contains it, so large triangles
//! stay high in the tree.

use crate::collision::Triangle;
use crate::foundation::math::{Mat4, Vec3};
use crate::scene::aabb::Aabb;
use crate::scene::graph::SceneGraph;
use crate::scene::mesh::StaticMesh;
use crate::scene::node::NodeId;

use super::{node_transform, remaining, TriangleQuery, TriangleSelector};

/// Configuration for octree subdivision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriangleOctreeConfig {
    /// A node with more triangles than this is subdivided
    pub min_triangles_per_node: usize,

    /// Maximum subdivision depth
    pub max_depth: u32,
}

impl Default for TriangleOctreeConfig {
    fn default() -> Self {
        Self {
            min_triangles_per_node: 32,
            max_depth: 8,
        }
    }
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
struct OctreeNode {
    /// Local-space bounds of this node
    bounds: Aabb,

    /// Triangles no child fully contains
    triangles: Vec<Triangle>,

    /// Non-empty child octants
    children: Vec<OctreeNode>,
}

impl OctreeNode {
    fn build(bounds: Aabb, triangles: Vec<Triangle>, depth: u32, config: &TriangleOctreeConfig) -> Self {
        let mut node = Self {
            bounds,
            triangles,
            children: Vec::new(),
        };

        if node.triangles.len() > config.min_triangles_per_node && depth < config.max_depth {
            node.subdivide(depth, config);
        }
        node
    }

    /// Push triangles down into the octants that fully contain them
    fn subdivide(&mut self, depth: u32, config: &TriangleOctreeConfig) {
        let center = self.bounds.center();
        let quarter_extents = self.bounds.extents() * 0.5;

        let mut remaining = std::mem::take(&mut self.triangles);
        for octant in 0..8 {
            let sign = |bit: usize| if octant & bit != 0 { 1.0 } else { -1.0 };
            let child_center = center + quarter_extents.component_mul(&Vec3::new(sign(1), sign(2), sign(4)));
            let child_bounds = Aabb::from_center_extents(child_center, quarter_extents);

            let (inside, outside): (Vec<_>, Vec<_>) = remaining.into_iter().partition(|t| {
                child_bounds.contains_point(t.v0)
                    && child_bounds.contains_point(t.v1)
                    && child_bounds.contains_point(t.v2)
            });
            remaining = outside;

            if !inside.is_empty() {
                self.children.push(Self::build(child_bounds, inside, depth + 1, config));
            }
        }
        self.triangles = remaining;
    }

    fn collect<'a>(&'a self, bounds: Option<&Aabb>, results: &mut Vec<&'a Triangle>) {
        if let Some(bounds) = bounds {
            if !self.bounds.intersects(bounds) {
                return;
            }
        }

        results.extend(self.triangles.iter());
        for child in &self.children {
            child.collect(bounds, results);
        }
    }

    fn count_triangles(&self) -> usize {
        self.triangles.len() + self.children.iter().map(Self::count_triangles).sum::<usize>()
    }

    fn count_nodes(&self) -> usize {
        1 + self.children.iter().map(Self::count_nodes).sum::<usize>()
    }
}

/// Octree over a mesh's triangles, following an optional node
#[derive(Debug, Clone)]
pub struct OctreeTriangleSelector {
    root: Option<OctreeNode>,
    node: Option<NodeId>,
}

impl OctreeTriangleSelector {
    /// Build the octree for `mesh`
    pub fn new(mesh: &StaticMesh, node: Option<NodeId>, config: TriangleOctreeConfig) -> Self {
        let triangles: Vec<Triangle> = mesh
            .buffers()
            .iter()
            .flat_map(|buffer| buffer.triangles())
            .map(|[a, b, c]| Triangle::new(a, b, c))
            .collect();
        Self::from_triangles(triangles, node, config)
    }

    /// Build the octree over explicit local-space triangles
    pub fn from_triangles(triangles: Vec<Triangle>, node: Option<NodeId>, config: TriangleOctreeConfig) -> Self {
        let bounds = Aabb::from_points(triangles.iter().flat_map(|t| [t.v0, t.v1, t.v2]));
        let root = bounds.map(|bounds| OctreeNode::build(bounds, triangles, 0, &config));
        Self { root, node }
    }

    /// Number of octree nodes
    pub fn node_count(&self) -> usize {
        self.root.as_ref().map_or(0, OctreeNode::count_nodes)
    }
}

impl TriangleSelector for OctreeTriangleSelector {
    fn triangle_count(&self, _scene: &SceneGraph) -> usize {
        self.root.as_ref().map_or(0, OctreeNode::count_triangles)
    }

    fn get_triangles(&self, scene: &SceneGraph, query: &TriangleQuery, out: &mut Vec<Triangle>) {
        let Some(root) = &self.root else { return };
        let Some(world) = node_transform(scene, self.node) else {
            return;
        };

        // Region of interest in the octree's local space
        let local_bounds = match (&query.bounds, world.try_inverse()) {
            (Some(bounds), Some(inverse)) => Some(bounds.transformed(&inverse)),
            (Some(_), None) => return,
            (None, _) => None,
        };

        let mut candidates = Vec::new();
        root.collect(local_bounds.as_ref(), &mut candidates);

        let start = out.len();
        let identity = world == Mat4::identity();
        for triangle in candidates {
            if remaining(query, out, start) == 0 {
                break;
            }
            let world_triangle = if identity { *triangle } else { triangle.transformed(&world) };
            out.push(query.apply(&world_triangle));
        }
    }

    fn node(&self) -> Option<NodeId> {
        self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec2;
    use crate::scene::mesh::GeometryCreator;

    fn grid() -> StaticMesh {
        // 16 x 16 tiles of 1 unit, 512 triangles spanning -8..8
        GeometryCreator::plane(Vec2::new(1.0, 1.0), (16, 16))
    }

    #[test]
    fn test_octree_keeps_every_triangle() {
        let config = TriangleOctreeConfig {
            min_triangles_per_node: 8,
            max_depth: 4,
        };
        let selector = OctreeTriangleSelector::new(&grid(), None, config);
        let scene = SceneGraph::default();

        assert_eq!(selector.triangle_count(&scene), 512);
        assert!(selector.node_count() > 1);

        let mut out = Vec::new();
        selector.get_triangles(&scene, &TriangleQuery::all(), &mut out);
        assert_eq!(out.len(), 512);
    }

    #[test]
    fn test_small_query_returns_fewer_triangles() {
        let selector = OctreeTriangleSelector::new(&grid(), None, TriangleOctreeConfig {
            min_triangles_per_node: 8,
            max_depth: 4,
        });
        let scene = SceneGraph::default();

        let corner = Aabb::new(Vec3::new(6.5, -1.0, 6.5), Vec3::new(7.5, 1.0, 7.5));
        let mut out = Vec::new();
        selector.get_triangles(&scene, &TriangleQuery::in_box(corner), &mut out);

        assert!(!out.is_empty());
        assert!(out.len() < 512);
        // Every triangle overlapping the query region is among the candidates
        let overlapping = grid().buffers()[0]
            .triangles()
            .filter(|[a, b, c]| Triangle::new(*a, *b, *c).bounding_box().intersects(&corner))
            .count();
        let found = out.iter().filter(|t| t.bounding_box().intersects(&corner)).count();
        assert_eq!(found, overlapping);
    }

    #[test]
    fn test_empty_mesh() {
        let selector = OctreeTriangleSelector::new(&StaticMesh::default(), None, TriangleOctreeConfig::default());
        let scene = SceneGraph::default();
        assert_eq!(selector.triangle_count(&scene), 0);
        assert_eq!(selector.node_count(), 0);

        let mut out = Vec::new();
        selector.get_triangles(&scene, &TriangleQuery::all(), &mut out);
        assert!(out.is_empty());
    }
}
