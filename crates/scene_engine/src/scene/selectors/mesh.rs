//! Brute-force selector over a mesh's triangles

use crate::collision::Triangle;
use crate::scene::graph::SceneGraph;
use crate::scene::mesh::StaticMesh;
use crate::scene::node::NodeId;

use super::{node_transform, remaining, TriangleQuery, TriangleSelector};

/// Every triangle of a mesh, in the space of an optional node
#[derive(Debug, Clone)]
pub struct MeshTriangleSelector {
    triangles: Vec<Triangle>,
    node: Option<NodeId>,
}

impl MeshTriangleSelector {
    /// Selector following `node`; with `None` the triangles are world space
    pub fn new(mesh: &StaticMesh, node: Option<NodeId>) -> Self {
        let triangles = mesh
            .buffers()
            .iter()
            .flat_map(|buffer| buffer.triangles())
            .map(|[a, b, c]| Triangle::new(a, b, c))
            .collect();
        Self { triangles, node }
    }

    /// Selector over explicit triangles
    pub fn from_triangles(triangles: Vec<Triangle>, node: Option<NodeId>) -> Self {
        Self { triangles, node }
    }
}

impl TriangleSelector for MeshTriangleSelector {
    fn triangle_count(&self, _scene: &SceneGraph) -> usize {
        self.triangles.len()
    }

    fn get_triangles(&self, scene: &SceneGraph, query: &TriangleQuery, out: &mut Vec<Triangle>) {
        let Some(world) = node_transform(scene, self.node) else {
            return;
        };
        let start = out.len();

        for triangle in &self.triangles {
            if remaining(query, out, start) == 0 {
                break;
            }
            let world_triangle = triangle.transformed(&world);
            if let Some(bounds) = &query.bounds {
                if !world_triangle.bounding_box().intersects(bounds) {
                    continue;
                }
            }
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
    use crate::foundation::math::{Mat4, Vec2, Vec3};
    use crate::scene::aabb::Aabb;
    use crate::scene::mesh::GeometryCreator;
    use crate::scene::node::SceneNode;
    use crate::scene::nodes::EmptyNode;

    #[test]
    fn test_follows_node_transform() {
        let mut scene = SceneGraph::default();
        let node = scene.insert(SceneNode::new(Box::new(EmptyNode::new())), None).unwrap();
        scene.get_mut(node).unwrap().set_position(Vec3::new(0.0, -5.0, 0.0));
        scene.update_absolute_transforms();

        let plane = GeometryCreator::plane(Vec2::new(10.0, 10.0), (2, 2));
        let selector = MeshTriangleSelector::new(&plane, Some(node));
        assert_eq!(selector.triangle_count(&scene), 8);

        let mut out = Vec::new();
        selector.get_triangles(&scene, &TriangleQuery::all(), &mut out);
        assert_eq!(out.len(), 8);
        assert!(out.iter().all(|t| (t.v0.y + 5.0).abs() < 1e-6));
    }

    #[test]
    fn test_bounds_and_cap() {
        let scene = SceneGraph::default();
        let plane = GeometryCreator::plane(Vec2::new(10.0, 10.0), (2, 2));
        let selector = MeshTriangleSelector::new(&plane, None);

        let mut out = Vec::new();
        let corner = Aabb::new(Vec3::new(5.0, -1.0, 5.0), Vec3::new(9.0, 1.0, 9.0));
        selector.get_triangles(&scene, &TriangleQuery::in_box(corner), &mut out);
        assert_eq!(out.len(), 2);

        out.clear();
        selector.get_triangles(&scene, &TriangleQuery::all().with_max(3), &mut out);
        assert_eq!(out.len(), 3);

        out.clear();
        let scale = Mat4::new_scaling(0.5);
        selector.get_triangles(&scene, &TriangleQuery::all().with_transform(scale), &mut out);
        assert!(out.iter().all(|t| t.v0.x.abs() <= 5.0));
    }

    #[test]
    fn test_removed_node_yields_nothing() {
        let mut scene = SceneGraph::default();
        let node = scene.insert(SceneNode::new(Box::new(EmptyNode::new())), None).unwrap();
        let selector = MeshTriangleSelector::new(&GeometryCreator::cube(Vec3::new(1.0, 1.0, 1.0)), Some(node));
        scene.remove(node).unwrap();

        let mut out = Vec::new();
        selector.get_triangles(&scene, &TriangleQuery::all(), &mut out);
        assert!(out.is_empty());
    }
}
