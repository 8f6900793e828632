//! Selector combining several others

use std::rc::Rc;

use crate::collision::Triangle;
use crate::scene::graph::SceneGraph;
use crate::scene::node::NodeId;

use super::{remaining, TriangleQuery, TriangleSelector};

/// Union of several selectors
///
/// Lets one collision response animator collide with a whole level made of
/// separately selected nodes.
#[derive(Default, Clone)]
pub struct MetaTriangleSelector {
    selectors: Vec<Rc<dyn TriangleSelector>>,
}

impl std::fmt::Debug for MetaTriangleSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaTriangleSelector")
            .field("selectors", &self.selectors.len())
            .finish()
    }
}

impl MetaTriangleSelector {
    /// Create an empty selector
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a selector
    pub fn add(&mut self, selector: Rc<dyn TriangleSelector>) {
        self.selectors.push(selector);
    }

    /// Remove a selector, compared by identity
    pub fn remove(&mut self, selector: &Rc<dyn TriangleSelector>) -> bool {
        let before = self.selectors.len();
        self.selectors.retain(|s| !Rc::ptr_eq(s, selector));
        self.selectors.len() != before
    }

    /// Remove every selector
    pub fn remove_all(&mut self) {
        self.selectors.clear();
    }

    /// Number of contained selectors
    pub fn selector_count(&self) -> usize {
        self.selectors.len()
    }
}

impl TriangleSelector for MetaTriangleSelector {
    fn triangle_count(&self, scene: &SceneGraph) -> usize {
        self.selectors.iter().map(|s| s.triangle_count(scene)).sum()
    }

    fn get_triangles(&self, scene: &SceneGraph, query: &TriangleQuery, out: &mut Vec<Triangle>) {
        let start = out.len();
        for selector in &self.selectors {
            let room = remaining(query, out, start);
            if room == 0 {
                break;
            }
            selector.get_triangles(scene, &query.with_max(room), out);
        }
    }

    fn get_triangles_with_owner(
        &self,
        scene: &SceneGraph,
        query: &TriangleQuery,
        out: &mut Vec<(Triangle, Option<NodeId>)>,
    ) {
        let start = out.len();
        for selector in &self.selectors {
            let room = remaining(query, out, start);
            if room == 0 {
                break;
            }
            selector.get_triangles_with_owner(scene, &query.with_max(room), out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::scene::selectors::MeshTriangleSelector;

    fn single(x: f32) -> Rc<dyn TriangleSelector> {
        let triangle = Triangle::new(
            Vec3::new(x, 0.0, 0.0),
            Vec3::new(x, 1.0, 0.0),
            Vec3::new(x + 1.0, 0.0, 0.0),
        );
        Rc::new(MeshTriangleSelector::from_triangles(vec![triangle], None))
    }

    #[test]
    fn test_meta_aggregates_and_removes() {
        let scene = SceneGraph::default();
        let first = single(0.0);
        let mut meta = MetaTriangleSelector::new();
        meta.add(Rc::clone(&first));
        meta.add(single(5.0));
        assert_eq!(meta.triangle_count(&scene), 2);

        let mut out = Vec::new();
        meta.get_triangles(&scene, &TriangleQuery::all(), &mut out);
        assert_eq!(out.len(), 2);

        out.clear();
        meta.get_triangles(&scene, &TriangleQuery::all().with_max(1), &mut out);
        assert_eq!(out.len(), 1);

        assert!(meta.remove(&first));
        assert!(!meta.remove(&first));
        assert_eq!(meta.selector_count(), 1);
    }

    #[test]
    fn test_meta_owner_query_respects_cap() {
        let scene = SceneGraph::default();
        let mut meta = MetaTriangleSelector::new();
        for x in [0.0, 5.0, 10.0] {
            meta.add(single(x));
        }

        let mut out = vec![(Triangle::new(Vec3::zeros(), Vec3::zeros(), Vec3::zeros()), None)];
        meta.get_triangles_with_owner(&scene, &TriangleQuery::all().with_max(1), &mut out);
        assert_eq!(out.len(), 2);

        out.clear();
        meta.get_triangles_with_owner(&scene, &TriangleQuery::all().with_max(2), &mut out);
        assert_eq!(out.len(), 2);

        out.clear();
        meta.get_triangles_with_owner(&scene, &TriangleQuery::all(), &mut out);
        assert_eq!(out.len(), 3);
    }
}
