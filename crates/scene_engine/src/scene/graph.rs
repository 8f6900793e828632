//! Scene graph arena
//!
//! Owns every node of a scene in a slot map and maintains the parent/child
//! links between them. The tree hangs off a single root node that can be
//! neither removed nor reparented.
//!
//! ## Ownership
//!
//! The arena owns the nodes; tree edges are plain [`NodeId`]s. Removing a
//! node removes its whole subtree from the arena, so any id into that
//! subtree stops resolving. [`SceneGraph::detach`] instead keeps the
//! subtree alive as an orphan that can be attached again later.

use slotmap::SlotMap;

use crate::foundation::logging::{debug, warn};
use crate::foundation::math::Mat4;

use super::error::{SceneError, SceneResult};
use super::node::{NodeId, SceneNode};
use super::nodes::EmptyNode;

/// Arena of scene nodes forming a tree under one root
#[derive(Debug)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, SceneNode>,
    root: NodeId,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new("root")
    }
}

impl SceneGraph {
    /// Create a graph containing only an empty root node
    pub fn new(root_name: &str) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::new(Box::new(EmptyNode::new())).with_name(root_name));
        Self { nodes, root }
    }

    /// The root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node
    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// Look up a node mutably
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    /// Look up a node or fail with [`SceneError::NodeNotFound`]
    pub fn node(&self, id: NodeId) -> SceneResult<&SceneNode> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Look up a node mutably or fail with [`SceneError::NodeNotFound`]
    pub fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut SceneNode> {
        self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Whether `id` resolves to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live nodes, including the root and detached subtrees
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root is never removed
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate all live nodes in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter()
    }

    /// Add a node under `parent` (the root when `None`)
    ///
    /// The node's absolute transformation is computed immediately so it is
    /// usable before the next frame.
    pub fn insert(&mut self, mut node: SceneNode, parent: Option<NodeId>) -> SceneResult<NodeId> {
        let parent = parent.unwrap_or(self.root);
        let parent_absolute = *self.node(parent)?.absolute_transformation();

        node.parent = Some(parent);
        node.children.clear();
        node.update_absolute(Some(&parent_absolute));

        let name = node.name.clone();
        let node_type = node.node_type();
        let id = self.nodes.insert(node);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.push(id);
        }

        debug!("Added {node_type:?} node {id:?} '{name}' under {parent:?}");
        Ok(id)
    }

    /// Whether `ancestor` is a strict ancestor of `node`
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes.get(node).and_then(SceneNode::parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(SceneNode::parent);
        }
        false
    }

    /// Reparent `child` under `parent`
    ///
    /// Detaches `child` from its current parent first. Rejects unknown ids,
    /// the root, self-parenting and any move that would create a cycle.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.node(parent)?;
        self.node(child)?;

        if child == self.root {
            warn!("Rejected reparenting of the root node");
            return Err(SceneError::RootImmutable);
        }
        if parent == child {
            warn!("Rejected adding node {child:?} to itself");
            return Err(SceneError::SelfParent(child));
        }
        if self.is_ancestor(child, parent) {
            warn!("Rejected cycle: {child:?} is an ancestor of {parent:?}");
            return Err(SceneError::CycleDetected { parent, child });
        }

        self.unlink(child);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.push(child);
        }
        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent = Some(parent);
        }
        Ok(())
    }

    /// Detach a node from its parent without destroying it
    ///
    /// The subtree stays in the arena as an orphan: it is not animated or
    /// drawn until attached again with [`SceneGraph::add_child`].
    pub fn detach(&mut self, id: NodeId) -> SceneResult<()> {
        self.node(id)?;
        if id == self.root {
            return Err(SceneError::RootImmutable);
        }
        self.unlink(id);
        Ok(())
    }

    /// Remove a node and its whole subtree
    ///
    /// Returns the number of nodes removed.
    pub fn remove(&mut self, id: NodeId) -> SceneResult<usize> {
        self.node(id)?;
        if id == self.root {
            warn!("Rejected removal of the root node");
            return Err(SceneError::RootImmutable);
        }

        self.unlink(id);
        let subtree = self.descendants(id);
        for node in &subtree {
            self.nodes.remove(*node);
        }

        debug!("Removed node {id:?} and {} descendants", subtree.len() - 1);
        Ok(subtree.len())
    }

    /// Remove every node below the root
    pub fn clear(&mut self) {
        let root = self.root;
        self.nodes.retain(|id, _| id == root);
        if let Some(root_node) = self.nodes.get_mut(root) {
            root_node.children.clear();
        }
    }

    /// `id` followed by all its descendants, depth first
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else { continue };
            result.push(current);
            stack.extend(node.children.iter().rev());
        }
        result
    }

    /// Whether the node and all its ancestors are visible
    pub fn is_effectively_visible(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.nodes.get(node_id) {
                Some(node) if node.visible => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    /// Recompute every absolute transformation from the root down
    pub fn update_absolute_transforms(&mut self) {
        let mut stack: Vec<(NodeId, Option<Mat4>)> = vec![(self.root, None)];
        while let Some((id, parent_absolute)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id) else { continue };
            node.update_absolute(parent_absolute.as_ref());
            let absolute = node.absolute;
            stack.extend(node.children.iter().map(|child| (*child, Some(absolute))));
        }
    }

    /// Recompute one node's absolute transformation from its parent's cached one
    pub fn update_absolute_transform(&mut self, id: NodeId) {
        let parent_absolute = self
            .nodes
            .get(id)
            .and_then(SceneNode::parent)
            .and_then(|p| self.nodes.get(p))
            .map(|p| p.absolute);
        if let Some(node) = self.nodes.get_mut(id) {
            node.update_absolute(parent_absolute.as_ref());
        }
    }

    /// Remove `id` from its parent's child list and clear its parent link
    fn unlink(&mut self, id: NodeId) {
        let parent = self.nodes.get_mut(id).and_then(|n| n.parent.take());
        if let Some(parent_node) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent_node.children.retain(|c| *c != id);
        }
    }
}
