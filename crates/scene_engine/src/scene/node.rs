//! Scene nodes
//!
//! A [`SceneNode`] carries everything every node has in common: identity,
//! local transform, cached absolute transform, visibility, culling policy,
//! tree links, attached animators and an optional triangle selector. What
//! the node *is* (mesh, camera, light, ...) lives in its boxed
//! [`SceneNodeKind`].
//!
//! Nodes are stored in the [`SceneGraph`](super::graph::SceneGraph) arena
//! and refer to each other by [`NodeId`]. Tree edges are only changed
//! through the graph so parent and child links always agree.

use std::rc::Rc;

use bitflags::bitflags;
use slotmap::new_key_type;

use crate::foundation::math::{Mat4, Mat4Ext, Transform, Vec3};
use crate::video::{Material, MaterialFlags, MaterialType, TextureHandle};

use super::aabb::Aabb;
use super::animators::Animator;
use super::kind::{SceneNodeKind, SceneNodeType};
use super::selectors::TriangleSelector;

new_key_type! {
    /// Generational handle to a node in a scene graph
    ///
    /// A handle to a removed node never resolves again, which makes it safe
    /// to hold as a non-owning reference.
    pub struct NodeId;
}

/// Automatic culling policy of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutomaticCulling {
    /// Never culled
    Off,
    /// Culled when the world-space bounding box is outside the view frustum
    #[default]
    BoundingBox,
}

bitflags! {
    /// Debug geometry drawn for a node after it renders
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DebugData: u32 {
        /// Node bounding box
        const BBOX = 1 << 0;
        /// Bounding box of each mesh buffer
        const BBOX_BUFFERS = 1 << 1;
        /// Vertex normals
        const NORMALS = 1 << 2;
    }
}

/// A node in the scene tree
pub struct SceneNode {
    pub(crate) name: String,
    pub(crate) id: i32,
    pub(crate) transform: Transform,
    pub(crate) absolute: Mat4,
    pub(crate) visible: bool,
    pub(crate) culling: AutomaticCulling,
    pub(crate) debug_data: DebugData,
    pub(crate) is_debug_object: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) animators: Vec<Box<dyn Animator>>,
    pub(crate) triangle_selector: Option<Rc<dyn TriangleSelector>>,
    pub(crate) kind: Box<dyn SceneNodeKind>,
}

impl std::fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneNode")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("type", &self.kind.node_type())
            .field("visible", &self.visible)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("animators", &self.animators.len())
            .finish_non_exhaustive()
    }
}

impl SceneNode {
    /// Create a detached node of the given kind
    ///
    /// Nodes only become part of a scene through
    /// [`SceneGraph::insert`](super::graph::SceneGraph::insert).
    pub fn new(kind: Box<dyn SceneNodeKind>) -> Self {
        Self {
            name: String::new(),
            id: -1,
            transform: Transform::identity(),
            absolute: Mat4::identity(),
            visible: true,
            culling: AutomaticCulling::BoundingBox,
            debug_data: DebugData::empty(),
            is_debug_object: false,
            parent: None,
            children: Vec::new(),
            animators: Vec::new(),
            triangle_selector: None,
            kind,
        }
    }

    /// Builder-style name assignment
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder-style local transform assignment
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    // --- Identity ---

    /// Debug name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the debug name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// User id; not required to be unique, -1 by default
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Set the user id
    pub fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    // --- Transform ---

    /// Local transform
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Position relative to the parent
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    /// Set the position relative to the parent
    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
    }

    /// Euler rotation in degrees relative to the parent
    pub fn rotation(&self) -> Vec3 {
        self.transform.rotation
    }

    /// Set the Euler rotation in degrees
    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.transform.rotation = rotation;
    }

    /// Scale relative to the parent
    pub fn scale(&self) -> Vec3 {
        self.transform.scale
    }

    /// Set the scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.scale = scale;
    }

    /// Local transformation matrix
    pub fn relative_transformation(&self) -> Mat4 {
        self.transform.to_matrix()
    }

    /// Absolute transformation cached by the last transform update
    ///
    /// Not recomputed on access: call
    /// [`SceneGraph::update_absolute_transforms`](super::graph::SceneGraph::update_absolute_transforms)
    /// or draw a frame first.
    pub fn absolute_transformation(&self) -> &Mat4 {
        &self.absolute
    }

    /// World-space position from the cached absolute transformation
    pub fn absolute_position(&self) -> Vec3 {
        self.absolute.translation()
    }

    /// Recompute the cached absolute transformation from a parent's
    pub fn update_absolute(&mut self, parent_absolute: Option<&Mat4>) {
        let local = self.relative_transformation();
        self.absolute = match parent_absolute {
            Some(parent) => parent * local,
            None => local,
        };
    }

    // --- Visibility and culling ---

    /// Own visibility flag
    ///
    /// A visible node is still hidden when any ancestor is invisible.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Set the visibility flag
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Automatic culling policy
    pub fn automatic_culling(&self) -> AutomaticCulling {
        self.culling
    }

    /// Set the automatic culling policy
    pub fn set_automatic_culling(&mut self, culling: AutomaticCulling) {
        self.culling = culling;
    }

    /// Debug geometry drawn for this node
    pub fn debug_data(&self) -> DebugData {
        self.debug_data
    }

    /// Set the debug geometry drawn for this node
    pub fn set_debug_data(&mut self, debug_data: DebugData) {
        self.debug_data = debug_data;
    }

    /// Whether this node only exists for debugging; such nodes are skipped by picking
    pub fn is_debug_object(&self) -> bool {
        self.is_debug_object
    }

    /// Mark the node as a debug object
    pub fn set_is_debug_object(&mut self, is_debug_object: bool) {
        self.is_debug_object = is_debug_object;
    }

    // --- Tree links ---

    /// Parent node, `None` for the root and detached nodes
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    // --- Animators ---

    /// Attach an animator; it runs after those already attached
    pub fn add_animator(&mut self, animator: Box<dyn Animator>) {
        self.animators.push(animator);
    }

    /// Detach the animator at `index` and hand it back
    pub fn remove_animator(&mut self, index: usize) -> Option<Box<dyn Animator>> {
        (index < self.animators.len()).then(|| self.animators.remove(index))
    }

    /// Detach every animator
    pub fn remove_all_animators(&mut self) {
        self.animators.clear();
    }

    /// Attached animators in run order
    pub fn animators(&self) -> &[Box<dyn Animator>] {
        &self.animators
    }

    /// Mutable access to an attached animator
    pub fn animator_mut(&mut self, index: usize) -> Option<&mut (dyn Animator + 'static)> {
        self.animators.get_mut(index).map(|a| a.as_mut())
    }

    // --- Collision ---

    /// Triangle selector bound to this node
    pub fn triangle_selector(&self) -> Option<&Rc<dyn TriangleSelector>> {
        self.triangle_selector.as_ref()
    }

    /// Bind or clear the triangle selector
    pub fn set_triangle_selector(&mut self, selector: Option<Rc<dyn TriangleSelector>>) {
        self.triangle_selector = selector;
    }

    // --- Kind ---

    /// Type of the node's kind
    pub fn node_type(&self) -> SceneNodeType {
        self.kind.node_type()
    }

    /// The node's kind
    pub fn kind(&self) -> &dyn SceneNodeKind {
        self.kind.as_ref()
    }

    /// Mutable access to the node's kind
    pub fn kind_mut(&mut self) -> &mut dyn SceneNodeKind {
        self.kind.as_mut()
    }

    /// Downcast the kind to a concrete type
    pub fn kind_as<T: SceneNodeKind>(&self) -> Option<&T> {
        self.kind.as_any().downcast_ref::<T>()
    }

    /// Mutably downcast the kind to a concrete type
    pub fn kind_as_mut<T: SceneNodeKind>(&mut self) -> Option<&mut T> {
        self.kind.as_any_mut().downcast_mut::<T>()
    }

    /// Bounding box in local space
    pub fn bounding_box(&self) -> Aabb {
        self.kind.bounding_box()
    }

    /// Bounding box in world space, from the cached absolute transformation
    pub fn transformed_bounding_box(&self) -> Aabb {
        self.kind.bounding_box().transformed(&self.absolute)
    }

    // --- Materials ---

    /// Number of materials
    pub fn material_count(&self) -> usize {
        self.kind.materials().len()
    }

    /// Material at `index`
    pub fn material(&self, index: usize) -> Option<&Material> {
        self.kind.materials().get(index)
    }

    /// Mutable material at `index`
    pub fn material_mut(&mut self, index: usize) -> Option<&mut Material> {
        self.kind.materials_mut().get_mut(index)
    }

    /// Set a flag on every material
    pub fn set_material_flag(&mut self, flag: MaterialFlags, enabled: bool) {
        for material in self.kind.materials_mut() {
            material.set_flag(flag, enabled);
        }
    }

    /// Bind a texture layer on every material
    pub fn set_material_texture(&mut self, layer: usize, texture: Option<TextureHandle>) {
        for material in self.kind.materials_mut() {
            material.set_texture(layer, texture);
        }
    }

    /// Set the type of every material
    pub fn set_material_type(&mut self, material_type: MaterialType) {
        for material in self.kind.materials_mut() {
            material.material_type = material_type;
        }
    }

    /// Whether any material blends
    pub fn has_transparent_material(&self) -> bool {
        self.kind.materials().iter().any(Material::is_transparent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::nodes::{EmptyNode, MeshNode};
    use crate::scene::mesh::GeometryCreator;
    use crate::scene::animators::RotationAnimator;

    #[test]
    fn test_update_absolute_composes_parent() {
        let mut node = SceneNode::new(Box::new(EmptyNode::new()));
        node.set_position(Vec3::new(1.0, 0.0, 0.0));
        let parent = Transform::from_position(Vec3::new(0.0, 5.0, 0.0)).to_matrix();

        node.update_absolute(Some(&parent));
        assert_eq!(node.absolute_position(), Vec3::new(1.0, 5.0, 0.0));

        node.update_absolute(None);
        assert_eq!(node.absolute_position(), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_material_helpers_apply_to_all_materials() {
        let mesh = GeometryCreator::cube(Vec3::new(1.0, 1.0, 1.0));
        let mut node = SceneNode::new(Box::new(MeshNode::new(Rc::new(mesh))));
        assert!(!node.has_transparent_material());

        node.set_material_type(MaterialType::TransparentAddColor);
        node.set_material_flag(MaterialFlags::LIGHTING, false);
        assert!(node.has_transparent_material());
        assert!(!node.material(0).unwrap().flags.contains(MaterialFlags::LIGHTING));
        assert!(node.material(node.material_count()).is_none());
    }

    #[test]
    fn test_animator_attachment() {
        let mut node = SceneNode::new(Box::new(EmptyNode::new()));
        node.add_animator(Box::new(RotationAnimator::new(Vec3::new(0.0, 90.0, 0.0))));
        assert_eq!(node.animators().len(), 1);
        assert!(node.remove_animator(3).is_none());
        assert!(node.remove_animator(0).is_some());
        assert!(node.animators().is_empty());
    }

    #[test]
    fn test_kind_downcast() {
        let node = SceneNode::new(Box::new(EmptyNode::new()));
        assert!(node.kind_as::<EmptyNode>().is_some());
        assert!(node.kind_as::<MeshNode>().is_none());
        assert_eq!(node.node_type(), SceneNodeType::Empty);
    }
}
