//! Scene graph and render-pass scheduler
//!
//! A scene is a tree of [`SceneNode`]s owned by a [`SceneGraph`] arena and
//! driven by the [`SceneManager`]. Each frame the manager animates the tree,
//! recomputes absolute transformations, collects the visible nodes into a
//! [`RenderQueue`] bucketed by [`RenderPass`] and draws the passes in a
//! fixed order through a [`VideoDriver`](crate::video::VideoDriver).
//!
//! ## Architecture
//!
//! ```text
//! SceneManager
//!   ├─ SceneGraph      (arena of SceneNode, parent/child links)
//!   │    └─ SceneNode  (transform, visibility, animators, kind)
//!   ├─ RenderQueue     (per-pass buckets, sorted before drawing)
//!   └─ LightManager    (optional per-pass and per-node hooks)
//! ```
//!
//! Node behaviour lives in [`SceneNodeKind`] implementations under
//! [`nodes`]; per-frame behaviour attached to a node lives in
//! [`animators`]; collision queries go through [`selectors`].

pub mod aabb;
pub mod animators;
pub mod error;
pub mod frustum;
pub mod graph;
pub mod kind;
pub mod light_manager;
pub mod manager;
pub mod mesh;
pub mod node;
pub mod nodes;
pub mod render_queue;
pub mod selectors;

#[cfg(test)]
mod tests;

pub use aabb::Aabb;
pub use animators::{Animator, AnimatorContext, AnimatorType};
pub use error::{SceneError, SceneResult};
pub use frustum::{Frustum, FrustumPlane, Plane};
pub use graph::SceneGraph;
pub use kind::{ActiveLight, RegisterContext, RenderContext, SceneNodeKind, SceneNodeType};
pub use light_manager::LightManager;
pub use manager::{FrameStats, PassStats, SceneManager};
pub use mesh::{GeometryCreator, MeshBuffer, MeshCache, MeshLoader, StaticMesh};
pub use node::{AutomaticCulling, DebugData, NodeId, SceneNode};
pub use render_queue::{RenderEntry, RenderPass, RenderQueue};
pub use selectors::{TriangleQuery, TriangleSelector};
