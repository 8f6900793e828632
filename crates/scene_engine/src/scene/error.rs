//! Scene error types

use thiserror::Error;

use crate::config::ConfigError;
use crate::video::DriverError;
use super::node::NodeId;

/// Errors raised by scene graph operations
#[derive(Error, Debug)]
pub enum SceneError {
    /// The id does not resolve to a live node
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Reparenting would make a node its own ancestor
    #[error("Cycle detected: {child:?} is an ancestor of {parent:?}")]
    CycleDetected {
        /// Requested parent
        parent: NodeId,
        /// Node being reparented
        child: NodeId,
    },

    /// A node was added to itself
    #[error("Node {0:?} cannot be its own parent")]
    SelfParent(NodeId),

    /// The root node cannot be reparented or removed
    #[error("The root node cannot be reparented or removed")]
    RootImmutable,

    /// The node exists but is not a camera
    #[error("Node {0:?} is not a camera")]
    NotACamera(NodeId),

    /// A mesh could not be provided by the cache or any loader
    #[error("Mesh unavailable: {0}")]
    MeshUnavailable(String),

    /// The video driver failed during the draw phase
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
