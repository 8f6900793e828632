//! Video driver boundary
//!
//! The scene manager never talks to a graphics API directly. Everything it
//! needs from a backend goes through the [`VideoDriver`] trait: frame
//! bracketing, transform and material state, indexed triangle submission,
//! hardware lights and stencil shadows.
//!
//! ## Architecture
//!
//! ```text
//! SceneManager::draw_all ──► RenderContext ──► &mut dyn VideoDriver
//!                                                  │
//!                                  ┌───────────────┴──────────────┐
//!                                  ▼                              ▼
//!                           backend drivers                 NullDriver
//!                      (outside this crate)       (records DriverCommands)
//! ```

pub mod color;
pub mod light;
pub mod material;
pub mod null_driver;
pub mod vertex;

pub use color::{Color, Colorf};
pub use light::{LightData, LightType};
pub use material::{Material, MaterialFlags, MaterialType, TextureHandle, MATERIAL_MAX_TEXTURES};
pub use null_driver::{DriverCommand, NullDriver};
pub use vertex::Vertex;

use thiserror::Error;

use crate::foundation::math::{Mat4, Vec3};
use crate::scene::Aabb;

/// Errors surfaced by a video driver
///
/// Backends map their native failures onto these variants so that the scene
/// manager can propagate them without knowing the graphics API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// `begin_scene` was called while a scene was already open, or a draw
    /// call arrived outside `begin_scene`/`end_scene`
    #[error("Scene bracket violated: {0}")]
    SceneBracket(String),

    /// A draw call was rejected
    ///
    /// Typically caused by malformed index data or exceeded primitive limits.
    #[error("Drawing failed: {0}")]
    DrawFailed(String),

    /// A hardware light could not be created or toggled
    #[error("Light operation failed: {0}")]
    LightFailed(String),

    /// Backend-specific error
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Transform slots the driver keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformState {
    /// Object to world
    World,
    /// World to camera
    View,
    /// Camera to clip space
    Projection,
}

/// Video driver contract consumed by the scene manager
///
/// All node `render` calls happen strictly between one `begin_scene` and
/// the matching `end_scene`.
pub trait VideoDriver {
    /// Open a frame, optionally clearing colour and depth
    fn begin_scene(&mut self, clear_back_buffer: bool, clear_z_buffer: bool, color: Color) -> DriverResult<()>;

    /// Close the frame opened by `begin_scene`
    fn end_scene(&mut self) -> DriverResult<()>;

    /// Bind a matrix to a transform slot
    fn set_transform(&mut self, state: TransformState, matrix: &Mat4);

    /// Current matrix of a transform slot
    fn transform(&self, state: TransformState) -> Mat4;

    /// Bind a material for subsequent draws
    fn set_material(&mut self, material: &Material);

    /// Draw an indexed triangle list; `indices.len()` must be a multiple of 3
    fn draw_indexed_triangle_list(&mut self, vertices: &[Vertex], indices: &[u16]) -> DriverResult<()>;

    /// Draw a wireframe box in world space, used for debug data
    fn draw_3d_box(&mut self, aabb: &Aabb, color: Color);

    /// Draw a line in world space, used for debug data
    fn draw_3d_line(&mut self, start: Vec3, end: Vec3, color: Color);

    /// Add a shadow volume to the stencil buffer
    ///
    /// `triangles` holds three world-space points per triangle. `z_fail`
    /// selects the depth-fail technique, needed when the camera is inside
    /// the volume.
    fn draw_stencil_shadow_volume(&mut self, triangles: &[Vec3], z_fail: bool) -> DriverResult<()>;

    /// Fill the shadowed pixels of the stencil buffer with a colour
    fn draw_stencil_shadow(&mut self, clear_stencil_buffer: bool, color: Color) -> DriverResult<()>;

    /// Remove all hardware lights added this frame
    fn delete_all_dynamic_lights(&mut self);

    /// Add a hardware light and return its index
    fn add_dynamic_light(&mut self, light: &LightData) -> DriverResult<usize>;

    /// Switch a hardware light on or off
    fn turn_light_on(&mut self, index: usize, on: bool);

    /// Number of hardware lights the device supports simultaneously
    fn max_dynamic_light_count(&self) -> usize;

    /// Number of hardware lights currently added
    fn dynamic_light_count(&self) -> usize;

    /// Set the global ambient light
    fn set_ambient_light(&mut self, color: Colorf);

    /// Current frames per second
    fn fps(&self) -> u32;

    /// Primitives drawn during the last completed frame
    fn primitive_count_drawn(&self) -> u32;

    /// Size of the render target in pixels
    fn screen_size(&self) -> (u32, u32);
}
