//! Node kinds and the contexts they run in
//!
//! A [`SceneNodeKind`] is the part of a node that varies: how it registers,
//! what it draws and which bounds and materials it exposes. The scene
//! manager calls it through two short-lived contexts:
//!
//! - [`RegisterContext`] during the registration traversal, to request
//!   render passes.
//! - [`RenderContext`] during the draw phase, to submit geometry.
//!
//! `RenderContext` can only be built by the scene manager, so `render` is
//! unreachable outside the draw phase.

use std::any::Any;

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::video::{DriverResult, LightData, Material, VideoDriver};

use super::aabb::Aabb;
use super::node::{DebugData, NodeId};
use super::nodes::camera::CameraState;
use super::render_queue::RenderPass;

/// Type tag of a node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneNodeType {
    /// Grouping node without geometry
    Empty,
    /// Static mesh
    Mesh,
    /// Camera
    Camera,
    /// Dynamic light
    Light,
    /// Camera-facing quad
    Billboard,
    /// Six-sided background box
    SkyBox,
    /// Particle emitter
    ParticleSystem,
    /// Stencil shadow volume
    ShadowVolume,
    /// Tessellated sphere
    Sphere,
    /// Additive light shafts
    VolumeLight,
    /// User-defined kind
    Custom(u32),
}

/// Behaviour of a scene node
///
/// Only `node_type`, `bounding_box`, `render` and the `Any` accessors are
/// required. The default registration requests [`RenderPass::Automatic`].
pub trait SceneNodeKind: 'static {
    /// Type tag
    fn node_type(&self) -> SceneNodeType;

    /// Request render passes for this frame
    ///
    /// Called once per frame for every node whose ancestors are all visible.
    fn on_register(&mut self, ctx: &mut RegisterContext<'_>) {
        ctx.register(RenderPass::Automatic);
    }

    /// Per-frame update before animators run
    fn on_animate(&mut self, _time_ms: u32) {}

    /// Submit geometry for the pass in `ctx`
    fn render(&mut self, ctx: &mut RenderContext<'_>) -> DriverResult<()>;

    /// Bounding box in local space
    fn bounding_box(&self) -> Aabb;

    /// Materials used by this node
    fn materials(&self) -> &[Material] {
        &[]
    }

    /// Mutable materials used by this node
    fn materials_mut(&mut self) -> &mut [Material] {
        &mut []
    }

    /// Upcast for downcasting to the concrete kind
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete kind
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Registration-time view of a node and the frame
#[derive(Debug)]
pub struct RegisterContext<'a> {
    node: NodeId,
    absolute: &'a Mat4,
    time_ms: u32,
    is_active_camera: bool,
    camera_position: Option<Vec3>,
    requested: Vec<RenderPass>,
    skip_children: bool,
}

impl<'a> RegisterContext<'a> {
    pub(crate) fn new(
        node: NodeId,
        absolute: &'a Mat4,
        time_ms: u32,
        is_active_camera: bool,
        camera_position: Option<Vec3>,
    ) -> Self {
        Self {
            node,
            absolute,
            time_ms,
            is_active_camera,
            camera_position,
            requested: Vec::new(),
            skip_children: false,
        }
    }

    /// Ask to be drawn in `pass`; may be called for several passes
    pub fn register(&mut self, pass: RenderPass) {
        if !self.requested.contains(&pass) {
            self.requested.push(pass);
        }
    }

    /// Do not register this node's children this frame
    pub fn skip_children(&mut self) {
        self.skip_children = true;
    }

    /// The registering node
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The node's absolute transformation
    pub fn absolute_transformation(&self) -> &Mat4 {
        self.absolute
    }

    /// The node's world-space position
    pub fn absolute_position(&self) -> Vec3 {
        self.absolute.translation()
    }

    /// Current animation time in milliseconds
    pub fn time_ms(&self) -> u32 {
        self.time_ms
    }

    /// Whether the registering node is the active camera
    pub fn is_active_camera(&self) -> bool {
        self.is_active_camera
    }

    /// World-space position of the active camera, if any
    pub fn camera_position(&self) -> Option<Vec3> {
        self.camera_position
    }

    pub(crate) fn into_parts(self) -> (Vec<RenderPass>, bool) {
        (self.requested, self.skip_children)
    }
}

/// A light bound during this frame's light pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveLight {
    /// Light node
    pub node: NodeId,
    /// Light parameters in world space
    pub data: LightData,
}

/// Draw-time view of a node, the driver and the frame
pub struct RenderContext<'a> {
    driver: &'a mut dyn VideoDriver,
    pass: RenderPass,
    node: NodeId,
    absolute: Mat4,
    debug_data: DebugData,
    camera: Option<&'a CameraState>,
    lights: &'a [ActiveLight],
    shadow_volumes: &'a mut usize,
    lights_bound: &'a mut Vec<ActiveLight>,
}

impl std::fmt::Debug for RenderContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("pass", &self.pass)
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl<'a> RenderContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        driver: &'a mut dyn VideoDriver,
        pass: RenderPass,
        node: NodeId,
        absolute: Mat4,
        debug_data: DebugData,
        camera: Option<&'a CameraState>,
        lights: &'a [ActiveLight],
        shadow_volumes: &'a mut usize,
        lights_bound: &'a mut Vec<ActiveLight>,
    ) -> Self {
        Self {
            driver,
            pass,
            node,
            absolute,
            debug_data,
            camera,
            lights,
            shadow_volumes,
            lights_bound,
        }
    }

    /// The video driver
    pub fn driver(&mut self) -> &mut dyn VideoDriver {
        &mut *self.driver
    }

    /// Pass being drawn
    pub fn pass(&self) -> RenderPass {
        self.pass
    }

    /// The node being drawn
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The node's absolute transformation
    pub fn absolute_transformation(&self) -> &Mat4 {
        &self.absolute
    }

    /// Debug geometry requested for the node
    pub fn debug_data(&self) -> DebugData {
        self.debug_data
    }

    /// Active camera state, `None` when no camera is active
    pub fn camera(&self) -> Option<&CameraState> {
        self.camera
    }

    /// Lights bound in this frame's light pass
    ///
    /// Empty while the light pass itself is being drawn.
    pub fn lights(&self) -> &[ActiveLight] {
        self.lights
    }

    /// Submit a stencil shadow volume and record it for the shadow fill
    pub fn draw_shadow_volume(&mut self, triangles: &[Vec3], z_fail: bool) -> DriverResult<()> {
        self.driver.draw_stencil_shadow_volume(triangles, z_fail)?;
        *self.shadow_volumes += 1;
        Ok(())
    }

    /// Add a hardware light for this frame and record it as active
    pub fn bind_light(&mut self, data: &LightData) -> DriverResult<usize> {
        let index = self.driver.add_dynamic_light(data)?;
        self.lights_bound.push(ActiveLight { node: self.node, data: *data });
        Ok(index)
    }
}
