//! Scene manager and per-frame scheduler
//!
//! The [`SceneManager`] owns the scene graph, the render queue, the active
//! camera and light state and drives one frame per [`SceneManager::draw_all`]
//! call:
//!
//! 1. Run node `on_animate` hooks and animators against the virtual clock.
//! 2. Recompute absolute transformations from the root down.
//! 3. Update the active camera's matrices and frustum.
//! 4. Clear the render queue and let every visible node register, culling
//!    against the frustum where the node allows it.
//! 5. Sort the queue and draw the passes in [`RenderPass::DRAW_ORDER`],
//!    binding lights in the light pass.
//! 6. Remove the nodes queued for deletion during the frame.
//!
//! The video driver is borrowed for the duration of a frame only, so the
//! manager can be driven by any [`VideoDriver`] implementation.

use std::rc::Rc;

use crate::collision::{Ray, RayHit, Triangle, TriangleHit};
use crate::config::SceneConfig;
use crate::foundation::logging::{debug, info, trace, warn};
use crate::foundation::math::{Mat4Ext, Vec2, Vec3, Vec4};
use crate::foundation::time::VirtualTimer;
use crate::video::{Color, Colorf, DriverResult, LightData, TextureHandle, TransformState, VideoDriver};

use super::aabb::Aabb;
use super::animators::AnimatorContext;
use super::error::{SceneError, SceneResult};
use super::graph::SceneGraph;
use super::kind::{ActiveLight, RegisterContext, RenderContext, SceneNodeKind, SceneNodeType};
use super::light_manager::LightManager;
use super::mesh::{GeometryCreator, MeshCache, MeshLoader, StaticMesh};
use super::node::{AutomaticCulling, DebugData, NodeId, SceneNode};
use super::nodes::{
    debug_material, BillboardNode, CameraNode, CameraState, EmptyNode, LightNode, MeshNode,
    ParticleEmitter, ParticleSystemNode, ShadowVolumeNode, SkyBoxNode, SphereNode, VolumeLightNode,
    DEBUG_BOX_COLOR,
};
use super::nodes::shadow_volume::DEFAULT_INFINITY;
use super::render_queue::{RenderEntry, RenderPass, RenderQueue};
use super::selectors::{
    BoxTriangleSelector, MeshTriangleSelector, MetaTriangleSelector, OctreeTriangleSelector,
    TriangleOctreeConfig, TriangleQuery, TriangleSelector,
};

/// Counters for one render pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Nodes queued for the pass
    pub registered: usize,
    /// Registrations rejected by frustum culling
    pub culled: usize,
    /// Nodes drawn
    pub rendered: usize,
}

/// What happened during one `draw_all` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// Animation time of the frame
    pub time_ms: u32,
    /// Counters per pass, in [`RenderPass::DRAW_ORDER`]
    pub passes: [PassStats; 7],
    /// Hardware lights bound in the light pass
    pub lights_bound: usize,
    /// Shadow volumes submitted in the shadow pass
    pub shadow_volumes: usize,
    /// Nodes removed from the deletion queue after drawing
    pub nodes_deleted: usize,
}

impl FrameStats {
    /// Counters of one pass; all zero for `Automatic`
    pub fn pass(&self, pass: RenderPass) -> PassStats {
        pass.slot().map_or_else(PassStats::default, |slot| self.passes[slot])
    }

    fn pass_mut(&mut self, pass: RenderPass) -> Option<&mut PassStats> {
        pass.slot().map(|slot| &mut self.passes[slot])
    }

    /// Nodes queued over all passes
    pub fn total_registered(&self) -> usize {
        self.passes.iter().map(|p| p.registered).sum()
    }

    /// Registrations culled over all passes
    pub fn total_culled(&self) -> usize {
        self.passes.iter().map(|p| p.culled).sum()
    }

    /// Nodes drawn over all passes
    pub fn total_rendered(&self) -> usize {
        self.passes.iter().map(|p| p.rendered).sum()
    }
}

/// Owner of a scene and scheduler of its frames
pub struct SceneManager {
    config: SceneConfig,
    graph: SceneGraph,
    queue: RenderQueue,
    active_camera: Option<NodeId>,
    camera_state: Option<CameraState>,
    active_lights: Vec<ActiveLight>,
    ambient_light: Colorf,
    shadow_color: Color,
    light_manager: Option<Box<dyn LightManager>>,
    deletion_queue: Vec<NodeId>,
    timer: VirtualTimer,
    mesh_cache: MeshCache,
    mesh_loaders: Vec<Box<dyn MeshLoader>>,
    last_stats: FrameStats,
}

impl std::fmt::Debug for SceneManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneManager")
            .field("nodes", &self.graph.len())
            .field("active_camera", &self.active_camera)
            .field("active_lights", &self.active_lights.len())
            .field("light_manager", &self.light_manager.is_some())
            .field("time_ms", &self.timer.time_ms())
            .finish_non_exhaustive()
    }
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneManager {
    /// Create a scene manager with default configuration
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    /// Create a scene manager with custom configuration
    pub fn with_config(config: SceneConfig) -> Self {
        info!(
            "Creating scene manager (culling: {}, queue capacity: {})",
            config.culling_enabled, config.queue_capacity
        );
        Self {
            graph: SceneGraph::new(&config.root_name),
            queue: RenderQueue::with_capacity(config.queue_capacity),
            active_camera: None,
            camera_state: None,
            active_lights: Vec::new(),
            ambient_light: config.ambient_light,
            shadow_color: config.shadow_color,
            light_manager: None,
            deletion_queue: Vec::new(),
            timer: VirtualTimer::new(),
            mesh_cache: MeshCache::new(),
            mesh_loaders: Vec::new(),
            last_stats: FrameStats::default(),
            config,
        }
    }

    /// Load the configuration from a `.toml` or `.ron` file
    pub fn from_config_file(path: &str) -> SceneResult<Self> {
        use crate::config::Config;
        let config = SceneConfig::load_from_file(path)?;
        Ok(Self::with_config(config))
    }

    /// Active configuration
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    // --- Tree access ---

    /// The scene graph
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// The scene graph, for structural changes between frames
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// The root node
    pub fn root(&self) -> NodeId {
        self.graph.root()
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.graph.get(id)
    }

    /// Look up a node mutably
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.graph.get_mut(id)
    }

    /// Reparent `child` under `parent`
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.graph.add_child(parent, child)
    }

    /// Remove a node and its subtree immediately
    ///
    /// Must not be called while a frame is being drawn; animators use
    /// [`AnimatorContext::queue_deletion`] instead.
    pub fn remove_node(&mut self, id: NodeId) -> SceneResult<usize> {
        let removed = self.graph.remove(id)?;
        self.forget_removed_nodes();
        Ok(removed)
    }

    /// Remove every node below the root
    pub fn clear(&mut self) {
        self.graph.clear();
        self.queue.clear();
        self.deletion_queue.clear();
        self.forget_removed_nodes();
        debug!("Cleared scene");
    }

    fn forget_removed_nodes(&mut self) {
        if self.active_camera.is_some_and(|id| !self.graph.contains(id)) {
            self.active_camera = None;
            self.camera_state = None;
        }
        let graph = &self.graph;
        self.active_lights.retain(|light| graph.contains(light.node));
    }

    // --- Node factories ---

    /// Insert a prepared node under `parent` (the root when `None`)
    pub fn add_node(&mut self, node: SceneNode, parent: Option<NodeId>) -> SceneResult<NodeId> {
        self.graph.insert(node, parent)
    }

    /// Add a node of a user-defined kind
    pub fn add_custom_node(&mut self, kind: Box<dyn SceneNodeKind>, parent: Option<NodeId>) -> SceneResult<NodeId> {
        self.add_node(SceneNode::new(kind), parent)
    }

    /// Add a grouping node
    pub fn add_empty_node(&mut self, parent: Option<NodeId>) -> SceneResult<NodeId> {
        self.add_custom_node(Box::new(EmptyNode::new()), parent)
    }

    /// Add a node drawing `mesh`
    ///
    /// Returns `Ok(None)` and creates nothing when the mesh is absent, for
    /// example after a failed [`get_mesh`](Self::get_mesh).
    pub fn add_mesh_node(&mut self, mesh: Option<Rc<StaticMesh>>, parent: Option<NodeId>) -> SceneResult<Option<NodeId>> {
        let Some(mesh) = mesh else {
            warn!("No mesh given, mesh node not created");
            return Ok(None);
        };
        self.add_custom_node(Box::new(MeshNode::new(mesh)), parent).map(Some)
    }

    /// Add a mesh node showing a cube with the given edge length
    pub fn add_cube_node(&mut self, size: f32, parent: Option<NodeId>) -> SceneResult<NodeId> {
        let cube = Rc::new(GeometryCreator::cube(Vec3::repeat(size)));
        self.add_custom_node(Box::new(MeshNode::new(cube)), parent)
    }

    /// Add a sphere; `poly_count` sets the segments around and between the poles
    pub fn add_sphere_node(&mut self, radius: f32, poly_count: u16, parent: Option<NodeId>) -> SceneResult<NodeId> {
        self.add_custom_node(Box::new(SphereNode::new(radius, poly_count)), parent)
    }

    /// Add light shafts fading from `foot` to `tail`
    pub fn add_volume_light_node(
        &mut self,
        parent: Option<NodeId>,
        subdivisions: (u16, u16),
        foot: Color,
        tail: Color,
        position: Vec3,
    ) -> SceneResult<NodeId> {
        let (u, v) = subdivisions;
        let mut node = SceneNode::new(Box::new(VolumeLightNode::new(u, v, foot, tail)));
        node.set_position(position);
        self.add_node(node, parent)
    }

    /// Add a camera at `position` looking at `target`
    ///
    /// The camera becomes the active one if no camera is active yet.
    pub fn add_camera_node(&mut self, parent: Option<NodeId>, position: Vec3, target: Vec3) -> SceneResult<NodeId> {
        let mut node = SceneNode::new(Box::new(CameraNode::new(target)));
        node.set_position(position);
        let id = self.add_node(node, parent)?;

        if self.active_camera.is_none() {
            self.active_camera = Some(id);
            debug!("Camera {id:?} is now active");
        }
        Ok(id)
    }

    /// Add a dynamic light at `position`
    pub fn add_light_node(&mut self, parent: Option<NodeId>, position: Vec3, light: LightData) -> SceneResult<NodeId> {
        let mut node = SceneNode::new(Box::new(LightNode::new(light)));
        node.set_position(position);
        self.add_node(node, parent)
    }

    /// Add a camera-facing quad of the given size
    pub fn add_billboard_node(&mut self, parent: Option<NodeId>, size: Vec2, position: Vec3) -> SceneResult<NodeId> {
        let mut node = SceneNode::new(Box::new(BillboardNode::new(size)));
        node.set_position(position);
        self.add_node(node, parent)
    }

    /// Add a sky box with textures for +Z, -Z, +X, -X, +Y and -Y
    pub fn add_sky_box_node(&mut self, textures: [Option<TextureHandle>; 6], parent: Option<NodeId>) -> SceneResult<NodeId> {
        let mut node = SceneNode::new(Box::new(SkyBoxNode::new(textures)));
        node.set_automatic_culling(AutomaticCulling::Off);
        self.add_node(node, parent)
    }

    /// Add a particle system, optionally with an emitter
    pub fn add_particle_system_node(
        &mut self,
        parent: Option<NodeId>,
        emitter: Option<Box<dyn ParticleEmitter>>,
    ) -> SceneResult<NodeId> {
        self.add_custom_node(Box::new(ParticleSystemNode::new(emitter)), parent)
    }

    /// Add a shadow volume cast by `mesh`, usually as a child of the node
    /// drawing that mesh
    ///
    /// Returns `Ok(None)` and creates nothing when the mesh is absent. The
    /// node is never culled: a shadow can be visible while its caster is not.
    pub fn add_shadow_volume_node(
        &mut self,
        mesh: Option<Rc<StaticMesh>>,
        parent: Option<NodeId>,
        z_fail: bool,
    ) -> SceneResult<Option<NodeId>> {
        let Some(mesh) = mesh else {
            warn!("No mesh given, shadow volume not created");
            return Ok(None);
        };
        let mut node = SceneNode::new(Box::new(ShadowVolumeNode::new(mesh, z_fail, DEFAULT_INFINITY)));
        node.set_automatic_culling(AutomaticCulling::Off);
        self.add_node(node, parent).map(Some)
    }

    // --- Search ---

    /// First node with the given user id, depth first below `start`
    /// (the root when `None`)
    pub fn node_from_id(&self, id: i32, start: Option<NodeId>) -> Option<NodeId> {
        self.find(start, |node| node.id() == id)
    }

    /// First node with the given name, depth first below `start`
    pub fn node_from_name(&self, name: &str, start: Option<NodeId>) -> Option<NodeId> {
        self.find(start, |node| node.name() == name)
    }

    /// Every node of the given type below `start`, depth first
    pub fn nodes_of_type(&self, node_type: SceneNodeType, start: Option<NodeId>) -> Vec<NodeId> {
        let start = start.unwrap_or_else(|| self.graph.root());
        self.graph
            .descendants(start)
            .into_iter()
            .filter(|id| self.graph.get(*id).is_some_and(|n| n.node_type() == node_type))
            .collect()
    }

    fn find(&self, start: Option<NodeId>, predicate: impl Fn(&SceneNode) -> bool) -> Option<NodeId> {
        let start = start.unwrap_or_else(|| self.graph.root());
        self.graph
            .descendants(start)
            .into_iter()
            .find(|id| self.graph.get(*id).is_some_and(&predicate))
    }

    // --- Camera, lights and global colours ---

    /// The active camera node
    pub fn active_camera(&self) -> Option<NodeId> {
        self.active_camera
    }

    /// Make `camera` the active camera, or clear it with `None`
    ///
    /// The previous camera stays in the tree.
    pub fn set_active_camera(&mut self, camera: Option<NodeId>) -> SceneResult<()> {
        if let Some(id) = camera {
            if self.graph.node(id)?.kind_as::<CameraNode>().is_none() {
                return Err(SceneError::NotACamera(id));
            }
        }
        self.active_camera = camera;
        self.camera_state = None;
        Ok(())
    }

    /// Camera state of the last frame
    pub fn camera_state(&self) -> Option<&CameraState> {
        self.camera_state.as_ref()
    }

    /// Lights bound in the last frame, in binding order
    pub fn active_lights(&self) -> &[ActiveLight] {
        &self.active_lights
    }

    /// Global ambient light
    pub fn ambient_light(&self) -> Colorf {
        self.ambient_light
    }

    /// Set the global ambient light
    pub fn set_ambient_light(&mut self, color: Colorf) {
        self.ambient_light = color;
    }

    /// Colour of stencil shadows
    pub fn shadow_color(&self) -> Color {
        self.shadow_color
    }

    /// Set the colour of stencil shadows
    pub fn set_shadow_color(&mut self, color: Color) {
        self.shadow_color = color;
    }

    /// Install or remove the light manager hook
    pub fn set_light_manager(&mut self, light_manager: Option<Box<dyn LightManager>>) {
        self.light_manager = light_manager;
    }

    /// Whether a light manager is installed
    pub fn has_light_manager(&self) -> bool {
        self.light_manager.is_some()
    }

    // --- Frame state ---

    /// Render queue of the last frame
    pub fn render_queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// Statistics of the last frame
    pub fn last_frame_stats(&self) -> &FrameStats {
        &self.last_stats
    }

    /// Animation clock
    pub fn timer(&self) -> &VirtualTimer {
        &self.timer
    }

    /// Mutable animation clock
    pub fn timer_mut(&mut self) -> &mut VirtualTimer {
        &mut self.timer
    }

    /// Queue a node for removal after the current frame is drawn
    pub fn add_to_deletion_queue(&mut self, id: NodeId) {
        if !self.deletion_queue.contains(&id) {
            self.deletion_queue.push(id);
        }
    }

    /// Nodes waiting for removal
    pub fn deletion_queue(&self) -> &[NodeId] {
        &self.deletion_queue
    }

    /// Remove every queued node now
    ///
    /// Returns the number of nodes removed, descendants included.
    pub fn clear_deletion_queue(&mut self) -> usize {
        let mut removed = 0;
        for id in std::mem::take(&mut self.deletion_queue) {
            // Already gone with an ancestor queued before it
            if !self.graph.contains(id) {
                continue;
            }
            match self.graph.remove(id) {
                Ok(count) => removed += count,
                Err(e) => warn!("Could not remove queued node {id:?}: {e}"),
            }
        }
        if removed > 0 {
            self.forget_removed_nodes();
        }
        removed
    }

    // --- Meshes ---

    /// Register a mesh loader; later loaders take precedence
    pub fn add_mesh_loader(&mut self, loader: Box<dyn MeshLoader>) {
        self.mesh_loaders.push(loader);
    }

    /// Mesh cached under `path`, loading it on first use
    ///
    /// Returns `None` and logs a warning when no loader can provide it.
    pub fn get_mesh(&mut self, path: &str) -> Option<Rc<StaticMesh>> {
        self.mesh_cache.get_or_load(path, &self.mesh_loaders)
    }

    /// Loaded meshes
    pub fn mesh_cache(&self) -> &MeshCache {
        &self.mesh_cache
    }

    /// Loaded meshes, for adding procedural ones under a name
    pub fn mesh_cache_mut(&mut self) -> &mut MeshCache {
        &mut self.mesh_cache
    }

    // --- Triangle selectors ---

    /// Selector over every triangle of `mesh`, following `node`
    pub fn create_triangle_selector(&self, mesh: &StaticMesh, node: Option<NodeId>) -> Rc<dyn TriangleSelector> {
        Rc::new(MeshTriangleSelector::new(mesh, node))
    }

    /// Selector over the twelve triangles of a node's bounding box
    pub fn create_triangle_selector_from_bounding_box(&self, node: NodeId) -> Rc<dyn TriangleSelector> {
        Rc::new(BoxTriangleSelector::new(node))
    }

    /// Octree selector over `mesh`, following `node`
    pub fn create_octree_triangle_selector(
        &self,
        mesh: &StaticMesh,
        node: Option<NodeId>,
        min_triangles_per_node: usize,
    ) -> Rc<dyn TriangleSelector> {
        let config = TriangleOctreeConfig {
            min_triangles_per_node,
            ..TriangleOctreeConfig::default()
        };
        Rc::new(OctreeTriangleSelector::new(mesh, node, config))
    }

    /// Empty selector aggregating other selectors
    pub fn create_meta_triangle_selector(&self) -> MetaTriangleSelector {
        MetaTriangleSelector::new()
    }

    // --- Picking ---

    /// Nearest visible, non-debug node whose world bounding box the ray hits
    ///
    /// With a non-zero `id_mask` only nodes whose user id shares a bit with
    /// the mask are considered. Uses the absolute transformations of the
    /// last transform update.
    pub fn node_from_ray(&self, ray: &Ray, id_mask: i32) -> Option<RayHit> {
        self.pick(ray, id_mask, None)
    }

    /// Node the active camera looks at, by bounding box
    ///
    /// The camera itself is never returned.
    pub fn node_from_camera(&self, id_mask: i32) -> Option<RayHit> {
        let camera = self.camera_state.as_ref()?;
        let ray = Ray::from_points(camera.position, camera.target);
        self.pick(&ray, id_mask, self.active_camera)
    }

    fn pick(&self, ray: &Ray, id_mask: i32, exclude: Option<NodeId>) -> Option<RayHit> {
        let root = self.graph.root();
        let mut best: Option<RayHit> = None;
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            let Some(node) = self.graph.get(id) else { continue };
            if !node.is_visible() {
                continue;
            }
            stack.extend(node.children().iter().copied());

            if id == root
                || Some(id) == exclude
                || node.is_debug_object()
                || (id_mask != 0 && node.id() & id_mask == 0)
            {
                continue;
            }
            let Some(distance) = node.transformed_bounding_box().intersect_ray(ray.origin, ray.direction) else {
                continue;
            };
            if best.map_or(true, |hit| distance < hit.distance) {
                best = Some(RayHit {
                    node: id,
                    distance,
                    point: ray.point_at(distance),
                });
            }
        }
        best
    }

    /// World-space ray through a pixel of the active camera's view
    ///
    /// # Arguments
    /// * `x`, `y` - Pixel coordinates, origin at the top left
    /// * `viewport` - Width and height of the render target in pixels
    ///
    /// # Returns
    /// `None` without a camera state from a drawn frame or with an empty
    /// viewport
    pub fn ray_from_screen(&self, x: f32, y: f32, viewport: (u32, u32)) -> Option<Ray> {
        let camera = self.camera_state.as_ref()?;
        if viewport.0 == 0 || viewport.1 == 0 {
            return None;
        }
        let inverse = camera.view_projection().try_inverse()?;

        #[allow(clippy::cast_precision_loss)]
        let (width, height) = (viewport.0 as f32, viewport.1 as f32);
        let ndc_x = 2.0 * x / width - 1.0;
        let ndc_y = 1.0 - 2.0 * y / height;

        let unproject = |z: f32| {
            let clip = inverse * Vec4::new(ndc_x, ndc_y, z, 1.0);
            (clip.w.abs() > f32::EPSILON).then(|| clip.xyz() / clip.w)
        };
        let near = unproject(-1.0)?;
        let far = unproject(1.0)?;
        Some(Ray::from_points(near, far))
    }

    /// Pixel position of a world-space point in the active camera's view
    ///
    /// Returns `None` for points behind the camera or without a camera
    /// state.
    pub fn screen_coordinates(&self, position: Vec3, viewport: (u32, u32)) -> Option<Vec2> {
        let camera = self.camera_state.as_ref()?;
        let clip = camera.view_projection() * Vec4::new(position.x, position.y, position.z, 1.0);
        if clip.w <= 0.0 {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let (width, height) = (viewport.0 as f32, viewport.1 as f32);
        let ndc = clip.xyz() / clip.w;
        Some(Vec2::new((ndc.x + 1.0) * 0.5 * width, (1.0 - ndc.y) * 0.5 * height))
    }

    /// Nearest triangle of `selector` hit by `ray` within `max_distance`
    pub fn collision_point(&self, ray: &Ray, max_distance: f32, selector: &dyn TriangleSelector) -> Option<TriangleHit> {
        let end = ray.point_at(max_distance);
        let mut bounds = Aabb::from_point(ray.origin);
        bounds.add_point(end);

        let mut candidates = Vec::new();
        selector.get_triangles_with_owner(&self.graph, &TriangleQuery::in_box(bounds), &mut candidates);

        candidates
            .into_iter()
            .filter_map(|(triangle, node): (Triangle, Option<NodeId>)| {
                let (distance, _, _) = triangle.intersect_ray(ray)?;
                (distance <= max_distance).then(|| TriangleHit {
                    triangle,
                    distance,
                    point: ray.point_at(distance),
                    node,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    // --- Frame ---

    /// Open a frame on the driver, clearing to the configured colour
    pub fn begin_frame(&mut self, driver: &mut dyn VideoDriver) -> SceneResult<()> {
        driver.begin_scene(true, true, self.config.clear_color)?;
        Ok(())
    }

    /// Close the frame opened by [`begin_frame`](Self::begin_frame)
    pub fn end_frame(&mut self, driver: &mut dyn VideoDriver) -> SceneResult<()> {
        driver.end_scene()?;
        Ok(())
    }

    /// Animate, register and draw the whole scene
    ///
    /// Must be called between `begin_scene` and `end_scene` of `driver`.
    /// Nodes queued for deletion are removed before returning, also when
    /// the driver fails mid-frame.
    pub fn draw_all(&mut self, driver: &mut dyn VideoDriver) -> SceneResult<FrameStats> {
        let time_ms = self.timer.time_ms();
        let mut stats = FrameStats {
            time_ms,
            ..FrameStats::default()
        };

        self.animate(time_ms);
        self.graph.update_absolute_transforms();
        self.camera_state = self.update_camera();

        self.queue.clear();
        self.register(time_ms, &mut stats);
        self.queue.sort();

        let drawn = self.draw_passes(driver, &mut stats);
        if let Some(light_manager) = &mut self.light_manager {
            light_manager.on_post_render();
        }
        stats.nodes_deleted = self.clear_deletion_queue();
        drawn?;

        trace!(
            "Frame at {time_ms}ms: {} registered, {} culled, {} rendered, {} lights",
            stats.total_registered(),
            stats.total_culled(),
            stats.total_rendered(),
            stats.lights_bound
        );
        self.last_stats = stats.clone();
        Ok(stats)
    }

    /// Run `on_animate` and the animators of every node in reach
    fn animate(&mut self, time_ms: u32) {
        let mut order = Vec::new();
        let mut stack = vec![self.graph.root()];
        while let Some(id) = stack.pop() {
            let Some(node) = self.graph.get(id) else { continue };
            if !node.is_visible() && !self.config.animate_hidden_nodes {
                continue;
            }
            order.push(id);
            stack.extend(node.children().iter().rev());
        }

        for id in order {
            let Some(node) = self.graph.get_mut(id) else { continue };
            node.kind.on_animate(time_ms);
            if node.animators.is_empty() {
                continue;
            }

            let mut animators = std::mem::take(&mut node.animators);
            let mut ctx = AnimatorContext::new(&mut self.graph, &mut self.deletion_queue);
            for animator in &mut animators {
                animator.animate_node(&mut ctx, id, time_ms);
            }

            // Animators added while running go after the existing ones
            if let Some(node) = self.graph.get_mut(id) {
                let added = std::mem::replace(&mut node.animators, animators);
                node.animators.extend(added);
            }
        }
    }

    fn update_camera(&mut self) -> Option<CameraState> {
        let id = self.active_camera?;
        let Some(node) = self.graph.get_mut(id) else {
            warn!("Active camera {id:?} no longer exists");
            self.active_camera = None;
            return None;
        };
        let absolute = *node.absolute_transformation();
        node.kind_as_mut::<CameraNode>().map(|camera| camera.update_matrices(&absolute))
    }

    fn register(&mut self, time_ms: u32, stats: &mut FrameStats) {
        let camera_position = self.camera_state.as_ref().map(|c| c.position);
        let frustum = self
            .camera_state
            .as_ref()
            .filter(|_| self.config.culling_enabled)
            .map(|c| c.frustum);

        let mut stack = vec![self.graph.root()];
        while let Some(id) = stack.pop() {
            let Some(node) = self.graph.get_mut(id) else { continue };
            // A hidden node hides its whole subtree
            if !node.visible {
                continue;
            }

            let absolute = node.absolute;
            let mut ctx = RegisterContext::new(id, &absolute, time_ms, self.active_camera == Some(id), camera_position);
            node.kind.on_register(&mut ctx);
            let (passes, skip_children) = ctx.into_parts();

            for requested in passes {
                let pass = match requested {
                    RenderPass::Automatic if node.has_transparent_material() => RenderPass::Transparent,
                    RenderPass::Automatic => RenderPass::Solid,
                    other => other,
                };

                let culled = pass.is_culled()
                    && node.culling == AutomaticCulling::BoundingBox
                    && frustum.is_some_and(|f| !f.intersects_aabb(&node.transformed_bounding_box()));
                let Some(pass_stats) = stats.pass_mut(pass) else { continue };
                if culled {
                    pass_stats.culled += 1;
                    continue;
                }

                let distance_sq = camera_position.map_or(0.0, |c| (absolute.translation() - c).norm_squared());
                let material_key = node.kind.materials().first().map_or(0, |m| m.sort_key());
                if self.queue.push(RenderEntry {
                    node: id,
                    pass,
                    distance_sq,
                    material_key,
                }) {
                    pass_stats.registered += 1;
                }
            }

            if !skip_children {
                stack.extend(node.children.iter().rev());
            }
        }
    }

    fn draw_passes(&mut self, driver: &mut dyn VideoDriver, stats: &mut FrameStats) -> SceneResult<()> {
        self.active_lights.clear();
        let mut shadow_volumes = 0;
        let mut debug_drawn: Vec<NodeId> = Vec::new();

        for pass in RenderPass::DRAW_ORDER {
            if let Some(light_manager) = &mut self.light_manager {
                light_manager.on_render_pass_pre_render(pass);
            }

            let entries: Vec<RenderEntry> = match pass {
                RenderPass::Light => self.prepare_lights(driver),
                _ => self.queue.entries(pass).to_vec(),
            };

            for entry in &entries {
                let per_node_hooks = !matches!(pass, RenderPass::Camera | RenderPass::Light);
                if per_node_hooks {
                    if let Some(light_manager) = &mut self.light_manager {
                        light_manager.on_node_pre_render(entry.node, &self.graph, driver);
                    }
                }

                if self.render_node(driver, pass, entry.node, &mut shadow_volumes)? {
                    if let Some(pass_stats) = stats.pass_mut(pass) {
                        pass_stats.rendered += 1;
                    }
                    if !debug_drawn.contains(&entry.node) && self.draw_debug_box(driver, entry.node) {
                        debug_drawn.push(entry.node);
                    }
                }

                if per_node_hooks {
                    if let Some(light_manager) = &mut self.light_manager {
                        light_manager.on_node_post_render(entry.node, &self.graph, driver);
                    }
                }
            }

            if pass == RenderPass::Shadow && shadow_volumes > 0 {
                driver.draw_stencil_shadow(true, self.shadow_color)?;
            }

            if let Some(light_manager) = &mut self.light_manager {
                light_manager.on_render_pass_post_render(pass);
            }
        }

        stats.lights_bound = self.active_lights.len();
        stats.shadow_volumes = shadow_volumes;
        Ok(())
    }

    /// Reset hardware lights and pick the light nodes to bind, in order
    fn prepare_lights(&mut self, driver: &mut dyn VideoDriver) -> Vec<RenderEntry> {
        driver.delete_all_dynamic_lights();
        driver.set_ambient_light(self.ambient_light);

        let mut entries = self.queue.entries(RenderPass::Light).to_vec();
        if let Some(light_manager) = &mut self.light_manager {
            let mut lights: Vec<NodeId> = entries.iter().map(|e| e.node).collect();
            light_manager.on_pre_render(&mut lights, &self.graph);
            let mut picked: Vec<RenderEntry> = Vec::with_capacity(lights.len());
            for id in lights {
                // Unknown ids are dropped, repeated ids bind once
                if picked.iter().any(|e| e.node == id) {
                    continue;
                }
                if let Some(entry) = entries.iter().find(|e| e.node == id) {
                    picked.push(*entry);
                }
            }
            return picked;
        }

        // Nearest lights win the hardware slots
        entries.sort_by(|a, b| a.distance_sq.total_cmp(&b.distance_sq));
        let mut max_lights = driver.max_dynamic_light_count();
        if let Some(limit) = self.config.max_lights {
            max_lights = max_lights.min(limit);
        }
        entries.truncate(max_lights);
        entries
    }

    /// Draw one queued node; `false` when it no longer exists
    fn render_node(
        &mut self,
        driver: &mut dyn VideoDriver,
        pass: RenderPass,
        id: NodeId,
        shadow_volumes: &mut usize,
    ) -> DriverResult<bool> {
        let Some(node) = self.graph.get_mut(id) else {
            return Ok(false);
        };

        // Light nodes append to the active list; every other pass reads it
        let mut unused = Vec::new();
        let (lights, lights_bound): (&[ActiveLight], &mut Vec<ActiveLight>) = if pass == RenderPass::Light {
            (&[][..], &mut self.active_lights)
        } else {
            (self.active_lights.as_slice(), &mut unused)
        };

        let mut ctx = RenderContext::new(
            driver,
            pass,
            id,
            node.absolute,
            node.debug_data,
            self.camera_state.as_ref(),
            lights,
            shadow_volumes,
            lights_bound,
        );
        node.kind.render(&mut ctx)?;
        Ok(true)
    }

    /// Draw a node's bounding box if requested; `true` when drawn
    fn draw_debug_box(&self, driver: &mut dyn VideoDriver, id: NodeId) -> bool {
        let Some(node) = self.graph.get(id) else { return false };
        if !node.debug_data().contains(DebugData::BBOX) {
            return false;
        }
        driver.set_transform(TransformState::World, node.absolute_transformation());
        driver.set_material(&debug_material());
        driver.draw_3d_box(&node.bounding_box(), DEBUG_BOX_COLOR);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::animators::DeleteAfterAnimator;
    use crate::video::{DriverCommand, MaterialType, NullDriver};
    use approx::assert_relative_eq;

    fn frame(smgr: &mut SceneManager, driver: &mut NullDriver) -> FrameStats {
        smgr.begin_frame(driver).unwrap();
        let stats = smgr.draw_all(driver).unwrap();
        smgr.end_frame(driver).unwrap();
        stats
    }

    #[test]
    fn test_missing_mesh_creates_nothing() {
        let mut smgr = SceneManager::new();
        let before = smgr.graph().len();

        assert_eq!(smgr.add_mesh_node(None, None).unwrap(), None);
        assert_eq!(smgr.add_shadow_volume_node(None, None, false).unwrap(), None);
        assert!(smgr.get_mesh("nothing.obj").is_none());
        assert_eq!(smgr.graph().len(), before);
    }

    #[test]
    fn test_config_file_applied() {
        let path = std::env::temp_dir()
            .join(format!("scene_engine_{}_manager.ron", std::process::id()))
            .to_string_lossy()
            .into_owned();
        std::fs::write(&path, "(max_lights: Some(1), culling_enabled: false)").unwrap();

        let smgr = SceneManager::from_config_file(&path);
        std::fs::remove_file(&path).ok();
        let smgr = smgr.unwrap();
        assert_eq!(smgr.config().max_lights, Some(1));
        assert!(!smgr.config().culling_enabled);

        assert!(SceneManager::from_config_file("missing_scene.toml").is_err());
    }

    #[test]
    fn test_first_camera_becomes_active() {
        let mut smgr = SceneManager::new();
        let first = smgr.add_camera_node(None, Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0)).unwrap();
        let second = smgr.add_camera_node(None, Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(smgr.active_camera(), Some(first));

        smgr.set_active_camera(Some(second)).unwrap();
        assert_eq!(smgr.active_camera(), Some(second));
        assert!(smgr.node(first).is_some());

        let cube = smgr.add_cube_node(1.0, None).unwrap();
        assert!(matches!(smgr.set_active_camera(Some(cube)), Err(SceneError::NotACamera(_))));

        smgr.remove_node(second).unwrap();
        assert_eq!(smgr.active_camera(), None);
    }

    #[test]
    fn test_search() {
        let mut smgr = SceneManager::new();
        let group = smgr.add_empty_node(None).unwrap();
        let cube = smgr.add_cube_node(1.0, Some(group)).unwrap();
        smgr.node_mut(cube).unwrap().set_id(42);
        smgr.node_mut(cube).unwrap().set_name("crate");
        smgr.add_light_node(Some(group), Vec3::zeros(), LightData::default()).unwrap();

        assert_eq!(smgr.node_from_id(42, None), Some(cube));
        assert_eq!(smgr.node_from_name("crate", Some(group)), Some(cube));
        assert_eq!(smgr.node_from_name("crate", Some(cube)), Some(cube));
        assert_eq!(smgr.node_from_id(7, None), None);
        assert_eq!(smgr.nodes_of_type(SceneNodeType::Light, None).len(), 1);
        assert_eq!(smgr.nodes_of_type(SceneNodeType::Mesh, Some(group)), vec![cube]);
    }

    #[test]
    fn test_culling_counts() {
        let mut smgr = SceneManager::new();
        let mut driver = NullDriver::new();
        smgr.add_camera_node(None, Vec3::zeros(), Vec3::new(0.0, 0.0, 100.0)).unwrap();
        let ahead = smgr.add_cube_node(2.0, None).unwrap();
        smgr.node_mut(ahead).unwrap().set_position(Vec3::new(0.0, 0.0, 20.0));
        let behind = smgr.add_cube_node(2.0, None).unwrap();
        smgr.node_mut(behind).unwrap().set_position(Vec3::new(0.0, 0.0, -20.0));

        let stats = frame(&mut smgr, &mut driver);
        assert_eq!(stats.pass(RenderPass::Solid).registered, 1);
        assert_eq!(stats.pass(RenderPass::Solid).culled, 1);
        assert!(smgr.render_queue().contains(RenderPass::Solid, ahead));

        smgr.node_mut(behind).unwrap().set_automatic_culling(AutomaticCulling::Off);
        let stats = frame(&mut smgr, &mut driver);
        assert_eq!(stats.pass(RenderPass::Solid).registered, 2);
        assert_eq!(stats.pass(RenderPass::Solid).rendered, 2);
    }

    #[test]
    fn test_lights_capped_by_config_nearest_first() {
        let config = SceneConfig {
            max_lights: Some(1),
            ..SceneConfig::default()
        };
        let mut smgr = SceneManager::with_config(config);
        let mut driver = NullDriver::new();
        smgr.add_camera_node(None, Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0)).unwrap();
        smgr.add_light_node(None, Vec3::new(0.0, 0.0, 50.0), LightData::default()).unwrap();
        let near = smgr.add_light_node(None, Vec3::new(0.0, 0.0, 5.0), LightData::default()).unwrap();

        let stats = frame(&mut smgr, &mut driver);
        assert_eq!(stats.lights_bound, 1);
        assert_eq!(smgr.active_lights()[0].node, near);
        assert_relative_eq!(smgr.active_lights()[0].data.position, Vec3::new(0.0, 0.0, 5.0));
        assert!(driver.commands().contains(&DriverCommand::DeleteAllDynamicLights));
    }

    #[test]
    fn test_deletion_queue_drained_after_frame() {
        let mut smgr = SceneManager::new();
        let mut driver = NullDriver::new();
        let cube = smgr.add_cube_node(1.0, None).unwrap();
        smgr.node_mut(cube)
            .unwrap()
            .add_animator(Box::new(DeleteAfterAnimator::new(0, 100)));

        smgr.timer_mut().set_time(50);
        frame(&mut smgr, &mut driver);
        assert!(smgr.node(cube).is_some());

        smgr.timer_mut().set_time(200);
        let stats = frame(&mut smgr, &mut driver);
        assert_eq!(stats.nodes_deleted, 1);
        assert!(smgr.node(cube).is_none());
        assert!(smgr.deletion_queue().is_empty());
    }

    #[test]
    fn test_draw_outside_scene_bracket_fails() {
        let mut smgr = SceneManager::new();
        let mut driver = NullDriver::new();
        smgr.add_cube_node(1.0, None).unwrap();
        assert!(matches!(smgr.draw_all(&mut driver), Err(SceneError::Driver(_))));
    }

    #[test]
    fn test_debug_box_drawn_once() {
        let mut smgr = SceneManager::new();
        let mut driver = NullDriver::new();
        let cube = smgr.add_cube_node(1.0, None).unwrap();
        smgr.node_mut(cube).unwrap().set_debug_data(DebugData::BBOX);
        smgr.node_mut(cube).unwrap().material_mut(0).unwrap().material_type = MaterialType::TransparentAddColor;

        frame(&mut smgr, &mut driver);
        let boxes = driver.commands().iter().filter(|c| matches!(c, DriverCommand::Draw3dBox(_))).count();
        assert_eq!(boxes, 1);
    }

    #[test]
    fn test_ray_from_screen_centre_hits_target() {
        let mut smgr = SceneManager::new();
        let mut driver = NullDriver::new();
        smgr.add_camera_node(None, Vec3::new(0.0, 0.0, -10.0), Vec3::new(0.0, 0.0, 10.0)).unwrap();
        let cube = smgr.add_cube_node(2.0, None).unwrap();
        frame(&mut smgr, &mut driver);

        let ray = smgr.ray_from_screen(400.0, 300.0, (800, 600)).unwrap();
        assert_relative_eq!(ray.direction, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-4);

        let hit = smgr.node_from_ray(&ray, 0).unwrap();
        assert_eq!(hit.node, cube);
        assert_relative_eq!(hit.point.z, -1.0, epsilon = 1e-3);
        assert_eq!(smgr.node_from_camera(0).map(|h| h.node), Some(cube));

        let screen = smgr.screen_coordinates(Vec3::zeros(), (800, 600)).unwrap();
        assert_relative_eq!(screen, Vec2::new(400.0, 300.0), epsilon = 1e-3);
    }

    #[test]
    fn test_collision_point_on_plane() {
        let mut smgr = SceneManager::new();
        let plane = GeometryCreator::plane(Vec2::new(10.0, 10.0), (4, 4));
        let selector = smgr.create_triangle_selector(&plane, None);
        smgr.graph_mut().update_absolute_transforms();

        let ray = Ray::new(Vec3::new(3.0, 10.0, 6.0), Vec3::new(0.0, -1.0, 0.0));
        let hit = smgr.collision_point(&ray, 100.0, selector.as_ref()).unwrap();
        assert_relative_eq!(hit.point, Vec3::new(3.0, 0.0, 6.0), epsilon = 1e-5);
        assert_relative_eq!(hit.distance, 10.0, epsilon = 1e-5);

        assert!(smgr.collision_point(&ray, 5.0, selector.as_ref()).is_none());
    }
}
