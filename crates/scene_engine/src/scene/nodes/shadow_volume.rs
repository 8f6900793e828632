//! Stencil shadow volumes
//!
//! The volume is rebuilt from the mesh for every light each frame. A
//! triangle faces the light when its normal points towards it; edges shared
//! by two light-facing triangles cancel out, and what remains is the
//! silhouette. Every silhouette edge is extruded away from the light into a
//! quad. With depth-fail rendering the volume is closed with the
//! light-facing triangles as front cap and their extrusion as back cap.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use crate::foundation::math::{Mat4Ext, Vec3};
use crate::scene::aabb::Aabb;
use crate::scene::kind::{RegisterContext, RenderContext, SceneNodeKind, SceneNodeType};
use crate::scene::mesh::StaticMesh;
use crate::scene::render_queue::RenderPass;
use crate::video::{DriverResult, LightType, TransformState};

/// Default extrusion distance
pub const DEFAULT_INFINITY: f32 = 10000.0;

type EdgeKey = ([u32; 3], [u32; 3]);

fn position_key(v: Vec3) -> [u32; 3] {
    [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()]
}

/// Shadow cast by a mesh, drawn into the stencil buffer
#[derive(Debug, Clone)]
pub struct ShadowVolumeNode {
    mesh: Rc<StaticMesh>,
    z_fail: bool,
    infinity: f32,
}

impl ShadowVolumeNode {
    /// Shadow volume for `mesh`
    ///
    /// # Arguments
    /// * `mesh` - Geometry casting the shadow, usually the parent's mesh
    /// * `z_fail` - Use depth-fail rendering, which also works with the
    ///   camera inside the shadow but needs capped volumes
    /// * `infinity` - Extrusion distance of silhouette edges
    pub fn new(mesh: Rc<StaticMesh>, z_fail: bool, infinity: f32) -> Self {
        Self { mesh, z_fail, infinity }
    }

    /// The casting mesh
    pub fn mesh(&self) -> &Rc<StaticMesh> {
        &self.mesh
    }

    /// Replace the casting mesh
    pub fn set_mesh(&mut self, mesh: Rc<StaticMesh>) {
        self.mesh = mesh;
    }

    /// Whether depth-fail rendering is used
    pub fn is_z_fail(&self) -> bool {
        self.z_fail
    }

    /// Triangle soup of the volume for a light at `light` in mesh space
    pub fn build_volume(&self, light: Vec3) -> Vec<Vec3> {
        let mut front_facing = Vec::new();
        for buffer in self.mesh.buffers() {
            for [a, b, c] in buffer.triangles() {
                let normal = (b - a).cross(&(c - a));
                if normal.norm_squared() > f32::EPSILON && normal.dot(&(light - a)) > 0.0 {
                    front_facing.push([a, b, c]);
                }
            }
        }

        // Edges in insertion order; a reversed twin removes the pair
        let mut edges: Vec<Option<(Vec3, Vec3)>> = Vec::new();
        let mut open: HashMap<EdgeKey, usize> = HashMap::new();
        for [a, b, c] in &front_facing {
            for (from, to) in [(*a, *b), (*b, *c), (*c, *a)] {
                let twin = (position_key(to), position_key(from));
                if let Some(index) = open.remove(&twin) {
                    edges[index] = None;
                } else {
                    open.insert((position_key(from), position_key(to)), edges.len());
                    edges.push(Some((from, to)));
                }
            }
        }

        let extrude = |v: Vec3| {
            let away = (v - light).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros);
            v + away * self.infinity
        };

        let mut volume = Vec::new();
        for (v1, v2) in edges.into_iter().flatten() {
            let (v3, v4) = (extrude(v1), extrude(v2));
            volume.extend_from_slice(&[v1, v2, v3, v2, v4, v3]);
        }

        if self.z_fail {
            for [a, b, c] in &front_facing {
                volume.extend_from_slice(&[*a, *b, *c]);
            }
            for [a, b, c] in &front_facing {
                volume.extend_from_slice(&[extrude(*a), extrude(*c), extrude(*b)]);
            }
        }
        volume
    }
}

impl SceneNodeKind for ShadowVolumeNode {
    fn node_type(&self) -> SceneNodeType {
        SceneNodeType::ShadowVolume
    }

    fn on_register(&mut self, ctx: &mut RegisterContext<'_>) {
        ctx.register(RenderPass::Shadow);
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) -> DriverResult<()> {
        let absolute = *ctx.absolute_transformation();
        let Some(inverse) = absolute.try_inverse() else {
            return Ok(());
        };
        let center = absolute.transform_point3(self.mesh.bounding_box().center());

        let mut volumes = Vec::new();
        for light in ctx.lights().iter().map(|l| l.data).filter(|l| l.cast_shadows) {
            let world_light = match light.light_type {
                LightType::Directional => -light.direction * self.infinity,
                LightType::Point | LightType::Spot => {
                    // Out of reach
                    if (light.position - center).norm_squared() > light.radius * light.radius * 4.0 {
                        continue;
                    }
                    light.position
                }
            };
            let volume = self.build_volume(inverse.transform_point3(world_light));
            if !volume.is_empty() {
                volumes.push(volume);
            }
        }

        if volumes.is_empty() {
            return Ok(());
        }
        ctx.driver().set_transform(TransformState::World, &absolute);
        for volume in &volumes {
            ctx.draw_shadow_volume(volume, self.z_fail)?;
        }
        Ok(())
    }

    fn bounding_box(&self) -> Aabb {
        self.mesh.bounding_box()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
