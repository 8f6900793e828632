//! Static mesh node

use std::any::Any;
use std::rc::Rc;

use crate::scene::aabb::Aabb;
use crate::scene::kind::{RegisterContext, RenderContext, SceneNodeKind, SceneNodeType};
use crate::scene::mesh::StaticMesh;
use crate::scene::node::DebugData;
use crate::scene::render_queue::RenderPass;
use crate::video::{Color, DriverResult, Material, TransformState};

use super::debug_material;

/// Length of debug normals
const NORMAL_LENGTH: f32 = 1.0;

/// Draws a shared [`StaticMesh`] with per-node material copies
///
/// The node registers for the solid pass, the transparent pass or both,
/// depending on its materials, and in each pass draws only the buffers whose
/// material belongs there.
#[derive(Debug, Clone)]
pub struct MeshNode {
    mesh: Rc<StaticMesh>,
    materials: Vec<Material>,
    read_only_materials: bool,
}

impl MeshNode {
    /// Wrap a mesh, copying its buffer materials
    pub fn new(mesh: Rc<StaticMesh>) -> Self {
        let materials = Self::copy_materials(&mesh);
        Self {
            mesh,
            materials,
            read_only_materials: false,
        }
    }

    /// The drawn mesh
    pub fn mesh(&self) -> &Rc<StaticMesh> {
        &self.mesh
    }

    /// Replace the mesh; material copies are taken afresh
    pub fn set_mesh(&mut self, mesh: Rc<StaticMesh>) {
        self.materials = Self::copy_materials(&mesh);
        self.mesh = mesh;
    }

    /// Use the mesh's own materials and ignore material edits
    pub fn set_read_only_materials(&mut self, read_only: bool) {
        self.read_only_materials = read_only;
        if read_only {
            self.materials = Self::copy_materials(&self.mesh);
        }
    }

    /// Whether material edits are ignored
    pub fn is_read_only_materials(&self) -> bool {
        self.read_only_materials
    }

    fn copy_materials(mesh: &StaticMesh) -> Vec<Material> {
        mesh.buffers().iter().map(|b| b.material.clone()).collect()
    }

    fn draws_in(material: &Material, pass: RenderPass) -> bool {
        match pass {
            RenderPass::Solid => !material.is_transparent(),
            RenderPass::Transparent | RenderPass::TransparentEffect => material.is_transparent(),
            _ => true,
        }
    }

    fn render_debug(&self, ctx: &mut RenderContext<'_>) {
        let debug_data = ctx.debug_data();
        if !debug_data.intersects(DebugData::BBOX_BUFFERS | DebugData::NORMALS) {
            return;
        }

        let driver = ctx.driver();
        driver.set_material(&debug_material());
        for buffer in self.mesh.buffers() {
            if debug_data.contains(DebugData::BBOX_BUFFERS) {
                driver.draw_3d_box(&buffer.bounding_box, Color::new(255, 190, 128, 128));
            }
            if debug_data.contains(DebugData::NORMALS) {
                for vertex in &buffer.vertices {
                    let end = vertex.position + vertex.normal * NORMAL_LENGTH;
                    driver.draw_3d_line(vertex.position, end, Color::new(255, 34, 221, 221));
                }
            }
        }
    }
}

impl SceneNodeKind for MeshNode {
    fn node_type(&self) -> SceneNodeType {
        SceneNodeType::Mesh
    }

    fn on_register(&mut self, ctx: &mut RegisterContext<'_>) {
        let transparent = self.materials.iter().filter(|m| m.is_transparent()).count();
        if transparent > 0 {
            ctx.register(RenderPass::Transparent);
        }
        if transparent < self.materials.len() {
            ctx.register(RenderPass::Solid);
        }
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) -> DriverResult<()> {
        let pass = ctx.pass();
        let absolute = *ctx.absolute_transformation();
        ctx.driver().set_transform(TransformState::World, &absolute);

        for (buffer, copy) in self.mesh.buffers().iter().zip(&self.materials) {
            let material = if self.read_only_materials { &buffer.material } else { copy };
            if !Self::draws_in(material, pass) {
                continue;
            }
            let driver = ctx.driver();
            driver.set_material(material);
            driver.draw_indexed_triangle_list(&buffer.vertices, &buffer.indices)?;
        }

        // Debug geometry once, in the last pass the node is drawn in
        let last_pass = if self.materials.iter().any(Material::is_transparent) {
            RenderPass::Transparent
        } else {
            RenderPass::Solid
        };
        if pass == last_pass {
            self.render_debug(ctx);
        }
        Ok(())
    }

    fn bounding_box(&self) -> Aabb {
        self.mesh.bounding_box()
    }

    fn materials(&self) -> &[Material] {
        &self.materials
    }

    fn materials_mut(&mut self) -> &mut [Material] {
        if self.read_only_materials {
            &mut []
        } else {
            &mut self.materials
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
