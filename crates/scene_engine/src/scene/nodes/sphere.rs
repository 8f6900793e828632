//! Sphere node

use std::any::Any;
use std::rc::Rc;

use crate::scene::aabb::Aabb;
use crate::scene::kind::{RenderContext, SceneNodeKind, SceneNodeType};
use crate::scene::mesh::{GeometryCreator, StaticMesh};
use crate::video::{DriverResult, Material, TransformState};

/// Sphere of a given radius and tessellation
///
/// Registers through [`RenderPass::Automatic`](crate::scene::RenderPass),
/// so its material decides between the solid and transparent pass. The
/// generated mesh is shared and can be handed to a shadow volume.
#[derive(Debug, Clone)]
pub struct SphereNode {
    radius: f32,
    poly_count: u16,
    mesh: Rc<StaticMesh>,
    materials: [Material; 1],
}

impl SphereNode {
    /// Smallest accepted radius
    pub const MIN_RADIUS: f32 = 0.0001;

    /// Build a sphere with `poly_count` segments around and from pole to pole
    pub fn new(radius: f32, poly_count: u16) -> Self {
        let radius = radius.max(Self::MIN_RADIUS);
        let mesh = Rc::new(GeometryCreator::sphere(radius, poly_count, poly_count));
        let material = mesh.buffers()[0].material.clone();
        Self {
            radius,
            poly_count,
            mesh,
            materials: [material],
        }
    }

    /// Sphere radius
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Requested tessellation
    pub fn poly_count(&self) -> u16 {
        self.poly_count
    }

    /// Generated mesh
    pub fn mesh(&self) -> &Rc<StaticMesh> {
        &self.mesh
    }

    /// Rebuild the mesh for a new size; the material is kept
    pub fn set_size_and_polys(&mut self, radius: f32, poly_count: u16) {
        self.radius = radius.max(Self::MIN_RADIUS);
        self.poly_count = poly_count;
        self.mesh = Rc::new(GeometryCreator::sphere(self.radius, poly_count, poly_count));
    }
}

impl SceneNodeKind for SphereNode {
    fn node_type(&self) -> SceneNodeType {
        SceneNodeType::Sphere
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) -> DriverResult<()> {
        let absolute = *ctx.absolute_transformation();
        let driver = ctx.driver();
        driver.set_transform(TransformState::World, &absolute);
        driver.set_material(&self.materials[0]);
        for buffer in self.mesh.buffers() {
            driver.draw_indexed_triangle_list(&buffer.vertices, &buffer.indices)?;
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
        &mut self.materials
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::video::MaterialType;

    #[test]
    fn test_resize_keeps_material() {
        let mut sphere = SphereNode::new(2.0, 12);
        sphere.materials_mut()[0].material_type = MaterialType::TransparentAddColor;

        sphere.set_size_and_polys(4.0, 20);
        assert_eq!(sphere.radius(), 4.0);
        assert_eq!(sphere.bounding_box().max, Vec3::repeat(4.0));
        assert_eq!(sphere.materials()[0].material_type, MaterialType::TransparentAddColor);
    }

    #[test]
    fn test_radius_never_zero() {
        let sphere = SphereNode::new(0.0, 8);
        assert!(sphere.radius() > 0.0);
        assert!(sphere.mesh().triangle_count() > 0);
    }
}
