//! Sky box

use std::any::Any;

use crate::foundation::math::{Mat4, Vec2, Vec3};
use crate::scene::aabb::Aabb;
use crate::scene::kind::{RegisterContext, RenderContext, SceneNodeKind, SceneNodeType};
use crate::scene::render_queue::RenderPass;
use crate::video::{Color, DriverResult, Material, MaterialFlags, TextureHandle, TransformState, Vertex};

/// Inward-facing triangles of one face quad
const FACE_INDICES: [u16; 6] = [0, 2, 1, 0, 3, 2];

/// Six textured faces drawn around the active camera
///
/// The box is centred on the camera and scaled halfway between its near and
/// far planes, so it always stays in view behind the rest of the scene.
/// Textures are given per face in the order +Z, -Z, +X, -X, +Y, -Y.
#[derive(Debug, Clone)]
pub struct SkyBoxNode {
    faces: [[Vertex; 4]; 6],
    materials: [Material; 6],
}

impl SkyBoxNode {
    /// Sky box with one texture per face
    pub fn new(textures: [Option<TextureHandle>; 6]) -> Self {
        let quads = Aabb::new(Vec3::repeat(-1.0), Vec3::repeat(1.0)).face_quads();
        let tex_coords = [
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
        ];

        let faces = quads.map(|quad| {
            let normal = -(quad[1] - quad[0]).cross(&(quad[2] - quad[0])).normalize();
            let mut corners = [Vertex::default(); 4];
            for ((vertex, position), tex) in corners.iter_mut().zip(quad).zip(tex_coords) {
                *vertex = Vertex::new(position, normal, Color::WHITE, tex);
            }
            corners
        });

        let materials = textures.map(|texture| {
            let mut material = Material::default();
            material.set_flag(MaterialFlags::LIGHTING, false);
            material.set_flag(MaterialFlags::ZBUFFER, false);
            material.set_flag(MaterialFlags::ZWRITE_ENABLE, false);
            material.set_texture(0, texture);
            material
        });

        Self { faces, materials }
    }

    /// World transformation for a camera state
    pub fn world_transform(camera_position: Vec3, near: f32, far: f32) -> Mat4 {
        let view_distance = (near + far) * 0.5;
        Mat4::new_translation(&camera_position) * Mat4::new_scaling(view_distance)
    }
}

impl SceneNodeKind for SkyBoxNode {
    fn node_type(&self) -> SceneNodeType {
        SceneNodeType::SkyBox
    }

    fn on_register(&mut self, ctx: &mut RegisterContext<'_>) {
        ctx.register(RenderPass::SkyBox);
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) -> DriverResult<()> {
        let Some(camera) = ctx.camera().copied() else {
            return Ok(());
        };
        let world = Self::world_transform(camera.position, camera.near, camera.far);

        let driver = ctx.driver();
        driver.set_transform(TransformState::World, &world);
        for (face, material) in self.faces.iter().zip(&self.materials) {
            driver.set_material(material);
            driver.draw_indexed_triangle_list(face, &FACE_INDICES)?;
        }
        Ok(())
    }

    fn bounding_box(&self) -> Aabb {
        Aabb::default()
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
    use crate::foundation::math::Mat4Ext;
    use approx::assert_relative_eq;

    #[test]
    fn test_faces_wind_inwards() {
        let sky = SkyBoxNode::new([None; 6]);
        for face in &sky.faces {
            for tri in FACE_INDICES.chunks_exact(3) {
                let [a, b, c] = [0, 1, 2].map(|i| face[usize::from(tri[i])].position);
                let normal = (b - a).cross(&(c - a));
                assert!(normal.dot(&((a + b + c) / 3.0)) < 0.0);
            }
            assert!(face[0].normal.dot(&face[0].position) < 0.0);
        }
    }

    #[test]
    fn test_materials_skip_depth_and_lighting() {
        let sky = SkyBoxNode::new([Some(TextureHandle(1)), None, None, None, None, Some(TextureHandle(6))]);
        assert_eq!(sky.materials()[0].textures[0], Some(TextureHandle(1)));
        assert_eq!(sky.materials()[5].textures[0], Some(TextureHandle(6)));
        for material in sky.materials() {
            assert!(!material.flags.contains(MaterialFlags::LIGHTING));
            assert!(!material.flags.contains(MaterialFlags::ZBUFFER));
            assert!(!material.flags.contains(MaterialFlags::ZWRITE_ENABLE));
        }
    }

    #[test]
    fn test_world_transform_surrounds_camera() {
        let world = SkyBoxNode::world_transform(Vec3::new(5.0, 0.0, 0.0), 1.0, 99.0);
        assert_relative_eq!(world.transform_point3(Vec3::new(1.0, 0.0, 0.0)), Vec3::new(55.0, 0.0, 0.0));
    }
}
