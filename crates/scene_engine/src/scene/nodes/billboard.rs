//! Camera-facing quad

use std::any::Any;

use crate::foundation::math::{Mat4, Mat4Ext, Vec2, Vec3};
use crate::scene::aabb::Aabb;
use crate::scene::kind::{RenderContext, SceneNodeKind, SceneNodeType};
use crate::scene::nodes::camera::CameraState;
use crate::video::{Color, DriverResult, Material, TransformState, Vertex};

const INDICES: [u16; 6] = [0, 2, 1, 0, 3, 2];

/// Quad that always faces the active camera
///
/// Registers for the automatic pass, so a transparent material puts it in
/// the transparent pass. Without an active camera it draws nothing.
#[derive(Debug, Clone)]
pub struct BillboardNode {
    size: Vec2,
    top_color: Color,
    bottom_color: Color,
    materials: [Material; 1],
}

impl BillboardNode {
    /// Billboard of the given width and height
    pub fn new(size: Vec2) -> Self {
        Self {
            size,
            top_color: Color::WHITE,
            bottom_color: Color::WHITE,
            materials: [Material::default()],
        }
    }

    /// Width and height
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Set width and height
    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
    }

    /// Vertex colours of the top and bottom edge
    pub fn colors(&self) -> (Color, Color) {
        (self.top_color, self.bottom_color)
    }

    /// Set the vertex colours of the top and bottom edge
    pub fn set_colors(&mut self, top: Color, bottom: Color) {
        self.top_color = top;
        self.bottom_color = bottom;
    }

    /// World-space corners of the quad centred on `center`
    pub fn quad(&self, center: Vec3, camera: &CameraState) -> [Vertex; 4] {
        let view = (camera.target - camera.position)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| Vec3::new(0.0, 0.0, 1.0));

        let mut horizontal = camera.up.cross(&view);
        if horizontal.norm_squared() < f32::EPSILON {
            horizontal = Vec3::new(1.0, 0.0, 0.0);
        }
        let horizontal = horizontal.normalize() * (0.5 * self.size.x);
        let vertical = horizontal.cross(&view).normalize() * (0.5 * self.size.y);
        let normal = -view;

        let corner = |position: Vec3, color: Color, u: f32, v: f32| {
            Vertex::new(position, normal, color, Vec2::new(u, v))
        };
        [
            corner(center + horizontal + vertical, self.bottom_color, 1.0, 1.0),
            corner(center + horizontal - vertical, self.top_color, 1.0, 0.0),
            corner(center - horizontal - vertical, self.top_color, 0.0, 0.0),
            corner(center - horizontal + vertical, self.bottom_color, 0.0, 1.0),
        ]
    }
}

impl SceneNodeKind for BillboardNode {
    fn node_type(&self) -> SceneNodeType {
        SceneNodeType::Billboard
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) -> DriverResult<()> {
        let Some(camera) = ctx.camera().copied() else {
            return Ok(());
        };
        let vertices = self.quad(ctx.absolute_transformation().translation(), &camera);

        let driver = ctx.driver();
        driver.set_transform(TransformState::World, &Mat4::identity());
        driver.set_material(&self.materials[0]);
        driver.draw_indexed_triangle_list(&vertices, &INDICES)
    }

    fn bounding_box(&self) -> Aabb {
        let half_width = 0.5 * self.size.x;
        Aabb::from_center_extents(Vec3::zeros(), Vec3::new(half_width, 0.5 * self.size.y, half_width))
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
