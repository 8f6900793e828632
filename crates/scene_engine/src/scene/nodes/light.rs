//! Dynamic light node

use std::any::Any;

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::scene::aabb::Aabb;
use crate::scene::kind::{RegisterContext, RenderContext, SceneNodeKind, SceneNodeType};
use crate::scene::render_queue::RenderPass;
use crate::video::{DriverResult, LightData, LightType};

/// Light bound to the driver during the light pass
///
/// Position and direction in [`LightData`] are overwritten from the node's
/// absolute transformation every frame: the light shines along the node's
/// local +Z axis.
#[derive(Debug, Clone, Default)]
pub struct LightNode {
    light: LightData,
    driver_index: Option<usize>,
}

impl LightNode {
    /// Light with the given parameters
    pub fn new(light: LightData) -> Self {
        Self {
            light,
            driver_index: None,
        }
    }

    /// Light parameters, in world space after the last light pass
    pub fn light_data(&self) -> &LightData {
        &self.light
    }

    /// Mutable light parameters
    pub fn light_data_mut(&mut self) -> &mut LightData {
        &mut self.light
    }

    /// Driver slot the light was bound to in the last frame
    pub fn driver_index(&self) -> Option<usize> {
        self.driver_index
    }

    /// Light parameters moved into world space
    pub fn world_light(&self, absolute: &Mat4) -> LightData {
        let mut light = self.light;
        light.position = absolute.translation();
        light.direction = absolute
            .rotate_vector3(Vec3::new(0.0, 0.0, 1.0))
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| Vec3::new(0.0, 0.0, 1.0));
        light
    }
}

impl SceneNodeKind for LightNode {
    fn node_type(&self) -> SceneNodeType {
        SceneNodeType::Light
    }

    fn on_register(&mut self, ctx: &mut RegisterContext<'_>) {
        self.driver_index = None;
        ctx.register(RenderPass::Light);
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) -> DriverResult<()> {
        let light = self.world_light(ctx.absolute_transformation());
        self.light.position = light.position;
        self.light.direction = light.direction;
        self.driver_index = Some(ctx.bind_light(&light)?);
        Ok(())
    }

    fn bounding_box(&self) -> Aabb {
        match self.light.light_type {
            LightType::Directional => Aabb::default(),
            LightType::Point | LightType::Spot => {
                Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(self.light.radius))
            }
        }
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
    use crate::foundation::math::Transform;
    use crate::video::Colorf;
    use approx::assert_relative_eq;

    #[test]
    fn test_world_light_follows_transform() {
        let node = LightNode::new(LightData::point(Colorf::new(1.0, 1.0, 1.0, 1.0), 50.0));
        let absolute = Transform::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 90.0, 0.0), Vec3::new(1.0, 1.0, 1.0))
            .to_matrix();

        let light = node.world_light(&absolute);
        assert_relative_eq!(light.position, Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-6);
        assert_relative_eq!(light.direction, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_bounds_cover_radius() {
        let point = LightNode::new(LightData::point(Colorf::default(), 20.0));
        assert_eq!(point.bounding_box().extents(), Vec3::repeat(20.0));

        let sun = LightNode::new(LightData::directional(Colorf::default()));
        assert_eq!(sun.bounding_box().extents(), Vec3::zeros());
        assert_eq!(sun.world_light(&Mat4::identity()).direction, Vec3::new(0.0, 0.0, 1.0));
    }
}
