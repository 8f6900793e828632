//! Hardware light description handed to the driver

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;
use super::color::Colorf;

/// Types of lights supported by the driver contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LightType {
    /// Light radiating in all directions from a position
    #[default]
    Point,
    /// Parallel rays along a direction
    Directional,
    /// Cone of light from a position
    Spot,
}

/// Light parameters bound by a light node during the light pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightData {
    /// The type of light
    pub light_type: LightType,
    /// Ambient contribution
    pub ambient_color: Colorf,
    /// Diffuse contribution
    pub diffuse_color: Colorf,
    /// Specular contribution
    pub specular_color: Colorf,
    /// World-space position, written from the node's absolute transform
    pub position: Vec3,
    /// World-space direction, written from the node's absolute transform
    pub direction: Vec3,
    /// Radius of influence for point and spot lights
    pub radius: f32,
    /// Constant, linear and quadratic attenuation
    pub attenuation: Vec3,
    /// Inner cone angle in degrees
    pub inner_cone: f32,
    /// Outer cone angle in degrees
    pub outer_cone: f32,
    /// Spot falloff exponent
    pub falloff: f32,
    /// Whether shadow volumes use this light
    pub cast_shadows: bool,
}

impl Default for LightData {
    fn default() -> Self {
        Self {
            light_type: LightType::Point,
            ambient_color: Colorf::new(0.0, 0.0, 0.0, 1.0),
            diffuse_color: Colorf::new(1.0, 1.0, 1.0, 1.0),
            specular_color: Colorf::new(1.0, 1.0, 1.0, 1.0),
            position: Vec3::zeros(),
            direction: Vec3::new(0.0, 0.0, 1.0),
            radius: 100.0,
            attenuation: Vec3::new(0.0, 0.01, 0.0),
            inner_cone: 0.0,
            outer_cone: 45.0,
            falloff: 2.0,
            cast_shadows: true,
        }
    }
}

impl LightData {
    /// Point light with the given colour and radius
    pub fn point(diffuse_color: Colorf, radius: f32) -> Self {
        let mut light = Self {
            diffuse_color,
            ..Default::default()
        };
        light.set_radius(radius);
        light
    }

    /// Directional light with the given colour
    pub fn directional(diffuse_color: Colorf) -> Self {
        Self {
            light_type: LightType::Directional,
            diffuse_color,
            ..Default::default()
        }
    }

    /// Set the radius and derive linear attenuation from it
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
        if radius > 0.0 {
            self.attenuation = Vec3::new(0.0, 1.0 / radius, 0.0);
        }
    }
}
