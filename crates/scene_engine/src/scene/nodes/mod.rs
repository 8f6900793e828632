//! Built-in node kinds
//!
//! Each kind implements [`SceneNodeKind`](super::kind::SceneNodeKind) and is
//! wrapped in a [`SceneNode`](super::node::SceneNode) by the scene manager's
//! factories. User code can add its own kinds the same way.

pub mod billboard;
pub mod camera;
pub mod empty;
pub mod light;
pub mod mesh_node;
pub mod particles;
pub mod shadow_volume;
pub mod sky_box;
pub mod sphere;
pub mod volume_light;

pub use billboard::BillboardNode;
pub use camera::{CameraNode, CameraState};
pub use empty::EmptyNode;
pub use light::LightNode;
pub use mesh_node::MeshNode;
pub use particles::{
    BoxEmitter, EmitterSettings, FadeOutAffector, GravityAffector, Particle, ParticleAffector,
    ParticleEmitter, ParticleSystemNode, PointEmitter,
};
pub use shadow_volume::ShadowVolumeNode;
pub use sky_box::SkyBoxNode;
pub use sphere::SphereNode;
pub use volume_light::VolumeLightNode;

use crate::video::{Color, Material, MaterialFlags};

/// Unlit material used for debug geometry
pub(crate) fn debug_material() -> Material {
    let mut material = Material::default();
    material.set_flag(MaterialFlags::LIGHTING, false);
    material
}

/// Colour of debug bounding boxes
pub(crate) const DEBUG_BOX_COLOR: Color = Color::new(255, 255, 255, 255);
