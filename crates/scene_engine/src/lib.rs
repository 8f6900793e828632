//! # Scene Engine
//!
//! A retained-mode 3D scene graph with a multi-pass render scheduler.
//!
//! ## Features
//!
//! - **Scene Graph**: Arena-backed node tree with relative and absolute transforms
//! - **Render Passes**: Camera, light, sky box, solid, shadow and transparent buckets
//! - **Frustum Culling**: Per-node bounding box culling against the active camera
//! - **Animators**: Rotation, paths, splines, timed deletion and collision response
//! - **Collision**: Triangle selectors, ray picking and ellipsoid sliding
//! - **Pluggable Drivers**: Any [`video::VideoDriver`] can draw a scene
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), SceneError> {
//!     let mut smgr = SceneManager::new();
//!     let mut driver = NullDriver::new();
//!
//!     smgr.add_camera_node(None, Vec3::new(0.0, 5.0, -20.0), Vec3::zeros())?;
//!     let cube = smgr.add_cube_node(10.0, None)?;
//!     smgr.node_mut(cube)
//!         .unwrap()
//!         .add_animator(Box::new(RotationAnimator::new(Vec3::new(0.0, 0.3, 0.0))));
//!
//!     smgr.begin_frame(&mut driver)?;
//!     let stats = smgr.draw_all(&mut driver)?;
//!     smgr.end_frame(&mut driver)?;
//!
//!     assert_eq!(stats.pass(RenderPass::Solid).rendered, 1);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod collision;
pub mod config;
pub mod foundation;
pub mod scene;
pub mod video;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        collision::{Ray, RayHit, Triangle, TriangleHit},
        config::{Config, SceneConfig},
        foundation::{
            math::{Mat4, Transform, Vec2, Vec3},
            time::VirtualTimer,
        },
        scene::{
            animators::{
                CollisionResponseAnimator, DeleteAfterAnimator, FlyCircleAnimator, FlyStraightAnimator,
                FollowSplineAnimator, RotationAnimator,
            },
            nodes::{
                BillboardNode, CameraNode, LightNode, MeshNode, ParticleSystemNode, SkyBoxNode,
                SphereNode, VolumeLightNode,
            },
            Aabb, Animator, AutomaticCulling, DebugData, FrameStats, GeometryCreator, LightManager, NodeId,
            RenderPass, SceneError, SceneGraph, SceneManager, SceneNode, SceneNodeKind, SceneNodeType,
            StaticMesh, TriangleSelector,
        },
        video::{Color, Colorf, LightData, Material, MaterialType, NullDriver, VideoDriver},
    };
}
