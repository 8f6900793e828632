//! Collision primitives and responses
//!
//! Geometry tests shared by picking, triangle selectors and the collision
//! response animator.

mod primitives;
mod response;

pub use primitives::{Ray, RayHit, Triangle, TriangleHit};
pub use response::{collide_and_slide, SlideRequest, SlideResult};
