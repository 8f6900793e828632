//! Camera node
//!
//! A camera looks from its absolute position towards a world-space target.
//! Its matrices are recomputed by the scene manager once per frame, after
//! transforms are updated and before registration, so culling in the same
//! frame sees the current view.

use std::any::Any;

use crate::foundation::logging::trace;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::scene::aabb::Aabb;
use crate::scene::frustum::Frustum;
use crate::scene::kind::{RegisterContext, RenderContext, SceneNodeKind, SceneNodeType};
use crate::scene::render_queue::RenderPass;
use crate::video::{DriverResult, TransformState};

/// Default vertical field of view in radians
pub const DEFAULT_FOV: f32 = std::f32::consts::PI / 2.5;

/// Camera matrices and frustum for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// World-space eye position
    pub position: Vec3,
    /// World-space look-at point
    pub target: Vec3,
    /// Up vector actually used for the view matrix
    pub up: Vec3,
    /// World to view transformation
    pub view: Mat4,
    /// View to clip transformation
    pub projection: Mat4,
    /// World-space view frustum
    pub frustum: Frustum,
    /// Near clipping distance
    pub near: f32,
    /// Far clipping distance
    pub far: f32,
}

impl CameraState {
    /// Combined view-projection matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Perspective camera
///
/// Only the scene's active camera registers for [`RenderPass::Camera`];
/// inactive cameras stay in the tree and keep their settings.
#[derive(Debug, Clone)]
pub struct CameraNode {
    target: Vec3,
    up: Vec3,
    fov: f32,
    aspect: f32,
    near: f32,
    far: f32,
    state: Option<CameraState>,
}

impl Default for CameraNode {
    fn default() -> Self {
        Self {
            target: Vec3::new(0.0, 0.0, 100.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: DEFAULT_FOV,
            aspect: 4.0 / 3.0,
            near: 1.0,
            far: 3000.0,
            state: None,
        }
    }
}

impl CameraNode {
    /// Camera looking at `target`
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// World-space look-at point
    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Set the world-space look-at point
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Preferred up vector
    pub fn up_vector(&self) -> Vec3 {
        self.up
    }

    /// Set the preferred up vector
    pub fn set_up_vector(&mut self, up: Vec3) {
        self.up = up;
    }

    /// Vertical field of view in radians
    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// Set the vertical field of view in radians
    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
    }

    /// Width over height of the viewport
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    /// Set the aspect ratio, typically after a viewport resize
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Near clipping distance
    pub fn near_value(&self) -> f32 {
        self.near
    }

    /// Set the near clipping distance
    pub fn set_near_value(&mut self, near: f32) {
        self.near = near;
    }

    /// Far clipping distance
    pub fn far_value(&self) -> f32 {
        self.far
    }

    /// Set the far clipping distance
    pub fn set_far_value(&mut self, far: f32) {
        self.far = far;
    }

    /// State computed by the last [`update_matrices`](Self::update_matrices)
    pub fn state(&self) -> Option<&CameraState> {
        self.state.as_ref()
    }

    /// Recompute view, projection and frustum for the node's absolute
    /// transformation
    ///
    /// # Arguments
    /// * `absolute` - The camera node's absolute transformation; only its
    ///   translation is used, the view direction comes from the target
    ///
    /// # Returns
    /// The new state, also kept for [`state`](Self::state)
    pub fn update_matrices(&mut self, absolute: &Mat4) -> CameraState {
        let position = absolute.translation();

        // An up vector parallel to the view direction makes look-at degenerate
        let mut up = self.up;
        let view_dir = (self.target - position).try_normalize(f32::EPSILON);
        let up_dir = up.try_normalize(f32::EPSILON);
        if let (Some(view_dir), Some(up_dir)) = (view_dir, up_dir) {
            if (view_dir.dot(&up_dir).abs() - 1.0).abs() < 1e-6 {
                up.x += 0.5;
            }
        }

        let view = Mat4::look_at(position, self.target, up);
        let projection = Mat4::perspective(self.fov, self.aspect, self.near, self.far);
        let state = CameraState {
            position,
            target: self.target,
            up,
            view,
            projection,
            frustum: Frustum::from_matrix(&(projection * view)),
            near: self.near,
            far: self.far,
        };
        trace!("Camera at {position:?} looking at {:?}", self.target);
        self.state = Some(state);
        state
    }
}

impl SceneNodeKind for CameraNode {
    fn node_type(&self) -> SceneNodeType {
        SceneNodeType::Camera
    }

    fn on_register(&mut self, ctx: &mut RegisterContext<'_>) {
        if ctx.is_active_camera() {
            ctx.register(RenderPass::Camera);
        }
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) -> DriverResult<()> {
        let Some(state) = self.state else {
            return Ok(());
        };
        let driver = ctx.driver();
        driver.set_transform(TransformState::Projection, &state.projection);
        driver.set_transform(TransformState::View, &state.view);
        Ok(())
    }

    fn bounding_box(&self) -> Aabb {
        Aabb::default()
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
    use approx::assert_relative_eq;

    #[test]
    fn test_matrices_follow_position_and_target() {
        let mut camera = CameraNode::new(Vec3::new(0.0, 0.0, -10.0));
        let state = camera.update_matrices(&Mat4::new_translation(&Vec3::new(0.0, 0.0, 10.0)));

        assert_relative_eq!(state.position, Vec3::new(0.0, 0.0, 10.0), epsilon = 1e-6);
        // Target lands straight ahead on the view axis
        let target_in_view = state.view.transform_point3(state.target);
        assert_relative_eq!(target_in_view, Vec3::new(0.0, 0.0, -20.0), epsilon = 1e-4);
        assert_eq!(camera.state(), Some(&state));
    }

    #[test]
    fn test_frustum_contains_target_but_not_behind() {
        let mut camera = CameraNode::new(Vec3::new(0.0, 0.0, 50.0));
        let state = camera.update_matrices(&Mat4::identity());

        assert!(state.frustum.contains_point(Vec3::new(0.0, 0.0, 50.0)));
        assert!(!state.frustum.contains_point(Vec3::new(0.0, 0.0, -50.0)));
        assert!(!state.frustum.contains_point(Vec3::new(0.0, 0.0, 5000.0)));
    }

    #[test]
    fn test_up_vector_parallel_to_view_is_nudged() {
        let mut camera = CameraNode::new(Vec3::new(0.0, 100.0, 0.0));
        let state = camera.update_matrices(&Mat4::identity());

        assert_relative_eq!(state.up, Vec3::new(0.5, 1.0, 0.0));
        assert!(state.view.iter().all(|v| v.is_finite()));
        // Preferred up vector is left alone
        assert_eq!(camera.up_vector(), Vec3::new(0.0, 1.0, 0.0));
    }
}
