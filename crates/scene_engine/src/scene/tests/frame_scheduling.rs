//! Pass ordering, visibility and transform propagation across whole frames

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;

use super::frame_at;
use crate::config::SceneConfig;
use crate::foundation::math::Vec3;
use crate::scene::animators::RotationAnimator;
use crate::scene::nodes::CameraNode;
use crate::scene::{
    Aabb, AutomaticCulling, RegisterContext, RenderContext, RenderPass, SceneManager, SceneNodeKind,
    SceneNodeType,
};
use crate::video::{Colorf, DriverCommand, DriverResult, LightData, NullDriver, TransformState};

type DrawLog = Rc<RefCell<Vec<(&'static str, RenderPass)>>>;

/// Node that registers for fixed passes and logs every draw
struct PassRecorder {
    name: &'static str,
    passes: Vec<RenderPass>,
    log: DrawLog,
}

impl PassRecorder {
    fn boxed(name: &'static str, passes: &[RenderPass], log: &DrawLog) -> Box<Self> {
        Box::new(Self {
            name,
            passes: passes.to_vec(),
            log: Rc::clone(log),
        })
    }
}

impl SceneNodeKind for PassRecorder {
    fn node_type(&self) -> SceneNodeType {
        SceneNodeType::Custom(1)
    }

    fn on_register(&mut self, ctx: &mut RegisterContext<'_>) {
        for pass in &self.passes {
            ctx.register(*pass);
        }
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) -> DriverResult<()> {
        self.log.borrow_mut().push((self.name, ctx.pass()));
        Ok(())
    }

    fn bounding_box(&self) -> Aabb {
        Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(1.0))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[test]
fn test_passes_drawn_in_fixed_order() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();
    let log = DrawLog::default();

    smgr.add_camera_node(None, Vec3::new(0.0, 0.0, -20.0), Vec3::zeros()).unwrap();
    // Registered in reverse of the draw order
    smgr.add_custom_node(PassRecorder::boxed("effect", &[RenderPass::TransparentEffect], &log), None).unwrap();
    smgr.add_custom_node(PassRecorder::boxed("transparent", &[RenderPass::Transparent], &log), None).unwrap();
    smgr.add_custom_node(PassRecorder::boxed("shadow", &[RenderPass::Shadow], &log), None).unwrap();
    smgr.add_custom_node(PassRecorder::boxed("solid", &[RenderPass::Solid], &log), None).unwrap();
    smgr.add_custom_node(PassRecorder::boxed("sky", &[RenderPass::SkyBox], &log), None).unwrap();
    smgr.add_custom_node(PassRecorder::boxed("light", &[RenderPass::Light], &log), None).unwrap();

    frame_at(&mut smgr, &mut driver, 0);

    let names: Vec<_> = log.borrow().iter().map(|(name, _)| *name).collect();
    assert_eq!(names, ["light", "sky", "solid", "shadow", "transparent", "effect"]);
}

#[test]
fn test_multi_pass_node_drawn_once_per_pass() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();
    let log = DrawLog::default();

    let passes = [RenderPass::Solid, RenderPass::Transparent, RenderPass::Solid];
    smgr.add_custom_node(PassRecorder::boxed("both", &passes, &log), None).unwrap();

    let stats = frame_at(&mut smgr, &mut driver, 0);

    assert_eq!(*log.borrow(), [("both", RenderPass::Solid), ("both", RenderPass::Transparent)]);
    assert_eq!(stats.total_rendered(), 2);
}

#[test]
fn test_transparent_drawn_back_to_front() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();
    let log = DrawLog::default();

    smgr.add_camera_node(None, Vec3::zeros(), Vec3::new(0.0, 0.0, 100.0)).unwrap();
    for (name, z) in [("near", 10.0), ("far", 50.0), ("middle", 30.0)] {
        let id = smgr.add_custom_node(PassRecorder::boxed(name, &[RenderPass::Transparent], &log), None).unwrap();
        smgr.node_mut(id).unwrap().set_position(Vec3::new(0.0, 0.0, z));
    }

    frame_at(&mut smgr, &mut driver, 0);

    let names: Vec<_> = log.borrow().iter().map(|(name, _)| *name).collect();
    assert_eq!(names, ["far", "middle", "near"]);
}

#[test]
fn test_automatic_resolves_from_materials() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();
    let log = DrawLog::default();

    let custom = smgr.add_custom_node(PassRecorder::boxed("auto", &[RenderPass::Automatic], &log), None).unwrap();
    frame_at(&mut smgr, &mut driver, 0);

    // No materials means nothing transparent
    assert!(smgr.render_queue().contains(RenderPass::Solid, custom));
    assert_eq!(*log.borrow(), [("auto", RenderPass::Solid)]);
}

#[test]
fn test_hidden_parent_hides_subtree() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    let group = smgr.add_empty_node(None).unwrap();
    let cube = smgr.add_cube_node(1.0, Some(group)).unwrap();
    smgr.node_mut(cube)
        .unwrap()
        .add_animator(Box::new(RotationAnimator::new(Vec3::new(0.0, 90.0, 0.0))));
    smgr.node_mut(group).unwrap().set_visible(false);

    frame_at(&mut smgr, &mut driver, 0);
    let stats = frame_at(&mut smgr, &mut driver, 1000);

    // The child keeps its own flag but inherits the hidden state
    assert!(smgr.node(cube).unwrap().is_visible());
    assert!(!smgr.graph().is_effectively_visible(cube));
    assert!(!smgr.render_queue().contains_node(cube));
    assert_eq!(stats.total_registered(), 0);
    assert_relative_eq!(smgr.node(cube).unwrap().rotation().y, 0.0);

    smgr.node_mut(group).unwrap().set_visible(true);
    frame_at(&mut smgr, &mut driver, 2000);
    assert!(smgr.render_queue().contains(RenderPass::Solid, cube));
}

#[test]
fn test_hidden_nodes_animate_when_configured() {
    let config = SceneConfig {
        animate_hidden_nodes: true,
        ..SceneConfig::default()
    };
    let mut smgr = SceneManager::with_config(config);
    let mut driver = NullDriver::new();

    let cube = smgr.add_cube_node(1.0, None).unwrap();
    smgr.node_mut(cube)
        .unwrap()
        .add_animator(Box::new(RotationAnimator::new(Vec3::new(0.0, 90.0, 0.0))));
    smgr.node_mut(cube).unwrap().set_visible(false);

    frame_at(&mut smgr, &mut driver, 0);
    frame_at(&mut smgr, &mut driver, 1000);

    assert_relative_eq!(smgr.node(cube).unwrap().rotation().y, 90.0, epsilon = 1e-3);
    assert!(!smgr.render_queue().contains_node(cube));
}

#[test]
fn test_child_transform_composes_with_parent() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    let parent = smgr.add_empty_node(None).unwrap();
    smgr.node_mut(parent).unwrap().set_position(Vec3::new(10.0, 0.0, 0.0));
    smgr.node_mut(parent).unwrap().set_rotation(Vec3::new(0.0, 90.0, 0.0));
    let child = smgr.add_cube_node(1.0, Some(parent)).unwrap();
    smgr.node_mut(child).unwrap().set_position(Vec3::new(0.0, 0.0, 5.0));

    frame_at(&mut smgr, &mut driver, 0);

    let absolute = smgr.node(child).unwrap().absolute_position();
    assert_relative_eq!(absolute, Vec3::new(15.0, 0.0, 0.0), epsilon = 1e-4);

    let world = driver.commands().iter().find_map(|c| match c {
        DriverCommand::SetTransform(TransformState::World, m) => Some(*m),
        _ => None,
    });
    assert_eq!(world, Some(*smgr.node(child).unwrap().absolute_transformation()));
}

#[test]
fn test_only_active_camera_binds_view() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    let first = smgr.add_camera_node(None, Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0)).unwrap();
    let second = smgr.add_camera_node(None, Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, 5.0, 1.0)).unwrap();

    let stats = frame_at(&mut smgr, &mut driver, 0);
    assert_eq!(stats.pass(RenderPass::Camera).registered, 1);
    assert!(smgr.render_queue().contains(RenderPass::Camera, first));

    smgr.set_active_camera(Some(second)).unwrap();
    driver.clear_commands();
    frame_at(&mut smgr, &mut driver, 16);

    assert!(smgr.render_queue().contains(RenderPass::Camera, second));
    assert!(!smgr.render_queue().contains(RenderPass::Camera, first));
    let view = smgr.node(second)
        .unwrap()
        .kind_as::<CameraNode>()
        .and_then(CameraNode::state)
        .map(|s| s.view);
    assert!(driver.commands().contains(&DriverCommand::SetTransform(TransformState::View, view.unwrap())));
    assert_relative_eq!(smgr.camera_state().unwrap().position, Vec3::new(0.0, 5.0, 0.0));
}

#[test]
fn test_without_camera_nothing_is_culled() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    let far = smgr.add_cube_node(1.0, None).unwrap();
    smgr.node_mut(far).unwrap().set_position(Vec3::new(0.0, 0.0, -5000.0));
    smgr.node_mut(far).unwrap().set_automatic_culling(AutomaticCulling::BoundingBox);

    let stats = frame_at(&mut smgr, &mut driver, 0);
    assert_eq!(stats.total_culled(), 0);
    assert!(smgr.render_queue().contains(RenderPass::Solid, far));
}

#[test]
fn test_same_time_draws_same_commands() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    smgr.add_camera_node(None, Vec3::new(0.0, 10.0, -30.0), Vec3::zeros()).unwrap();
    smgr.add_light_node(None, Vec3::new(0.0, 20.0, 0.0), LightData::default()).unwrap();
    let cube = smgr.add_cube_node(5.0, None).unwrap();
    smgr.node_mut(cube)
        .unwrap()
        .add_animator(Box::new(RotationAnimator::new(Vec3::new(0.0, 45.0, 0.0))));
    smgr.set_ambient_light(Colorf::new(0.2, 0.2, 0.2, 1.0));

    frame_at(&mut smgr, &mut driver, 0);
    frame_at(&mut smgr, &mut driver, 500);
    driver.clear_commands();

    let first = frame_at(&mut smgr, &mut driver, 500);
    let first_commands = driver.commands().to_vec();
    driver.clear_commands();
    let second = frame_at(&mut smgr, &mut driver, 500);

    assert_eq!(first, second);
    assert_eq!(first_commands, driver.commands());
    assert!(first_commands.contains(&DriverCommand::SetAmbientLight(Colorf::new(0.2, 0.2, 0.2, 1.0))));
}
