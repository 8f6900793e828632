//! Collision response and picking against live scene nodes

use std::rc::Rc;

use approx::assert_relative_eq;

use super::frame_at;
use crate::collision::{Ray, Triangle};
use crate::foundation::math::{Vec2, Vec3};
use crate::scene::animators::CollisionResponseAnimator;
use crate::scene::mesh::GeometryCreator;
use crate::scene::nodes::CameraNode;
use crate::scene::selectors::MeshTriangleSelector;
use crate::scene::{NodeId, SceneManager, TriangleSelector};
use crate::video::NullDriver;

/// Square wall in the plane z = 10, facing -Z
fn wall() -> Rc<dyn TriangleSelector> {
    let a = Vec3::new(-50.0, -50.0, 10.0);
    let b = Vec3::new(-50.0, 50.0, 10.0);
    let c = Vec3::new(50.0, 50.0, 10.0);
    let d = Vec3::new(50.0, -50.0, 10.0);
    Rc::new(MeshTriangleSelector::from_triangles(
        vec![Triangle::new(a, c, d), Triangle::new(a, b, c)],
        None,
    ))
}

fn response(smgr: &mut SceneManager, node: NodeId) -> &mut CollisionResponseAnimator {
    smgr.node_mut(node)
        .unwrap()
        .animator_mut(0)
        .and_then(|a| a.downcast_mut::<CollisionResponseAnimator>())
        .unwrap()
}

#[test]
fn test_camera_stops_at_wall() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    let camera = smgr.add_camera_node(None, Vec3::zeros(), Vec3::new(0.0, 0.0, 100.0)).unwrap();
    smgr.node_mut(camera).unwrap().add_animator(Box::new(CollisionResponseAnimator::new(
        Some(wall()),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::zeros(),
        Vec3::zeros(),
    )));

    frame_at(&mut smgr, &mut driver, 0);
    for frame in 1..=20 {
        let node = smgr.node_mut(camera).unwrap();
        node.set_position(node.position() + Vec3::new(0.0, 0.0, 2.0));
        frame_at(&mut smgr, &mut driver, frame * 50);
    }

    let z = smgr.node(camera).unwrap().position().z;
    assert!(z <= 9.0 + 1e-2, "passed the wall: {z}");
    assert!(z > 8.0, "stopped early: {z}");
    assert!(response(&mut smgr, camera).collision_occurred());

    // Corrections are carried over to the look-at target
    let target = smgr.node(camera).unwrap().kind_as::<CameraNode>().unwrap().target();
    assert!(target.z < 100.0);
}

#[test]
fn test_teleport_after_retarget_is_not_collided() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    let body = smgr.add_empty_node(None).unwrap();
    smgr.node_mut(body).unwrap().add_animator(Box::new(CollisionResponseAnimator::new(
        Some(wall()),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::zeros(),
        Vec3::zeros(),
    )));
    frame_at(&mut smgr, &mut driver, 0);

    // Jump straight through the wall
    smgr.node_mut(body).unwrap().set_position(Vec3::new(0.0, 0.0, 30.0));
    response(&mut smgr, body).set_target_node(body);
    frame_at(&mut smgr, &mut driver, 50);

    assert_relative_eq!(smgr.node(body).unwrap().position(), Vec3::new(0.0, 0.0, 30.0));
    assert!(!response(&mut smgr, body).collision_occurred());
}

#[test]
fn test_pick_nearest_and_respect_id_mask() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    let near = smgr.add_cube_node(2.0, None).unwrap();
    smgr.node_mut(near).unwrap().set_position(Vec3::new(0.0, 0.0, 10.0));
    smgr.node_mut(near).unwrap().set_id(0b01);
    let group = smgr.add_empty_node(None).unwrap();
    smgr.node_mut(group).unwrap().set_position(Vec3::new(0.0, 0.0, 20.0));
    let far = smgr.add_cube_node(2.0, Some(group)).unwrap();
    smgr.node_mut(far).unwrap().set_id(0b10);

    frame_at(&mut smgr, &mut driver, 0);
    let ray = Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0));

    let hit = smgr.node_from_ray(&ray, 0).unwrap();
    assert_eq!(hit.node, near);
    assert_relative_eq!(hit.distance, 9.0, epsilon = 1e-4);

    let hit = smgr.node_from_ray(&ray, 0b10).unwrap();
    assert_eq!(hit.node, far);
    assert_relative_eq!(hit.point, Vec3::new(0.0, 0.0, 19.0), epsilon = 1e-4);

    smgr.node_mut(near).unwrap().set_is_debug_object(true);
    smgr.node_mut(group).unwrap().set_visible(false);
    assert!(smgr.node_from_ray(&ray, 0).is_none());
}

#[test]
fn test_collision_point_through_meta_selector() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    let floor_mesh = GeometryCreator::plane(Vec2::new(10.0, 10.0), (4, 4));
    let floor = smgr.add_mesh_node(Some(Rc::new(floor_mesh.clone())), None).unwrap().unwrap();
    smgr.node_mut(floor).unwrap().set_position(Vec3::new(0.0, -5.0, 0.0));
    let crate_node = smgr.add_cube_node(4.0, None).unwrap();
    smgr.node_mut(crate_node).unwrap().set_position(Vec3::new(10.0, 0.0, 0.0));
    frame_at(&mut smgr, &mut driver, 0);

    let mut level = smgr.create_meta_triangle_selector();
    level.add(smgr.create_octree_triangle_selector(&floor_mesh, Some(floor), 4));
    level.add(smgr.create_triangle_selector_from_bounding_box(crate_node));
    assert_eq!(level.triangle_count(smgr.graph()), 32 + 12);

    let down = Ray::new(Vec3::new(-3.0, 10.0, 3.0), Vec3::new(0.0, -1.0, 0.0));
    let hit = smgr.collision_point(&down, 100.0, &level).unwrap();
    assert_relative_eq!(hit.point, Vec3::new(-3.0, -5.0, 3.0), epsilon = 1e-4);
    assert_eq!(hit.node, Some(floor));

    let onto_crate = Ray::new(Vec3::new(11.0, 10.0, 0.5), Vec3::new(0.0, -1.0, 0.0));
    let hit = smgr.collision_point(&onto_crate, 100.0, &level).unwrap();
    assert_relative_eq!(hit.point, Vec3::new(11.0, 2.0, 0.5), epsilon = 1e-4);
    assert_eq!(hit.node, Some(crate_node));
}
