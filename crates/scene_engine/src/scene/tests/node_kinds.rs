//! Built-in node kinds drawn through a full frame

use std::rc::Rc;

use super::frame_at;
use crate::foundation::math::{Vec2, Vec3};
use crate::scene::mesh::GeometryCreator;
use crate::scene::nodes::{EmitterSettings, ParticleSystemNode, PointEmitter, SphereNode};
use crate::scene::{DebugData, RenderPass, SceneManager, SceneNodeType};
use crate::video::{Color, DriverCommand, LightData, MaterialFlags, MaterialType, NullDriver};

fn count(driver: &NullDriver, predicate: impl Fn(&DriverCommand) -> bool) -> usize {
    driver.commands().iter().filter(|c| predicate(c)).count()
}

fn triangle_draws(driver: &NullDriver) -> Vec<usize> {
    driver
        .commands()
        .iter()
        .filter_map(|c| match c {
            DriverCommand::DrawIndexedTriangles { triangle_count, .. } => Some(*triangle_count),
            _ => None,
        })
        .collect()
}

#[test]
fn test_shadow_volume_fills_stencil_once() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();
    smgr.set_shadow_color(Color::new(120, 0, 0, 0));

    smgr.add_camera_node(None, Vec3::new(0.0, 10.0, -30.0), Vec3::zeros()).unwrap();
    smgr.add_light_node(None, Vec3::new(0.0, 40.0, 0.0), LightData::default()).unwrap();
    let mesh = Rc::new(GeometryCreator::cube(Vec3::repeat(4.0)));
    let caster = smgr.add_mesh_node(Some(Rc::clone(&mesh)), None).unwrap().unwrap();
    let shadow = smgr.add_shadow_volume_node(Some(mesh), Some(caster), false).unwrap().unwrap();

    let stats = frame_at(&mut smgr, &mut driver, 0);

    assert!(smgr.render_queue().contains(RenderPass::Shadow, shadow));
    assert_eq!(stats.shadow_volumes, 1);
    assert_eq!(count(&driver, |c| matches!(c, DriverCommand::DrawShadowVolume { .. })), 1);
    assert_eq!(
        count(&driver, |c| *c == DriverCommand::DrawStencilShadow(Color::new(120, 0, 0, 0))),
        1
    );
}

#[test]
fn test_no_stencil_fill_without_volumes() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    smgr.add_camera_node(None, Vec3::new(0.0, 10.0, -30.0), Vec3::zeros()).unwrap();
    let mesh = Rc::new(GeometryCreator::cube(Vec3::repeat(4.0)));
    smgr.add_shadow_volume_node(Some(mesh), None, true).unwrap();

    // No light to cast from
    let stats = frame_at(&mut smgr, &mut driver, 0);
    assert_eq!(stats.shadow_volumes, 0);
    assert_eq!(count(&driver, |c| matches!(c, DriverCommand::DrawStencilShadow(_))), 0);
}

#[test]
fn test_particles_register_once_alive() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    smgr.add_camera_node(None, Vec3::new(0.0, 0.0, -50.0), Vec3::zeros()).unwrap();
    let settings = EmitterSettings {
        min_particles_per_second: 100,
        max_particles_per_second: 100,
        ..EmitterSettings::default()
    };
    let system = smgr
        .add_particle_system_node(None, Some(Box::new(PointEmitter::new(settings))))
        .unwrap();

    let stats = frame_at(&mut smgr, &mut driver, 0);
    assert_eq!(stats.pass(RenderPass::TransparentEffect).registered, 0);

    driver.clear_commands();
    let stats = frame_at(&mut smgr, &mut driver, 100);
    let particles = smgr.node(system).unwrap().kind_as::<ParticleSystemNode>().unwrap().particles().len();
    assert_eq!(particles, 10);
    assert_eq!(stats.pass(RenderPass::TransparentEffect).rendered, 1);
    assert!(driver.commands().contains(&DriverCommand::DrawIndexedTriangles {
        vertex_count: 40,
        triangle_count: 20,
    }));
}

#[test]
fn test_sky_box_draws_six_faces_first() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    smgr.add_camera_node(None, Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0)).unwrap();
    let sky = smgr.add_sky_box_node(Default::default(), None).unwrap();
    let billboard = smgr.add_billboard_node(None, Vec2::new(2.0, 2.0), Vec3::new(0.0, 0.0, 20.0)).unwrap();

    let stats = frame_at(&mut smgr, &mut driver, 0);

    assert!(smgr.render_queue().contains(RenderPass::SkyBox, sky));
    assert!(smgr.render_queue().contains(RenderPass::Solid, billboard));
    assert_eq!(stats.pass(RenderPass::SkyBox).rendered, 1);

    let draws: Vec<_> = driver
        .commands()
        .iter()
        .filter_map(|c| match c {
            DriverCommand::DrawIndexedTriangles { triangle_count, .. } => Some(*triangle_count),
            _ => None,
        })
        .collect();
    // Six two-triangle faces, then the billboard quad
    assert_eq!(draws, [2, 2, 2, 2, 2, 2, 2]);
}

#[test]
fn test_debug_box_for_lights() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    smgr.add_camera_node(None, Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0)).unwrap();
    let light = smgr.add_light_node(None, Vec3::new(0.0, 0.0, 10.0), LightData::default()).unwrap();
    smgr.node_mut(light).unwrap().set_debug_data(DebugData::BBOX);

    frame_at(&mut smgr, &mut driver, 0);

    assert_eq!(count(&driver, |c| matches!(c, DriverCommand::Draw3dBox(_))), 1);
    assert_eq!(smgr.nodes_of_type(SceneNodeType::Light, None), [light]);
}

#[test]
fn test_sphere_pass_follows_material() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    smgr.add_camera_node(None, Vec3::new(0.0, 0.0, -30.0), Vec3::zeros()).unwrap();
    let sphere = smgr.add_sphere_node(5.0, 16, None).unwrap();

    frame_at(&mut smgr, &mut driver, 0);
    assert!(smgr.render_queue().contains(RenderPass::Solid, sphere));
    assert_eq!(smgr.nodes_of_type(SceneNodeType::Sphere, None), [sphere]);
    assert_eq!(triangle_draws(&driver), [2 * 16 * 15]);

    smgr.node_mut(sphere).unwrap().material_mut(0).unwrap().material_type = MaterialType::TransparentAlphaChannel;
    frame_at(&mut smgr, &mut driver, 16);
    assert!(smgr.render_queue().contains(RenderPass::Transparent, sphere));
    assert!(!smgr.render_queue().contains(RenderPass::Solid, sphere));
}

#[test]
fn test_sphere_casts_shadow_volume() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    smgr.add_camera_node(None, Vec3::new(0.0, 10.0, -30.0), Vec3::zeros()).unwrap();
    smgr.add_light_node(None, Vec3::new(0.0, 40.0, 0.0), LightData::default()).unwrap();
    let sphere = smgr.add_sphere_node(3.0, 12, None).unwrap();
    let mesh = smgr
        .node(sphere)
        .and_then(|n| n.kind_as::<SphereNode>())
        .map(|s| Rc::clone(s.mesh()));
    let shadow = smgr.add_shadow_volume_node(mesh, Some(sphere), false).unwrap().unwrap();

    let stats = frame_at(&mut smgr, &mut driver, 0);

    assert!(smgr.render_queue().contains(RenderPass::Shadow, shadow));
    assert_eq!(stats.shadow_volumes, 1);
    assert_eq!(count(&driver, |c| matches!(c, DriverCommand::DrawShadowVolume { .. })), 1);
}

#[test]
fn test_volume_light_drawn_additive_after_solids() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    smgr.add_camera_node(None, Vec3::new(0.0, 0.0, -30.0), Vec3::zeros()).unwrap();
    let shafts = smgr
        .add_volume_light_node(
            None,
            (4, 4),
            Color::new(51, 0, 230, 180),
            Color::new(0, 0, 0, 0),
            Vec3::new(0.0, 0.0, -10.0),
        )
        .unwrap();
    smgr.add_cube_node(4.0, None).unwrap();

    frame_at(&mut smgr, &mut driver, 0);

    assert!(smgr.render_queue().contains(RenderPass::Transparent, shafts));
    assert_eq!(smgr.nodes_of_type(SceneNodeType::VolumeLight, None), [shafts]);
    // Cube first, then the foot quad plus four triangles per slice side
    assert_eq!(triangle_draws(&driver), [12, 2 + 4 * 5 + 4 * 5]);

    let material = driver.bound_materials().last().copied().cloned().unwrap();
    assert_eq!(material.material_type, MaterialType::TransparentAddColor);
    assert!(!material.flags.contains(MaterialFlags::ZWRITE_ENABLE));
}

#[test]
fn test_transparent_billboard_drawn_after_opaque_mesh() {
    let mut smgr = SceneManager::new();
    let mut driver = NullDriver::new();

    smgr.add_camera_node(None, Vec3::new(0.0, 0.0, -30.0), Vec3::zeros()).unwrap();
    // Nearer to the camera than the cube, so only the pass split orders them
    let billboard = smgr.add_billboard_node(None, Vec2::new(2.0, 2.0), Vec3::new(0.0, 0.0, -10.0)).unwrap();
    let cube = smgr.add_cube_node(4.0, None).unwrap();
    smgr.node_mut(billboard).unwrap().material_mut(0).unwrap().material_type = MaterialType::TransparentAddColor;

    frame_at(&mut smgr, &mut driver, 0);

    assert!(smgr.render_queue().contains(RenderPass::Transparent, billboard));
    assert!(smgr.render_queue().contains(RenderPass::Solid, cube));
    assert_eq!(triangle_draws(&driver), [12, 2]);
}
