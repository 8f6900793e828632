//! Headless scene demo
//!
//! Builds a small level and draws it through the recording null driver:
//! - A tiled floor with a field of rotating crates scattered at random
//! - A camera with collision response walking forward across the floor
//! - A light circling the crates, with a shadow volume under one of them
//! - A sky box, a billboard and a particle fountain
//!
//! Run with `RUST_LOG=debug` for per-node logging. An optional first
//! argument names a `.toml` or `.ron` scene configuration.

use std::rc::Rc;

use rand::prelude::*;
use scene_engine::prelude::*;
use scene_engine::scene::nodes::{EmitterSettings, FadeOutAffector, GravityAffector, PointEmitter};
use scene_engine::video::DriverCommand;
use thiserror::Error;

// Level layout
const FLOOR_TILES: u16 = 20;
const FLOOR_TILE_SIZE: f32 = 10.0;
const NUM_CRATES: usize = 24;
const CRATE_SIZE: f32 = 4.0;

// Simulation
const FRAME_MS: u32 = 16;
const NUM_FRAMES: u32 = 240;
const WALK_SPEED: f32 = 0.02; // units per ms
const RNG_SEED: u64 = 7;

#[derive(Error, Debug)]
enum DemoError {
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Node missing: {0}")]
    MissingNode(&'static str),
}

struct Demo {
    smgr: SceneManager,
    driver: NullDriver,
    camera: NodeId,
}

impl Demo {
    fn new(config_path: Option<&str>) -> Result<Self, DemoError> {
        let mut smgr = match config_path {
            Some(path) => SceneManager::from_config_file(path)?,
            None => SceneManager::new(),
        };
        let camera = Self::build_level(&mut smgr)?;
        Ok(Self {
            smgr,
            driver: NullDriver::new().with_screen_size(1280, 720),
            camera,
        })
    }

    /// Populate the scene and return the walking camera
    fn build_level(smgr: &mut SceneManager) -> Result<NodeId, DemoError> {
        smgr.set_ambient_light(Colorf::new(0.2, 0.2, 0.25, 1.0));

        let floor_mesh = Rc::new(GeometryCreator::plane(
            Vec2::new(FLOOR_TILE_SIZE, FLOOR_TILE_SIZE),
            (FLOOR_TILES, FLOOR_TILES),
        ));
        let floor = smgr
            .add_mesh_node(Some(Rc::clone(&floor_mesh)), None)?
            .ok_or(DemoError::MissingNode("floor"))?;
        smgr.node_mut(floor)
            .ok_or(DemoError::MissingNode("floor"))?
            .set_name("floor");

        let mut level = smgr.create_meta_triangle_selector();
        level.add(smgr.create_octree_triangle_selector(&floor_mesh, Some(floor), 32));

        let mut rng = StdRng::seed_from_u64(RNG_SEED);
        let half_extent = f32::from(FLOOR_TILES) * FLOOR_TILE_SIZE * 0.4;
        let crates = smgr.add_empty_node(None)?;
        let crate_mesh = Rc::new(GeometryCreator::cube(Vec3::repeat(CRATE_SIZE)));
        for i in 0..NUM_CRATES {
            let id = smgr
                .add_mesh_node(Some(Rc::clone(&crate_mesh)), Some(crates))?
                .ok_or(DemoError::MissingNode("crate"))?;
            let spin = rng.gen_range(-45.0..45.0);
            let node = smgr.node_mut(id).ok_or(DemoError::MissingNode("crate"))?;
            node.set_name(format!("crate_{i}"));
            node.set_position(Vec3::new(
                rng.gen_range(-half_extent..half_extent),
                CRATE_SIZE * 0.5,
                rng.gen_range(-half_extent..half_extent),
            ));
            node.add_animator(Box::new(RotationAnimator::new(Vec3::new(0.0, spin, 0.0))));
            level.add(smgr.create_triangle_selector_from_bounding_box(id));
        }

        if let Some(first) = smgr.node_from_name("crate_0", Some(crates)) {
            smgr.add_shadow_volume_node(Some(Rc::clone(&crate_mesh)), Some(first), false)?;
        }

        let light = smgr.add_light_node(None, Vec3::new(0.0, 30.0, 0.0), LightData::default())?;
        smgr.node_mut(light)
            .ok_or(DemoError::MissingNode("light"))?
            .add_animator(Box::new(FlyCircleAnimator::new(
                0,
                Vec3::new(0.0, 30.0, 0.0),
                40.0,
                0.001,
                Vec3::new(0.0, 1.0, 0.0),
            )));

        let orb = smgr.add_sphere_node(5.0, 24, None)?;
        smgr.node_mut(orb)
            .ok_or(DemoError::MissingNode("sphere"))?
            .set_position(Vec3::new(-30.0, 5.0, 10.0));
        let orb_mesh = smgr
            .node(orb)
            .and_then(|n| n.kind_as::<SphereNode>())
            .map(|s| Rc::clone(s.mesh()));
        smgr.add_shadow_volume_node(orb_mesh, Some(orb), false)?;

        smgr.add_volume_light_node(
            None,
            (32, 32),
            Color::new(51, 0, 230, 180),
            Color::new(0, 0, 0, 0),
            Vec3::new(30.0, 0.0, 10.0),
        )?;

        smgr.add_sky_box_node(Default::default(), None)?;
        smgr.add_billboard_node(None, Vec2::new(8.0, 8.0), Vec3::new(0.0, 20.0, 40.0))?;

        let fountain = smgr.add_particle_system_node(
            None,
            Some(Box::new(PointEmitter::new(EmitterSettings {
                min_particles_per_second: 80,
                max_particles_per_second: 120,
                max_angle_degrees: 20.0,
                ..EmitterSettings::default()
            }))),
        )?;
        if let Some(system) = smgr
            .node_mut(fountain)
            .and_then(|n| n.kind_as_mut::<ParticleSystemNode>())
        {
            system.add_affector(Box::new(GravityAffector::default()));
            system.add_affector(Box::new(FadeOutAffector::default()));
        }

        let camera = smgr.add_camera_node(None, Vec3::new(0.0, 10.0, -80.0), Vec3::new(0.0, 10.0, 0.0))?;
        smgr.node_mut(camera)
            .ok_or(DemoError::MissingNode("camera"))?
            .add_animator(Box::new(CollisionResponseAnimator::new(
                Some(Rc::new(level)),
                Vec3::new(3.0, 5.0, 3.0),
                Vec3::new(0.0, -100.0, 0.0),
                Vec3::new(0.0, 5.0, 0.0),
            )));

        log::info!("Built level with {} nodes", smgr.graph().len());
        Ok(camera)
    }

    fn run(&mut self) -> Result<(), DemoError> {
        let mut total_draws = 0;
        for frame in 0..NUM_FRAMES {
            self.walk_camera();
            self.smgr.timer_mut().set_time(frame * FRAME_MS);

            self.driver.clear_commands();
            self.smgr.begin_frame(&mut self.driver)?;
            let stats = self.smgr.draw_all(&mut self.driver)?;
            self.smgr.end_frame(&mut self.driver)?;
            total_draws += self.driver.draw_call_count();

            if frame % 60 == 0 {
                self.report(frame, &stats);
            }
        }

        log::info!("Drew {NUM_FRAMES} frames with {total_draws} draw calls");
        Ok(())
    }

    fn walk_camera(&mut self) {
        let Some(node) = self.smgr.node_mut(self.camera) else { return };
        #[allow(clippy::cast_precision_loss)]
        let step = WALK_SPEED * FRAME_MS as f32;
        node.set_position(node.position() + Vec3::new(0.0, 0.0, step));
    }

    fn report(&self, frame: u32, stats: &FrameStats) {
        let camera = self.smgr.node(self.camera).map(|n| n.position()).unwrap_or_default();
        let shadows = self
            .driver
            .commands()
            .iter()
            .filter(|c| matches!(c, DriverCommand::DrawShadowVolume { .. }))
            .count();
        log::info!(
            "Frame {frame}: camera at ({:.1}, {:.1}, {:.1}), {} rendered, {} culled, {} lights, {shadows} shadow volumes",
            camera.x,
            camera.y,
            camera.z,
            stats.total_rendered(),
            stats.total_culled(),
            stats.lights_bound,
        );
        for pass in RenderPass::DRAW_ORDER {
            let pass_stats = stats.pass(pass);
            log::debug!(
                "  {pass:?}: {} registered, {} culled, {} rendered",
                pass_stats.registered,
                pass_stats.culled,
                pass_stats.rendered
            );
        }

        let center = self.smgr.screen_coordinates(Vec3::zeros(), self.driver.screen_size());
        if let Some(hit) = self.smgr.node_from_camera(0) {
            let name = self.smgr.node(hit.node).map_or("?", |n| n.name());
            log::info!("  looking at '{name}' {:.1} units ahead, origin on screen at {center:?}", hit.distance);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    println!("=== Scene Graph Demo ===");
    println!("Drawing {NUM_FRAMES} frames headless through the null driver");
    println!();

    let config_path = std::env::args().nth(1);
    let mut demo = Demo::new(config_path.as_deref())?;
    demo.run()?;
    Ok(())
}
