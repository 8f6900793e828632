//! Particle systems
//!
//! A [`ParticleSystemNode`] owns an optional emitter, a list of affectors
//! and the live particles. Simulation runs during registration with the
//! frame's animation time: the emitter spawns particles for the elapsed
//! time, affectors adjust them, expired particles are dropped and the rest
//! move along their velocity. Particles live in world space, so moving the
//! node does not drag particles that were already emitted.

use std::any::Any;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::foundation::math::{Mat4, Mat4Ext, Vec2, Vec3};
use crate::scene::aabb::Aabb;
use crate::scene::kind::{RegisterContext, RenderContext, SceneNodeKind, SceneNodeType};
use crate::scene::nodes::camera::CameraState;
use crate::scene::render_queue::RenderPass;
use crate::video::{Color, DriverResult, Material, MaterialType, TransformState, Vertex};

/// Upper bound on live particles per system
pub const MAX_PARTICLES: usize = 16250;

/// Seed used when none is given
const DEFAULT_SEED: u64 = 0x5EED;

/// One live particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// World-space position
    pub position: Vec3,
    /// Velocity in units per millisecond
    pub vector: Vec3,
    /// Animation time of emission
    pub start_time: u32,
    /// Animation time after which the particle is removed
    pub end_time: u32,
    /// Current colour
    pub color: Color,
    /// Colour at emission
    pub start_color: Color,
    /// Velocity at emission
    pub start_vector: Vec3,
    /// Width and height of the particle quad
    pub size: Vec2,
}

/// Parameters shared by the built-in emitters
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterSettings {
    /// Initial velocity in units per millisecond
    pub direction: Vec3,
    /// Lower bound of the emission rate
    pub min_particles_per_second: u32,
    /// Upper bound of the emission rate
    pub max_particles_per_second: u32,
    /// Darkest start colour
    pub min_start_color: Color,
    /// Brightest start colour
    pub max_start_color: Color,
    /// Shortest lifetime in milliseconds
    pub lifetime_min_ms: u32,
    /// Longest lifetime in milliseconds
    pub lifetime_max_ms: u32,
    /// Maximum random deviation of the direction in degrees
    pub max_angle_degrees: f32,
    /// Smallest particle size
    pub min_start_size: Vec2,
    /// Largest particle size
    pub max_start_size: Vec2,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, 0.03, 0.0),
            min_particles_per_second: 5,
            max_particles_per_second: 10,
            min_start_color: Color::new(255, 0, 0, 0),
            max_start_color: Color::WHITE,
            lifetime_min_ms: 2000,
            lifetime_max_ms: 4000,
            max_angle_degrees: 0.0,
            min_start_size: Vec2::new(5.0, 5.0),
            max_start_size: Vec2::new(5.0, 5.0),
        }
    }
}

/// Spawns particles over time
pub trait ParticleEmitter: std::fmt::Debug {
    /// Append the particles due after `delta_ms` milliseconds, in the
    /// emitter's local space
    fn emit(&mut self, now_ms: u32, delta_ms: u32, rng: &mut StdRng, out: &mut Vec<Particle>);
}

/// Emission timing and per-particle randomisation common to every emitter
#[derive(Debug, Clone)]
struct EmissionClock {
    settings: EmitterSettings,
    accumulated_ms: f32,
}

impl EmissionClock {
    fn new(settings: EmitterSettings) -> Self {
        Self {
            settings,
            accumulated_ms: 0.0,
        }
    }

    /// Number of particles due now
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn due(&mut self, delta_ms: u32, rng: &mut StdRng) -> u32 {
        let s = &self.settings;
        self.accumulated_ms += delta_ms as f32;

        let spread = s.max_particles_per_second.saturating_sub(s.min_particles_per_second);
        let per_second = s.min_particles_per_second as f32 + rng.gen::<f32>() * spread as f32;
        if per_second <= 0.0 {
            return 0;
        }
        let every_ms = 1000.0 / per_second;
        if self.accumulated_ms <= every_ms {
            return 0;
        }

        let amount = (self.accumulated_ms / every_ms + 0.5) as u32;
        self.accumulated_ms = 0.0;
        amount.min(s.max_particles_per_second.saturating_mul(2))
    }

    fn spawn(&self, position: Vec3, now_ms: u32, rng: &mut StdRng) -> Particle {
        let s = &self.settings;

        let mut vector = s.direction;
        if s.max_angle_degrees > 0.0 {
            let mut angle = || rng.gen::<f32>() * s.max_angle_degrees;
            let rotation = Vec3::new(angle(), angle(), angle());
            vector = Mat4::rotation_degrees(rotation).rotate_vector3(vector);
        }

        let lifetime_spread = s.lifetime_max_ms.saturating_sub(s.lifetime_min_ms);
        let lifetime = s.lifetime_min_ms + if lifetime_spread > 0 { rng.gen_range(0..lifetime_spread) } else { 0 };

        let color = s.max_start_color.interpolated(s.min_start_color, rng.gen::<f32>());
        let t = rng.gen::<f32>();
        let size = s.min_start_size + (s.max_start_size - s.min_start_size) * t;

        Particle {
            position,
            vector,
            start_time: now_ms,
            end_time: now_ms.saturating_add(lifetime),
            color,
            start_color: color,
            start_vector: vector,
            size,
        }
    }
}

/// Emits particles at random points inside a box
#[derive(Debug, Clone)]
pub struct BoxEmitter {
    bounds: Aabb,
    clock: EmissionClock,
}

impl BoxEmitter {
    /// Emitter over `bounds` in the node's local space
    pub fn new(bounds: Aabb, settings: EmitterSettings) -> Self {
        Self {
            bounds,
            clock: EmissionClock::new(settings),
        }
    }

    /// Emission box
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Emission parameters
    pub fn settings(&self) -> &EmitterSettings {
        &self.clock.settings
    }
}

impl ParticleEmitter for BoxEmitter {
    fn emit(&mut self, now_ms: u32, delta_ms: u32, rng: &mut StdRng, out: &mut Vec<Particle>) {
        let amount = self.clock.due(delta_ms, rng);
        let extent = self.bounds.max - self.bounds.min;
        for _ in 0..amount {
            let position = self.bounds.min
                + Vec3::new(rng.gen::<f32>() * extent.x, rng.gen::<f32>() * extent.y, rng.gen::<f32>() * extent.z);
            out.push(self.clock.spawn(position, now_ms, rng));
        }
    }
}

/// Emits every particle from the node's origin
#[derive(Debug, Clone)]
pub struct PointEmitter {
    clock: EmissionClock,
}

impl PointEmitter {
    /// Point emitter with the given parameters
    pub fn new(settings: EmitterSettings) -> Self {
        Self {
            clock: EmissionClock::new(settings),
        }
    }
}

impl ParticleEmitter for PointEmitter {
    fn emit(&mut self, now_ms: u32, delta_ms: u32, rng: &mut StdRng, out: &mut Vec<Particle>) {
        let amount = self.clock.due(delta_ms, rng);
        for _ in 0..amount {
            out.push(self.clock.spawn(Vec3::zeros(), now_ms, rng));
        }
    }
}

/// Modifies live particles once per frame
pub trait ParticleAffector: std::fmt::Debug {
    /// Adjust `particles` for animation time `now_ms`
    fn affect(&mut self, now_ms: u32, particles: &mut [Particle]);
}

/// Bends particle velocity towards a gravity vector
///
/// Particles keep their start velocity at emission and have fully turned
/// into `gravity` after `time_force_lost_ms`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityAffector {
    /// Final velocity in units per millisecond
    pub gravity: Vec3,
    /// Time until the start velocity has no influence left
    pub time_force_lost_ms: u32,
}

impl Default for GravityAffector {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -0.03, 0.0),
            time_force_lost_ms: 1000,
        }
    }
}

impl ParticleAffector for GravityAffector {
    fn affect(&mut self, now_ms: u32, particles: &mut [Particle]) {
        let span = self.time_force_lost_ms.max(1) as f32;
        for particle in particles {
            let age = now_ms.saturating_sub(particle.start_time) as f32;
            let start_weight = 1.0 - (age / span).clamp(0.0, 1.0);
            particle.vector = self.gravity + (particle.start_vector - self.gravity) * start_weight;
        }
    }
}

/// Fades particles to a target colour shortly before they expire
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeOutAffector {
    /// Colour reached at the end of a particle's life
    pub target_color: Color,
    /// Length of the fade in milliseconds
    pub fade_out_time_ms: u32,
}

impl Default for FadeOutAffector {
    fn default() -> Self {
        Self {
            target_color: Color::new(0, 0, 0, 0),
            fade_out_time_ms: 1000,
        }
    }
}

impl ParticleAffector for FadeOutAffector {
    fn affect(&mut self, now_ms: u32, particles: &mut [Particle]) {
        let span = self.fade_out_time_ms.max(1);
        for particle in particles {
            let left = particle.end_time.saturating_sub(now_ms);
            if left < span {
                let d = left as f32 / span as f32;
                particle.color = particle.start_color.interpolated(self.target_color, d);
            }
        }
    }
}

/// Emitter, affectors and live particles
#[derive(Debug)]
pub struct ParticleSystemNode {
    emitter: Option<Box<dyn ParticleEmitter>>,
    affectors: Vec<Box<dyn ParticleAffector>>,
    particles: Vec<Particle>,
    rng: StdRng,
    last_emit_time: Option<u32>,
    bounding_box: Aabb,
    materials: [Material; 1],
}

impl Default for ParticleSystemNode {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ParticleSystemNode {
    /// Particle system with an optional emitter
    pub fn new(emitter: Option<Box<dyn ParticleEmitter>>) -> Self {
        Self {
            emitter,
            affectors: Vec::new(),
            particles: Vec::new(),
            rng: StdRng::seed_from_u64(DEFAULT_SEED),
            last_emit_time: None,
            bounding_box: Aabb::default(),
            materials: [Material::new(MaterialType::TransparentVertexAlpha)],
        }
    }

    /// Reseed the random source, making emission reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Replace the emitter; `None` stops emission
    pub fn set_emitter(&mut self, emitter: Option<Box<dyn ParticleEmitter>>) {
        self.emitter = emitter;
    }

    /// Current emitter
    pub fn emitter(&self) -> Option<&dyn ParticleEmitter> {
        self.emitter.as_deref()
    }

    /// Append an affector
    pub fn add_affector(&mut self, affector: Box<dyn ParticleAffector>) {
        self.affectors.push(affector);
    }

    /// Drop every affector
    pub fn remove_all_affectors(&mut self) {
        self.affectors.clear();
    }

    /// Number of affectors
    pub fn affector_count(&self) -> usize {
        self.affectors.len()
    }

    /// Live particles
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Drop every live particle
    pub fn clear_particles(&mut self) {
        self.particles.clear();
    }

    /// Advance the simulation to `now_ms`
    ///
    /// The first call only starts the clock.
    pub fn simulate(&mut self, now_ms: u32, absolute: &Mat4) {
        let Some(last) = self.last_emit_time.replace(now_ms) else {
            return;
        };
        let delta_ms = now_ms.saturating_sub(last);

        if let Some(emitter) = &mut self.emitter {
            let mut spawned = Vec::new();
            emitter.emit(now_ms, delta_ms, &mut self.rng, &mut spawned);
            let room = MAX_PARTICLES.saturating_sub(self.particles.len());
            self.particles.extend(spawned.into_iter().take(room).map(|mut particle| {
                particle.position = absolute.transform_point3(particle.position);
                particle.vector = absolute.rotate_vector3(particle.vector);
                particle.start_vector = particle.vector;
                particle
            }));
        }

        for affector in &mut self.affectors {
            affector.affect(now_ms, &mut self.particles);
        }

        let step = delta_ms as f32;
        self.particles.retain(|particle| now_ms <= particle.end_time);
        let mut bounds = Aabb::from_point(absolute.translation());
        let mut largest = 0.0_f32;
        for particle in &mut self.particles {
            particle.position += particle.vector * step;
            bounds.add_point(particle.position);
            largest = largest.max(particle.size.x).max(particle.size.y);
        }
        let margin = Vec3::repeat(largest * 0.5);
        bounds = Aabb::new(bounds.min - margin, bounds.max + margin);

        // Node bounds are local, particles are world space
        self.bounding_box = match absolute.try_inverse() {
            Some(inverse) => bounds.transformed(&inverse),
            None => Aabb::default(),
        };
    }

    /// Camera-facing quads for the live particles
    pub fn build_quads(&self, camera: &CameraState) -> (Vec<Vertex>, Vec<u16>) {
        let view = (camera.target - camera.position)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| Vec3::new(0.0, 0.0, 1.0));
        let horizontal = camera
            .up
            .cross(&view)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| Vec3::new(1.0, 0.0, 0.0));
        let vertical = horizontal.cross(&view).normalize();
        let normal = -view;

        // u16 indices address at most 16384 quads
        let count = self.particles.len().min(usize::from(u16::MAX) / 4);
        let mut vertices = Vec::with_capacity(count * 4);
        let mut indices = Vec::with_capacity(count * 6);
        for (base, particle) in (0u16..).step_by(4).zip(&self.particles[..count]) {
            let h = horizontal * (0.5 * particle.size.x);
            let v = vertical * (0.5 * particle.size.y);
            let p = particle.position;
            for (corner, tex) in [(p + h + v, (0.0, 0.0)), (p + h - v, (0.0, 1.0)), (p - h - v, (1.0, 1.0)), (p - h + v, (1.0, 0.0))] {
                vertices.push(Vertex::new(corner, normal, particle.color, Vec2::new(tex.0, tex.1)));
            }
            indices.extend_from_slice(&[base, base + 2, base + 1, base, base + 3, base + 2]);
        }
        (vertices, indices)
    }
}

impl SceneNodeKind for ParticleSystemNode {
    fn node_type(&self) -> SceneNodeType {
        SceneNodeType::ParticleSystem
    }

    fn on_register(&mut self, ctx: &mut RegisterContext<'_>) {
        self.simulate(ctx.time_ms(), ctx.absolute_transformation());
        if !self.particles.is_empty() {
            ctx.register(RenderPass::TransparentEffect);
        }
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) -> DriverResult<()> {
        let Some(camera) = ctx.camera().copied() else {
            return Ok(());
        };
        let (vertices, indices) = self.build_quads(&camera);
        if indices.is_empty() {
            return Ok(());
        }

        let driver = ctx.driver();
        driver.set_transform(TransformState::World, &Mat4::identity());
        driver.set_material(&self.materials[0]);
        driver.draw_indexed_triangle_list(&vertices, &indices)
    }

    fn bounding_box(&self) -> Aabb {
        self.bounding_box
    }

    fn materials(&self) -> &[Material] {
        &self.materials
    }

    fn materials_mut(&mut self) -> &mut [Material] {
        &mut self.materials
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

    fn particle(start_time: u32, end_time: u32) -> Particle {
        Particle {
            position: Vec3::zeros(),
            vector: Vec3::new(0.0, 1.0, 0.0),
            start_time,
            end_time,
            color: Color::WHITE,
            start_color: Color::WHITE,
            start_vector: Vec3::new(0.0, 1.0, 0.0),
            size: Vec2::new(1.0, 1.0),
        }
    }

    fn steady_settings() -> EmitterSettings {
        EmitterSettings {
            min_particles_per_second: 100,
            max_particles_per_second: 100,
            lifetime_min_ms: 500,
            lifetime_max_ms: 500,
            ..EmitterSettings::default()
        }
    }

    #[test]
    fn test_first_call_only_starts_the_clock() {
        let emitter = BoxEmitter::new(Aabb::new(Vec3::repeat(-1.0), Vec3::repeat(1.0)), steady_settings());
        let mut system = ParticleSystemNode::new(Some(Box::new(emitter)));

        system.simulate(1000, &Mat4::identity());
        assert!(system.particles().is_empty());

        system.simulate(1100, &Mat4::identity());
        // 100 per second over 100ms
        assert_eq!(system.particles().len(), 10);
    }

    #[test]
    fn test_particles_are_emitted_in_world_space_and_expire() {
        let emitter = BoxEmitter::new(Aabb::new(Vec3::repeat(-1.0), Vec3::repeat(1.0)), steady_settings());
        let mut system = ParticleSystemNode::new(Some(Box::new(emitter))).with_seed(7);
        let absolute = Mat4::new_translation(&Vec3::new(100.0, 0.0, 0.0));

        system.simulate(0, &absolute);
        system.simulate(100, &absolute);
        assert!(system.particles().iter().all(|p| (p.position.x - 100.0).abs() <= 1.0));
        assert!(system.bounding_box().contains_point(Vec3::zeros()));

        system.set_emitter(None);
        system.simulate(700, &absolute);
        assert!(system.particles().is_empty());
    }

    #[test]
    fn test_gravity_affector_blends_to_gravity() {
        let mut gravity = GravityAffector {
            gravity: Vec3::new(0.0, -1.0, 0.0),
            time_force_lost_ms: 1000,
        };
        let mut particles = [particle(0, 5000)];

        gravity.affect(0, &mut particles);
        assert_relative_eq!(particles[0].vector, Vec3::new(0.0, 1.0, 0.0));

        gravity.affect(500, &mut particles);
        assert_relative_eq!(particles[0].vector, Vec3::zeros());

        gravity.affect(2000, &mut particles);
        assert_relative_eq!(particles[0].vector, Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_fade_out_affector() {
        let mut fade = FadeOutAffector::default();
        let mut particles = [particle(0, 2000)];

        fade.affect(500, &mut particles);
        assert_eq!(particles[0].color, Color::WHITE);

        fade.affect(2000, &mut particles);
        assert_eq!(particles[0].color, fade.target_color);
    }

    #[test]
    fn test_particle_cap() {
        let settings = EmitterSettings {
            min_particles_per_second: 100_000,
            max_particles_per_second: 100_000,
            lifetime_min_ms: 60_000,
            lifetime_max_ms: 60_000,
            ..EmitterSettings::default()
        };
        let mut system = ParticleSystemNode::new(Some(Box::new(PointEmitter::new(settings))));
        system.simulate(0, &Mat4::identity());
        for step in 1..=20 {
            system.simulate(step * 100, &Mat4::identity());
        }
        assert_eq!(system.particles().len(), MAX_PARTICLES);
    }

    #[test]
    fn test_quads_per_particle() {
        let mut system = ParticleSystemNode::default();
        system.particles = vec![particle(0, 100); 3];
        let mut camera = crate::scene::nodes::CameraNode::new(Vec3::new(0.0, 0.0, 10.0));
        let state = camera.update_matrices(&Mat4::identity());

        let (vertices, indices) = system.build_quads(&state);
        assert_eq!(vertices.len(), 12);
        assert_eq!(indices.len(), 18);
    }
}
