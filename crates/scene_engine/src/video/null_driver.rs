//! Recording driver without a graphics backend
//!
//! [`NullDriver`] implements the full [`VideoDriver`] contract but draws
//! nothing. Every call is appended to a command log so tests and headless
//! tools can inspect exactly what the scene manager submitted, and in which
//! order.

use std::time::Instant;

use crate::foundation::math::{Mat4, Vec3};
use crate::foundation::time::FpsCounter;
use crate::scene::Aabb;

use super::{
    Color, Colorf, DriverError, DriverResult, LightData, Material, TransformState, Vertex,
    VideoDriver,
};

/// Default number of simultaneous hardware lights
const DEFAULT_MAX_LIGHTS: usize = 8;

/// One recorded driver call
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCommand {
    /// `begin_scene`
    BeginScene {
        /// Clear colour requested
        color: Color,
    },
    /// `end_scene`
    EndScene,
    /// `set_transform`
    SetTransform(TransformState, Mat4),
    /// `set_material`
    SetMaterial(Material),
    /// `draw_indexed_triangle_list`
    DrawIndexedTriangles {
        /// Number of vertices submitted
        vertex_count: usize,
        /// Number of triangles submitted
        triangle_count: usize,
    },
    /// `draw_3d_box`
    Draw3dBox(Aabb),
    /// `draw_3d_line`
    Draw3dLine(Vec3, Vec3),
    /// `draw_stencil_shadow_volume`
    DrawShadowVolume {
        /// Number of triangles in the volume
        triangle_count: usize,
        /// Whether depth-fail was requested
        z_fail: bool,
    },
    /// `draw_stencil_shadow`
    DrawStencilShadow(Color),
    /// `delete_all_dynamic_lights`
    DeleteAllDynamicLights,
    /// `add_dynamic_light`
    AddDynamicLight(LightData),
    /// `turn_light_on`
    TurnLightOn(usize, bool),
    /// `set_ambient_light`
    SetAmbientLight(Colorf),
}

/// Driver that records calls instead of drawing
#[derive(Debug)]
pub struct NullDriver {
    commands: Vec<DriverCommand>,
    in_scene: bool,
    world: Mat4,
    view: Mat4,
    projection: Mat4,
    lights: Vec<(LightData, bool)>,
    max_lights: usize,
    primitives_this_frame: u32,
    primitives_last_frame: u32,
    screen_size: (u32, u32),
    fps_counter: FpsCounter,
    created: Instant,
}

impl Default for NullDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl NullDriver {
    /// Create a driver with an 800x600 target and eight hardware lights
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            in_scene: false,
            world: Mat4::identity(),
            view: Mat4::identity(),
            projection: Mat4::identity(),
            lights: Vec::new(),
            max_lights: DEFAULT_MAX_LIGHTS,
            primitives_this_frame: 0,
            primitives_last_frame: 0,
            screen_size: (800, 600),
            fps_counter: FpsCounter::new(),
            created: Instant::now(),
        }
    }

    /// Change the number of simultaneous hardware lights
    pub fn with_max_lights(mut self, max_lights: usize) -> Self {
        self.max_lights = max_lights;
        self
    }

    /// Change the reported render target size
    pub fn with_screen_size(mut self, width: u32, height: u32) -> Self {
        self.screen_size = (width, height);
        self
    }

    /// All recorded commands, oldest first
    pub fn commands(&self) -> &[DriverCommand] {
        &self.commands
    }

    /// Forget the recorded commands
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Materials bound since the log was last cleared, in order
    pub fn bound_materials(&self) -> Vec<&Material> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DriverCommand::SetMaterial(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    /// Number of triangle-list draw calls since the log was last cleared
    pub fn draw_call_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DriverCommand::DrawIndexedTriangles { .. }))
            .count()
    }

    /// Hardware lights currently added, with their on/off state
    pub fn lights(&self) -> &[(LightData, bool)] {
        &self.lights
    }

    fn require_scene(&self, call: &str) -> DriverResult<()> {
        if self.in_scene {
            Ok(())
        } else {
            Err(DriverError::SceneBracket(format!("{call} outside begin_scene/end_scene")))
        }
    }
}

impl VideoDriver for NullDriver {
    fn begin_scene(&mut self, _clear_back_buffer: bool, _clear_z_buffer: bool, color: Color) -> DriverResult<()> {
        if self.in_scene {
            return Err(DriverError::SceneBracket("begin_scene called twice".to_string()));
        }
        self.in_scene = true;
        self.primitives_this_frame = 0;
        self.commands.push(DriverCommand::BeginScene { color });
        Ok(())
    }

    fn end_scene(&mut self) -> DriverResult<()> {
        self.require_scene("end_scene")?;
        self.in_scene = false;
        self.primitives_last_frame = self.primitives_this_frame;

        #[allow(clippy::cast_possible_truncation)]
        let now_ms = self.created.elapsed().as_millis() as u32;
        self.fps_counter.register_frame(now_ms);

        self.commands.push(DriverCommand::EndScene);
        Ok(())
    }

    fn set_transform(&mut self, state: TransformState, matrix: &Mat4) {
        match state {
            TransformState::World => self.world = *matrix,
            TransformState::View => self.view = *matrix,
            TransformState::Projection => self.projection = *matrix,
        }
        self.commands.push(DriverCommand::SetTransform(state, *matrix));
    }

    fn transform(&self, state: TransformState) -> Mat4 {
        match state {
            TransformState::World => self.world,
            TransformState::View => self.view,
            TransformState::Projection => self.projection,
        }
    }

    fn set_material(&mut self, material: &Material) {
        self.commands.push(DriverCommand::SetMaterial(material.clone()));
    }

    fn draw_indexed_triangle_list(&mut self, vertices: &[Vertex], indices: &[u16]) -> DriverResult<()> {
        self.require_scene("draw_indexed_triangle_list")?;
        if indices.len() % 3 != 0 {
            return Err(DriverError::DrawFailed(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| usize::from(i) >= vertices.len()) {
            return Err(DriverError::DrawFailed(format!(
                "index {bad} out of range for {} vertices",
                vertices.len()
            )));
        }

        let triangle_count = indices.len() / 3;
        #[allow(clippy::cast_possible_truncation)]
        {
            self.primitives_this_frame += triangle_count as u32;
        }
        self.commands.push(DriverCommand::DrawIndexedTriangles {
            vertex_count: vertices.len(),
            triangle_count,
        });
        Ok(())
    }

    fn draw_3d_box(&mut self, aabb: &Aabb, _color: Color) {
        self.commands.push(DriverCommand::Draw3dBox(*aabb));
    }

    fn draw_3d_line(&mut self, start: Vec3, end: Vec3, _color: Color) {
        self.commands.push(DriverCommand::Draw3dLine(start, end));
    }

    fn draw_stencil_shadow_volume(&mut self, triangles: &[Vec3], z_fail: bool) -> DriverResult<()> {
        self.require_scene("draw_stencil_shadow_volume")?;
        self.commands.push(DriverCommand::DrawShadowVolume {
            triangle_count: triangles.len() / 3,
            z_fail,
        });
        Ok(())
    }

    fn draw_stencil_shadow(&mut self, _clear_stencil_buffer: bool, color: Color) -> DriverResult<()> {
        self.require_scene("draw_stencil_shadow")?;
        self.commands.push(DriverCommand::DrawStencilShadow(color));
        Ok(())
    }

    fn delete_all_dynamic_lights(&mut self) {
        self.lights.clear();
        self.commands.push(DriverCommand::DeleteAllDynamicLights);
    }

    fn add_dynamic_light(&mut self, light: &LightData) -> DriverResult<usize> {
        self.lights.push((*light, true));
        self.commands.push(DriverCommand::AddDynamicLight(*light));
        Ok(self.lights.len() - 1)
    }

    fn turn_light_on(&mut self, index: usize, on: bool) {
        if let Some(light) = self.lights.get_mut(index) {
            light.1 = on;
        }
        self.commands.push(DriverCommand::TurnLightOn(index, on));
    }

    fn max_dynamic_light_count(&self) -> usize {
        self.max_lights
    }

    fn dynamic_light_count(&self) -> usize {
        self.lights.len()
    }

    fn set_ambient_light(&mut self, color: Colorf) {
        self.commands.push(DriverCommand::SetAmbientLight(color));
    }

    fn fps(&self) -> u32 {
        self.fps_counter.fps()
    }

    fn primitive_count_drawn(&self) -> u32 {
        self.primitives_last_frame
    }

    fn screen_size(&self) -> (u32, u32) {
        self.screen_size
    }
}
