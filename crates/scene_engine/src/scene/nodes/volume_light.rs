//! Volumetric light shafts
//!
//! A fan of additive quads rising from a rectangular foot. Each shaft
//! points away from a virtual light source below the foot, so the shafts
//! spread out the further the source is from the foot.

use std::any::Any;
use std::collections::HashMap;

use crate::foundation::math::{Vec2, Vec3};
use crate::scene::aabb::Aabb;
use crate::scene::kind::{RegisterContext, RenderContext, SceneNodeKind, SceneNodeType};
use crate::scene::render_queue::RenderPass;
use crate::video::{Color, DriverResult, Material, MaterialFlags, MaterialType, TransformState, Vertex};

/// Most slices per side
pub const MAX_SUBDIVISIONS: u16 = 256;

/// Closest the virtual light source may be to the foot
pub const MIN_LIGHT_DISTANCE: f32 = 8.0;

/// Vertex key for merging identical corners
type VertexKey = [u32; 6];

#[derive(Default)]
struct ShaftBuilder {
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
    lookup: HashMap<VertexKey, u16>,
}

impl ShaftBuilder {
    fn push(&mut self, position: Vec3, color: Color, tex: (f32, f32)) {
        let key = [
            position.x.to_bits(),
            position.y.to_bits(),
            position.z.to_bits(),
            tex.0.to_bits(),
            tex.1.to_bits(),
            u32::from_be_bytes([color.a, color.r, color.g, color.b]),
        ];
        let next = self.vertices.len();
        // Bounded by MAX_SUBDIVISIONS, far below the u16 range
        let index = *self
            .lookup
            .entry(key)
            .or_insert_with(|| u16::try_from(next).unwrap_or(u16::MAX));
        if usize::from(index) == next {
            self.vertices.push(Vertex::new(position, Vec3::zeros(), color, Vec2::new(tex.0, tex.1)));
        }
        self.indices.push(index);
    }
}

/// Additive light shafts, drawn in the transparent pass
#[derive(Debug, Clone)]
pub struct VolumeLightNode {
    subdivide_u: u16,
    subdivide_v: u16,
    foot_color: Color,
    tail_color: Color,
    dimensions: Vec3,
    light_distance: f32,
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
    bounding_box: Aabb,
    materials: [Material; 1],
}

impl Default for VolumeLightNode {
    fn default() -> Self {
        Self::new(32, 32, Color::new(51, 0, 230, 180), Color::new(0, 0, 0, 0))
    }
}

impl VolumeLightNode {
    /// Create shafts with `subdivide_u` by `subdivide_v` slices
    ///
    /// Colours fade from `foot` at the base to `tail` at the shaft ends.
    pub fn new(subdivide_u: u16, subdivide_v: u16, foot: Color, tail: Color) -> Self {
        let mut material = Material::new(MaterialType::TransparentAddColor);
        material.set_flag(MaterialFlags::LIGHTING, false);
        material.set_flag(MaterialFlags::ZWRITE_ENABLE, false);

        let mut node = Self {
            subdivide_u: subdivide_u.clamp(1, MAX_SUBDIVISIONS),
            subdivide_v: subdivide_v.clamp(1, MAX_SUBDIVISIONS),
            foot_color: foot,
            tail_color: tail,
            dimensions: Vec3::new(1.0, 1.2, 1.0),
            light_distance: MIN_LIGHT_DISTANCE,
            vertices: Vec::new(),
            indices: Vec::new(),
            bounding_box: Aabb::default(),
            materials: [material],
        };
        node.construct();
        node
    }

    /// Slices along X and Z
    pub fn subdivisions(&self) -> (u16, u16) {
        (self.subdivide_u, self.subdivide_v)
    }

    /// Change the number of slices
    pub fn set_subdivisions(&mut self, u: u16, v: u16) {
        self.subdivide_u = u.clamp(1, MAX_SUBDIVISIONS);
        self.subdivide_v = v.clamp(1, MAX_SUBDIVISIONS);
        self.construct();
    }

    /// Colour at the foot
    pub fn foot_color(&self) -> Color {
        self.foot_color
    }

    /// Colour at the shaft ends
    pub fn tail_color(&self) -> Color {
        self.tail_color
    }

    /// Change both colours
    pub fn set_colors(&mut self, foot: Color, tail: Color) {
        self.foot_color = foot;
        self.tail_color = tail;
        self.construct();
    }

    /// Foot width and depth in X and Z, shaft length in Y
    pub fn dimensions(&self) -> Vec3 {
        self.dimensions
    }

    /// Change the foot size and shaft length
    pub fn set_dimensions(&mut self, dimensions: Vec3) {
        self.dimensions = dimensions;
        self.construct();
    }

    /// Distance of the virtual light source, in shaft lengths
    pub fn light_distance(&self) -> f32 {
        self.light_distance
    }

    /// Move the virtual light source; closer sources spread the shafts more
    pub fn set_light_distance(&mut self, distance: f32) {
        self.light_distance = distance.max(MIN_LIGHT_DISTANCE);
        self.construct();
    }

    /// Generated vertices
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Generated triangle list indices
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    fn construct(&mut self) {
        let dims = self.dimensions;
        let light_point = Vec3::new(0.0, -self.light_distance * dims.y, 0.0);
        let (ax, az) = (dims.x * 0.5, dims.z * 0.5);
        let (foot, tail) = (self.foot_color, self.tail_color);
        let shaft_end = |p: Vec3| p + (p - light_point).normalize() * dims.y;
        let mirror = |p: Vec3| Vec3::new(-p.x, p.y, -p.z);

        let mut b = ShaftBuilder::default();

        // Foot quad
        b.push(Vec3::new(-ax, 0.0, az), foot, (0.0, 1.0));
        b.push(Vec3::new(ax, 0.0, az), foot, (1.0, 1.0));
        b.push(Vec3::new(ax, 0.0, -az), foot, (1.0, 0.0));
        b.push(Vec3::new(ax, 0.0, -az), foot, (1.0, 0.0));
        b.push(Vec3::new(-ax, 0.0, -az), foot, (0.0, 0.0));
        b.push(Vec3::new(-ax, 0.0, az), foot, (0.0, 1.0));

        // Slices across X
        for i in 0..=self.subdivide_u {
            let k = f32::from(i) / f32::from(self.subdivide_u);
            let bx = dims.x * k - ax;
            let (back, front) = (Vec3::new(bx, 0.0, -az), Vec3::new(bx, 0.0, az));
            let (back_end, front_end) = (shaft_end(back), shaft_end(front));

            b.push(front, foot, (k, 1.0));
            b.push(back, foot, (k, 0.0));
            b.push(front_end, tail, (k, 1.0));

            b.push(back, foot, (k, 0.0));
            b.push(back_end, tail, (k, 0.0));
            b.push(front_end, tail, (k, 1.0));

            b.push(mirror(front_end), tail, (k, 1.0));
            b.push(mirror(front), foot, (k, 1.0));
            b.push(mirror(back), foot, (k, 0.0));

            b.push(mirror(back), foot, (k, 0.0));
            b.push(mirror(back_end), tail, (k, 0.0));
            b.push(mirror(front_end), tail, (k, 1.0));
        }

        // Slices across Z
        for i in 0..=self.subdivide_v {
            let k = f32::from(i) / f32::from(self.subdivide_v);
            let bz = dims.z * k - az;
            let (left, right) = (Vec3::new(-ax, 0.0, bz), Vec3::new(ax, 0.0, bz));
            let (left_end, right_end) = (shaft_end(left), shaft_end(right));

            b.push(left, foot, (0.0, k));
            b.push(right, foot, (1.0, k));
            b.push(right_end, tail, (1.0, k));

            b.push(right_end, tail, (1.0, k));
            b.push(left_end, tail, (0.0, k));
            b.push(left, foot, (0.0, k));

            b.push(mirror(left), foot, (0.0, k));
            b.push(mirror(right), foot, (1.0, k));
            b.push(mirror(right_end), tail, (1.0, k));

            b.push(mirror(right_end), tail, (1.0, k));
            b.push(mirror(left_end), tail, (0.0, k));
            b.push(mirror(left), foot, (0.0, k));
        }

        self.bounding_box = Aabb::from_points(b.vertices.iter().map(|v| v.position)).unwrap_or_default();
        self.vertices = b.vertices;
        self.indices = b.indices;
    }
}

impl SceneNodeKind for VolumeLightNode {
    fn node_type(&self) -> SceneNodeType {
        SceneNodeType::VolumeLight
    }

    fn on_register(&mut self, ctx: &mut RegisterContext<'_>) {
        ctx.register(RenderPass::Transparent);
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) -> DriverResult<()> {
        let absolute = *ctx.absolute_transformation();
        let driver = ctx.driver();
        driver.set_transform(TransformState::World, &absolute);
        driver.set_material(&self.materials[0]);
        driver.draw_indexed_triangle_list(&self.vertices, &self.indices)
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
