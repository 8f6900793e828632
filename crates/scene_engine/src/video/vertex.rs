//! Vertex format submitted to the driver

use crate::foundation::math::{Vec2, Vec3};
use super::color::Color;

/// Standard vertex: position, normal, colour and one texture coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Object-space position
    pub position: Vec3,
    /// Object-space normal
    pub normal: Vec3,
    /// Vertex colour
    pub color: Color,
    /// Texture coordinate
    pub tex_coord: Vec2,
}

impl Vertex {
    /// Create a vertex
    pub fn new(position: Vec3, normal: Vec3, color: Color, tex_coord: Vec2) -> Self {
        Self {
            position,
            normal,
            color,
            tex_coord,
        }
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            normal: Vec3::new(0.0, 1.0, 0.0),
            color: Color::WHITE,
            tex_coord: Vec2::zeros(),
        }
    }
}
