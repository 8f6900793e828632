//! Colour types shared by materials, lights and the driver

use serde::{Deserialize, Serialize};

/// 8-bit ARGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Alpha channel
    pub a: u8,
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Color {
    /// Opaque white
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    /// Opaque black
    pub const BLACK: Self = Self::new(255, 0, 0, 0);

    /// Create a colour from alpha, red, green and blue
    pub const fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { a, r, g, b }
    }

    /// Convert to a floating point colour
    pub fn to_colorf(self) -> Colorf {
        Colorf::new(
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        )
    }

    /// Blend towards `other`: `d = 1` gives `self`, `d = 0` gives `other`
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn interpolated(self, other: Self, d: f32) -> Self {
        let d = d.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (f32::from(a) * d + f32::from(b) * (1.0 - d)).round() as u8;
        Self::new(mix(self.a, other.a), mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Floating point RGBA colour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Colorf {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
    /// Alpha channel
    pub a: f32,
}

impl Colorf {
    /// Create a colour from red, green, blue and alpha
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Convert to an 8-bit colour, clamping each channel
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_color(self) -> Color {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Color::new(channel(self.a), channel(self.r), channel(self.g), channel(self.b))
    }
}

impl Default for Colorf {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_conversion() {
        let color = Color::new(150, 0, 255, 128);
        assert_eq!(color.to_colorf().to_color(), color);
    }

    #[test]
    fn test_interpolated() {
        let white = Color::WHITE;
        let clear = Color::new(0, 0, 0, 0);
        assert_eq!(white.interpolated(clear, 1.0), white);
        assert_eq!(white.interpolated(clear, 0.0), clear);
        assert_eq!(white.interpolated(clear, 0.5), Color::new(128, 128, 128, 128));
    }

    #[test]
    fn test_colorf_clamps() {
        let color = Colorf::new(2.0, -1.0, 0.5, 1.0).to_color();
        assert_eq!(color, Color::new(255, 255, 0, 128));
    }
}
