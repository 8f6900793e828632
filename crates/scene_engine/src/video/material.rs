//! Material records bound by nodes before submitting geometry
//!
//! A [`Material`] is plain data: the driver decides how to realise it. The
//! scene manager only cares whether a material blends, which decides the
//! render pass a node lands in when it registers automatically.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::color::Color;

/// Maximum number of texture layers per material
pub const MATERIAL_MAX_TEXTURES: usize = 2;

/// Opaque handle to a texture owned by the video driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextureHandle(pub u64);

/// Shading model of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MaterialType {
    /// Opaque, single texture
    #[default]
    Solid,
    /// Opaque, two textures blended by vertex alpha
    SolidTwoLayer,
    /// Opaque, second texture is a light map
    Lightmap,
    /// Additive blending of the texture colour
    TransparentAddColor,
    /// Blending by the texture alpha channel
    TransparentAlphaChannel,
    /// Alpha test against the texture alpha channel
    TransparentAlphaChannelRef,
    /// Blending by vertex alpha
    TransparentVertexAlpha,
    /// Transparent reflection with the second texture as environment map
    TransparentReflection,
}

impl MaterialType {
    /// Whether geometry using this material must be drawn with blending
    pub fn is_transparent(self) -> bool {
        matches!(
            self,
            Self::TransparentAddColor
                | Self::TransparentAlphaChannel
                | Self::TransparentAlphaChannelRef
                | Self::TransparentVertexAlpha
                | Self::TransparentReflection
        )
    }
}

bitflags! {
    /// Render-state switches carried by a material
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct MaterialFlags: u32 {
        /// Draw as wireframe
        const WIREFRAME = 1 << 0;
        /// Draw as point cloud
        const POINT_CLOUD = 1 << 1;
        /// Gouraud shading instead of flat
        const GOURAUD_SHADING = 1 << 2;
        /// Dynamic lighting is applied
        const LIGHTING = 1 << 3;
        /// Depth test enabled
        const ZBUFFER = 1 << 4;
        /// Depth writes enabled
        const ZWRITE_ENABLE = 1 << 5;
        /// Back faces are culled
        const BACK_FACE_CULLING = 1 << 6;
        /// Bilinear texture filtering
        const BILINEAR_FILTER = 1 << 7;
        /// Fog is applied
        const FOG_ENABLE = 1 << 8;
        /// Normals are renormalised after transformation
        const NORMALIZE_NORMALS = 1 << 9;
    }
}

impl Default for MaterialFlags {
    fn default() -> Self {
        Self::GOURAUD_SHADING
            | Self::LIGHTING
            | Self::ZBUFFER
            | Self::ZWRITE_ENABLE
            | Self::BACK_FACE_CULLING
            | Self::BILINEAR_FILTER
    }
}

/// Material record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Shading model
    pub material_type: MaterialType,
    /// Render-state switches
    pub flags: MaterialFlags,
    /// Ambient reflectance
    pub ambient_color: Color,
    /// Diffuse reflectance
    pub diffuse_color: Color,
    /// Specular reflectance
    pub specular_color: Color,
    /// Emitted light
    pub emissive_color: Color,
    /// Specular exponent; 0 disables highlights
    pub shininess: f32,
    /// Texture layers
    pub textures: [Option<TextureHandle>; MATERIAL_MAX_TEXTURES],
}

impl Default for Material {
    fn default() -> Self {
        Self {
            material_type: MaterialType::Solid,
            flags: MaterialFlags::default(),
            ambient_color: Color::WHITE,
            diffuse_color: Color::WHITE,
            specular_color: Color::WHITE,
            emissive_color: Color::BLACK,
            shininess: 0.0,
            textures: [None; MATERIAL_MAX_TEXTURES],
        }
    }
}

impl Material {
    /// Create a material of the given type with default state
    pub fn new(material_type: MaterialType) -> Self {
        Self {
            material_type,
            ..Default::default()
        }
    }

    /// Whether this material blends
    pub fn is_transparent(&self) -> bool {
        self.material_type.is_transparent()
    }

    /// Set or clear a flag
    pub fn set_flag(&mut self, flag: MaterialFlags, enabled: bool) {
        self.flags.set(flag, enabled);
    }

    /// Bind a texture to a layer; out of range layers are ignored
    pub fn set_texture(&mut self, layer: usize, texture: Option<TextureHandle>) {
        if let Some(slot) = self.textures.get_mut(layer) {
            *slot = texture;
        }
    }

    /// Key used to group opaque draws by bound texture
    pub fn sort_key(&self) -> u64 {
        self.textures[0].map_or(0, |t| t.0)
    }
}
