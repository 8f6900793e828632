//! Math utilities and types
//!
//! Provides the vector and matrix aliases used by the scene graph, plus the
//! node-local [`Transform`] (translation, Euler rotation in degrees, scale).

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix4,
    Rotation3,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Local transform of a scene node
///
/// Rotation is stored as Euler angles in degrees, applied X then Y then Z.
/// The matrix form is `T * R * S`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation relative to the parent
    pub position: Vec3,

    /// Euler rotation in degrees
    pub rotation: Vec3,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform from all three components
    pub fn new(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self { position, rotation, scale }
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        let mut matrix = Mat4::rotation_degrees(self.rotation);
        matrix.m14 = self.position.x;
        matrix.m24 = self.position.y;
        matrix.m34 = self.position.z;

        if self.scale != Vec3::new(1.0, 1.0, 1.0) {
            matrix *= Mat4::new_nonuniform_scaling(&self.scale);
        }
        matrix
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Wrap an angle in degrees into `[0, 360)`
    pub fn wrap_degrees(degrees: f32) -> f32 {
        degrees.rem_euclid(360.0)
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Rotation matrix from Euler angles in degrees (X, then Y, then Z)
    fn rotation_degrees(rotation: Vec3) -> Mat4;

    /// Create a right-handed perspective projection matrix (depth in [-1, 1])
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Translation part of an affine matrix
    fn translation(&self) -> Vec3;

    /// Transform a point (w = 1)
    fn transform_point3(&self, point: Vec3) -> Vec3;

    /// Transform a direction (w = 0)
    fn rotate_vector3(&self, vector: Vec3) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn rotation_degrees(rotation: Vec3) -> Mat4 {
        Rotation3::from_euler_angles(
            utils::deg_to_rad(rotation.x),
            utils::deg_to_rad(rotation.y),
            utils::deg_to_rad(rotation.z),
        )
        .to_homogeneous()
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    fn translation(&self) -> Vec3 {
        Vec3::new(self.m14, self.m24, self.m34)
    }

    fn transform_point3(&self, point: Vec3) -> Vec3 {
        self.transform_point(&Point3::from(point)).coords
    }

    fn rotate_vector3(&self, vector: Vec3) -> Vec3 {
        self.transform_vector(&vector)
    }
}
