//! Static meshes, mesh loading and procedural geometry
//!
//! Mesh file formats are out of scope for the scene engine: loaders are
//! plugged in through the [`MeshLoader`] trait and their results are kept in
//! a [`MeshCache`] keyed by path. [`GeometryCreator`] builds the few shapes
//! the scene manager needs without any loader.

use std::collections::HashMap;
use std::rc::Rc;

use crate::foundation::logging::{debug, warn};
use crate::foundation::math::{Vec2, Vec3};
use crate::video::{Color, Material, Vertex};

use super::aabb::Aabb;
use super::error::SceneResult;

/// Most vertices a buffer with `u16` indices can address
pub const MAX_BUFFER_VERTICES: usize = 1 << 16;

/// Vertices, indices and one material
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBuffer {
    /// Vertex data
    pub vertices: Vec<Vertex>,
    /// Triangle list indices
    pub indices: Vec<u16>,
    /// Material used for the whole buffer
    pub material: Material,
    /// Bounds of the vertex positions
    pub bounding_box: Aabb,
}

impl MeshBuffer {
    /// Create a buffer and compute its bounds
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u16>, material: Material) -> Self {
        let mut buffer = Self {
            vertices,
            indices,
            material,
            bounding_box: Aabb::default(),
        };
        buffer.recalculate_bounding_box();
        buffer
    }

    /// Recompute the bounds from the vertex positions
    pub fn recalculate_bounding_box(&mut self) {
        self.bounding_box =
            Aabb::from_points(self.vertices.iter().map(|v| v.position)).unwrap_or_default();
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Corner positions of each triangle, skipping out of range indices
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            let a = self.vertices.get(usize::from(tri[0]))?.position;
            let b = self.vertices.get(usize::from(tri[1]))?.position;
            let c = self.vertices.get(usize::from(tri[2]))?.position;
            Some([a, b, c])
        })
    }
}

/// Immutable mesh shared between nodes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StaticMesh {
    buffers: Vec<MeshBuffer>,
    bounding_box: Aabb,
}

impl StaticMesh {
    /// Create a mesh from buffers
    pub fn new(buffers: Vec<MeshBuffer>) -> Self {
        let mut mesh = Self {
            buffers,
            bounding_box: Aabb::default(),
        };
        mesh.recalculate_bounding_box();
        mesh
    }

    /// Mesh buffers in draw order
    pub fn buffers(&self) -> &[MeshBuffer] {
        &self.buffers
    }

    /// Number of mesh buffers
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Bounds of all buffers
    pub fn bounding_box(&self) -> Aabb {
        self.bounding_box
    }

    /// Total number of triangles
    pub fn triangle_count(&self) -> usize {
        self.buffers.iter().map(MeshBuffer::triangle_count).sum()
    }

    fn recalculate_bounding_box(&mut self) {
        let mut iter = self.buffers.iter();
        self.bounding_box = match iter.next() {
            Some(first) => {
                let mut aabb = first.bounding_box;
                for buffer in iter {
                    aabb.add_box(&buffer.bounding_box);
                }
                aabb
            }
            None => Aabb::default(),
        };
    }
}

/// Source of meshes for file paths
pub trait MeshLoader {
    /// Whether this loader handles files with the extension of `path`
    fn is_supported_extension(&self, path: &str) -> bool;

    /// Load a mesh
    fn load(&self, path: &str) -> SceneResult<StaticMesh>;
}

/// Meshes loaded so far, keyed by path
#[derive(Debug, Default)]
pub struct MeshCache {
    meshes: HashMap<String, Rc<StaticMesh>>,
}

impl MeshCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a mesh under a name, replacing any previous one
    pub fn add(&mut self, name: impl Into<String>, mesh: Rc<StaticMesh>) {
        self.meshes.insert(name.into(), mesh);
    }

    /// Cached mesh for a name
    pub fn get(&self, name: &str) -> Option<Rc<StaticMesh>> {
        self.meshes.get(name).cloned()
    }

    /// Whether a mesh is cached under a name
    pub fn contains(&self, name: &str) -> bool {
        self.meshes.contains_key(name)
    }

    /// Drop a cached mesh; nodes still holding it keep it alive
    pub fn remove(&mut self, name: &str) -> Option<Rc<StaticMesh>> {
        self.meshes.remove(name)
    }

    /// Number of cached meshes
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Drop all cached meshes
    pub fn clear(&mut self) {
        self.meshes.clear();
    }

    /// Look up `path`, falling back to the first loader that accepts it
    ///
    /// Failures are logged and reported as `None`.
    pub fn get_or_load(&mut self, path: &str, loaders: &[Box<dyn MeshLoader>]) -> Option<Rc<StaticMesh>> {
        if let Some(mesh) = self.get(path) {
            return Some(mesh);
        }

        let Some(loader) = loaders.iter().rev().find(|l| l.is_supported_extension(path)) else {
            warn!("No mesh loader accepts '{path}'");
            return None;
        };

        match loader.load(path) {
            Ok(mesh) => {
                debug!("Loaded mesh '{path}' with {} buffers", mesh.buffer_count());
                let mesh = Rc::new(mesh);
                self.add(path, Rc::clone(&mesh));
                Some(mesh)
            }
            Err(e) => {
                warn!("Failed to load mesh '{path}': {e}");
                None
            }
        }
    }
}

/// Procedural geometry
#[derive(Debug)]
pub struct GeometryCreator;

impl GeometryCreator {
    /// Axis-aligned box centred on the origin with the given edge lengths
    ///
    /// Each face has its own four vertices so normals stay flat.
    pub fn cube(size: Vec3) -> StaticMesh {
        let quads = Aabb::from_center_extents(Vec3::zeros(), size * 0.5).face_quads();
        let tex_coords = [
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (base, quad) in (0u16..).step_by(4).zip(quads) {
            let normal = (quad[1] - quad[0]).cross(&(quad[2] - quad[0])).normalize();
            for (corner, tex) in quad.into_iter().zip(tex_coords) {
                vertices.push(Vertex::new(corner, normal, Color::WHITE, tex));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        StaticMesh::new(vec![MeshBuffer::new(vertices, indices, Material::default())])
    }

    /// Flat grid in the XZ plane centred on the origin, facing +Y
    ///
    /// Tile counts are reduced until the grid has at most
    /// [`MAX_BUFFER_VERTICES`] vertices, the most `u16` indices can address.
    pub fn plane(tile_size: Vec2, tile_count: (u16, u16)) -> StaticMesh {
        let (tiles_x, tiles_z) = fit_counts("Plane", tile_count, 1, |x, z| {
            (usize::from(x) + 1) * (usize::from(z) + 1)
        });
        let width = tile_size.x * f32::from(tiles_x);
        let depth = tile_size.y * f32::from(tiles_z);
        let normal = Vec3::new(0.0, 1.0, 0.0);

        let mut vertices = Vec::new();
        for z in 0..=tiles_z {
            for x in 0..=tiles_x {
                let position = Vec3::new(
                    f32::from(x) * tile_size.x - width * 0.5,
                    0.0,
                    f32::from(z) * tile_size.y - depth * 0.5,
                );
                let tex = Vec2::new(f32::from(x), f32::from(z));
                vertices.push(Vertex::new(position, normal, Color::WHITE, tex));
            }
        }

        let row = u32::from(tiles_x) + 1;
        let mut indices = Vec::new();
        for z in 0..u32::from(tiles_z) {
            for x in 0..u32::from(tiles_x) {
                let i = z * row + x;
                indices.extend_from_slice(&[i, i + row, i + row + 1, i + row + 1, i + 1, i]);
            }
        }
        let indices = indices.into_iter().filter_map(|i| u16::try_from(i).ok()).collect();

        StaticMesh::new(vec![MeshBuffer::new(vertices, indices, Material::default())])
    }

    /// UV sphere centred on the origin
    ///
    /// `poly_count_x` segments run around the Y axis and `poly_count_y`
    /// from pole to pole; both are at least 2 and are reduced until the
    /// sphere fits one buffer. Each ring repeats its first vertex so the
    /// texture seam closes.
    pub fn sphere(radius: f32, poly_count_x: u16, poly_count_y: u16) -> StaticMesh {
        let (segments, rings) = fit_counts("Sphere", (poly_count_x, poly_count_y), 2, |x, y| {
            (usize::from(y) - 1) * (usize::from(x) + 1) + 2
        });
        let angle_x = std::f32::consts::TAU / f32::from(segments);
        let angle_y = std::f32::consts::PI / f32::from(rings);

        let mut vertices = Vec::new();
        for ring in 1..rings {
            let ay = angle_y * f32::from(ring);
            for segment in 0..=segments {
                let axz = angle_x * f32::from(segment % segments);
                let normal = Vec3::new(axz.cos() * ay.sin(), ay.cos(), axz.sin() * ay.sin());
                let tex = Vec2::new(f32::from(segment) / f32::from(segments), ay / std::f32::consts::PI);
                vertices.push(Vertex::new(normal * radius, normal, Color::WHITE, tex));
            }
        }
        let top = vertices.len();
        let up = Vec3::new(0.0, 1.0, 0.0);
        vertices.push(Vertex::new(up * radius, up, Color::WHITE, Vec2::new(0.5, 0.0)));
        vertices.push(Vertex::new(-up * radius, -up, Color::WHITE, Vec2::new(0.5, 1.0)));
        let bottom = top + 1;

        let pitch = usize::from(segments) + 1;
        let last_ring = (usize::from(rings) - 2) * pitch;
        let mut indices: Vec<usize> = Vec::new();
        for segment in 0..usize::from(segments) {
            indices.extend_from_slice(&[top, segment + 1, segment]);
            for ring in 0..usize::from(rings) - 2 {
                let a = ring * pitch + segment;
                let (b, c) = (a + 1, a + pitch);
                indices.extend_from_slice(&[a, b, c, b, c + 1, c]);
            }
            let a = last_ring + segment;
            indices.extend_from_slice(&[a, a + 1, bottom]);
        }
        let indices = indices.into_iter().filter_map(|i| u16::try_from(i).ok()).collect();

        let mut buffer = MeshBuffer::new(vertices, indices, Material::default());
        buffer.bounding_box = Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(radius.abs()));
        StaticMesh::new(vec![buffer])
    }
}

/// Shrink the larger of two counts until `vertex_count` fits one buffer
fn fit_counts(
    shape: &str,
    requested: (u16, u16),
    min: u16,
    vertex_count: impl Fn(u16, u16) -> usize,
) -> (u16, u16) {
    let (mut x, mut y) = (requested.0.max(min), requested.1.max(min));
    if vertex_count(x, y) <= MAX_BUFFER_VERTICES {
        return (x, y);
    }

    while vertex_count(x, y) > MAX_BUFFER_VERTICES {
        if x >= y {
            x -= 1;
        } else {
            y -= 1;
        }
    }
    warn!(
        "{shape} of {}x{} exceeds {MAX_BUFFER_VERTICES} vertices, reduced to {x}x{y}",
        requested.0, requested.1
    );
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::error::SceneError;
    use approx::assert_relative_eq;

    struct FixedLoader;

    impl MeshLoader for FixedLoader {
        fn is_supported_extension(&self, path: &str) -> bool {
            path.ends_with(".box")
        }

        fn load(&self, path: &str) -> SceneResult<StaticMesh> {
            if path.starts_with("missing") {
                Err(SceneError::MeshUnavailable(path.to_string()))
            } else {
                Ok(GeometryCreator::cube(Vec3::new(1.0, 1.0, 1.0)))
            }
        }
    }

    #[test]
    fn test_cube_geometry() {
        let mesh = GeometryCreator::cube(Vec3::new(10.0, 2.0, 4.0));
        assert_eq!(mesh.buffer_count(), 1);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.bounding_box(), Aabb::new(Vec3::new(-5.0, -1.0, -2.0), Vec3::new(5.0, 1.0, 2.0)));
    }

    #[test]
    fn test_cube_faces_wind_outwards() {
        let mesh = GeometryCreator::cube(Vec3::new(2.0, 2.0, 2.0));
        for [a, b, c] in mesh.buffers()[0].triangles() {
            let normal = (b - a).cross(&(c - a));
            let centre = (a + b + c) / 3.0;
            assert!(normal.dot(&centre) > 0.0);
        }
    }

    #[test]
    fn test_plane_geometry() {
        let mesh = GeometryCreator::plane(Vec2::new(10.0, 10.0), (4, 2));
        assert_eq!(mesh.triangle_count(), 16);
        let bounds = mesh.bounding_box();
        assert_eq!(bounds.min, Vec3::new(-20.0, 0.0, -10.0));
        assert_eq!(bounds.max, Vec3::new(20.0, 0.0, 10.0));

        // Front faces point up
        let [a, b, c] = mesh.buffers()[0].triangles().next().unwrap();
        assert!((b - a).cross(&(c - a)).y > 0.0);
    }

    #[test]
    fn test_plane_tile_count_capped_to_index_range() {
        let full = GeometryCreator::plane(Vec2::new(1.0, 1.0), (255, 255));
        assert_eq!(full.buffers()[0].vertices.len(), MAX_BUFFER_VERTICES);
        assert_eq!(full.triangle_count(), 2 * 255 * 255);

        let mesh = GeometryCreator::plane(Vec2::new(1.0, 1.0), (300, 300));
        let buffer = &mesh.buffers()[0];
        assert_eq!(buffer.vertices.len(), MAX_BUFFER_VERTICES);
        assert_eq!(buffer.triangle_count(), 2 * 255 * 255);
        assert_eq!(buffer.indices.iter().copied().max(), Some(u16::MAX));

        // Long thin grids keep their short side
        let strip = GeometryCreator::plane(Vec2::new(1.0, 1.0), (60000, 1));
        assert_eq!(strip.buffers()[0].vertices.len(), 2 * 32768);
        assert_eq!(strip.triangle_count(), 2 * 32767);
    }

    #[test]
    fn test_sphere_geometry() {
        let mesh = GeometryCreator::sphere(5.0, 16, 8);
        let buffer = &mesh.buffers()[0];
        assert_eq!(buffer.vertices.len(), 7 * 17 + 2);
        assert_eq!(mesh.triangle_count(), 2 * 16 * 7);
        assert_eq!(mesh.bounding_box(), Aabb::new(Vec3::repeat(-5.0), Vec3::repeat(5.0)));

        for vertex in &buffer.vertices {
            assert_relative_eq!(vertex.position.norm(), 5.0, epsilon = 1e-4);
        }
        for [a, b, c] in buffer.triangles() {
            let normal = (b - a).cross(&(c - a));
            assert!(normal.dot(&((a + b + c) / 3.0)) > 0.0);
        }
    }

    #[test]
    fn test_sphere_poly_counts_clamped() {
        let tiny = GeometryCreator::sphere(1.0, 0, 1);
        assert_eq!(tiny.triangle_count(), 2 * 2);

        let huge = GeometryCreator::sphere(1.0, 1000, 1000);
        let buffer = &huge.buffers()[0];
        assert!(buffer.vertices.len() <= MAX_BUFFER_VERTICES);
        let max_index = buffer.indices.iter().copied().max().map_or(0, usize::from);
        assert_eq!(max_index, buffer.vertices.len() - 1);
    }

    #[test]
    fn test_cache_loads_once_and_reports_failures() {
        let loaders: Vec<Box<dyn MeshLoader>> = vec![Box::new(FixedLoader)];
        let mut cache = MeshCache::new();

        let first = cache.get_or_load("crate.box", &loaders).unwrap();
        let second = cache.get_or_load("crate.box", &loaders).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        assert!(cache.get_or_load("missing.box", &loaders).is_none());
        assert!(cache.get_or_load("crate.obj", &loaders).is_none());
        assert_eq!(cache.len(), 1);
    }
}
