//! Mesh buffers built incrementally with a running index offset.

use glam::Vec3;

/// RGBA colour, linear.
pub type Color = [f32; 4];

static_assertions::assert_eq_size!(Vec3, [f32; 3]);
static_assertions::assert_eq_size!(Color, [u8; 16]);

/// Parallel vertex, colour and index buffers ready for upload.
///
/// Positions are `(x, height, y)` with Y up. Every triangle is wound
/// counter-clockwise when seen from above.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffers {
    /// Vertex positions.
    pub vertices: Vec<Vec3>,
    /// One colour per vertex.
    pub colors: Vec<Color>,
    /// Triangle list, three indices per triangle.
    pub indices: Vec<u32>,
    /// Four-corner blocks emitted, whether split into two triangles or drawn
    /// as one 4-vertex face.
    pub quad_count: usize,
    /// Three-corner blocks emitted as a single triangle.
    pub lone_triangle_count: usize,
}

impl MeshBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    fn offset(&self) -> u32 {
        self.vertices.len() as u32
    }

    fn push_vertices(&mut self, vertices: &[Vec3], color: Color) {
        self.vertices.extend_from_slice(vertices);
        self.colors.extend(std::iter::repeat_n(color, vertices.len()));
    }

    fn push_flat_triangle(&mut self, corners: [Vec3; 3], color: Color) {
        let base = self.offset();
        self.push_vertices(&corners, color);
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    /// Push one flat-coloured triangle with its own three vertices, for a
    /// block missing a corner.
    pub fn push_triangle(&mut self, corners: [Vec3; 3], color: Color) {
        self.push_flat_triangle(corners, color);
        self.lone_triangle_count += 1;
    }

    /// Push a block as two flat triangles with their own vertices, split
    /// along the `p0`-`p2` diagonal when `split_02`, else along `p1`-`p3`.
    ///
    /// Corners are in grid order, like [`MeshBuffers::push_quad`].
    pub fn push_split_quad(&mut self, corners: [Vec3; 4], split_02: bool, color: Color) {
        let [p0, p1, p2, p3] = corners;
        if split_02 {
            self.push_flat_triangle([p0, p2, p1], color);
            self.push_flat_triangle([p0, p3, p2], color);
        } else {
            self.push_flat_triangle([p0, p3, p1], color);
            self.push_flat_triangle([p1, p3, p2], color);
        }
        self.quad_count += 1;
    }

    /// Push a 4-vertex face: two triangles over shared vertices.
    ///
    /// Corners are given counter-clockwise as seen from below, i.e. in grid
    /// order `(x, y), (x+1, y), (x+1, y+1), (x, y+1)`.
    pub fn push_quad(&mut self, corners: [Vec3; 4], color: Color) {
        let base = self.offset();
        self.push_vertices(&corners, color);
        self.indices.extend_from_slice(&[
            base,
            base + 2,
            base + 1,
            base,
            base + 3,
            base + 2,
        ]);
        self.quad_count += 1;
    }

    /// Blocks emitted: quads plus lone triangles.
    pub fn face_count(&self) -> usize {
        self.quad_count + self.lone_triangle_count
    }

    /// Returns `true` if nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of triangles in the index buffer.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Raw vertex positions for GPU upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Raw vertex colours for GPU upload.
    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    /// Raw index buffer for GPU upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Lowest and highest vertex height.
    pub fn height_range(&self) -> Option<(f32, f32)> {
        let mut iter = self.vertices.iter().map(|v| v.y);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))))
    }
}
