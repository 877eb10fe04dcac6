//! GPU vertex and uniform data types for the text renderer.
//!
//! All types derive `bytemuck::Pod` + `Zeroable` for zero-copy upload
//! to GPU buffers.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

// ───────────────────────────────────────────────────────────────────
// Vertex
// ───────────────────────────────────────────────────────────────────

/// One corner of a glyph quad.
///
/// 36 bytes per vertex: 4,000 vertices = 144 KB of GPU memory.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Pixel-space position; z is always 0 for text.
    pub position: [f32; 3],
    /// RGBA color, each channel in [0.0, 1.0].
    pub color: [f32; 4],
    /// Atlas texture coordinate.
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(xy: [f32; 2], color: [f32; 4], uv: [f32; 2]) -> Self {
        Self {
            position: [xy[0], xy[1], 0.0],
            color,
            uv,
        }
    }

    pub fn layout() -> VertexBufferLayout<'static> {
        static ATTRS: &[VertexAttribute] = &[
            // location(0) = position
            VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: VertexFormat::Float32x3,
            },
            // location(1) = color
            VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: VertexFormat::Float32x4,
            },
            // location(2) = uv
            VertexAttribute {
                offset: 28,
                shader_location: 2,
                format: VertexFormat::Float32x2,
            },
        ];
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// Transform uniform
// ───────────────────────────────────────────────────────────────────

/// Projection + model matrices sent to the vertex stage once per frame.
///
/// 128 bytes: fits in a single uniform buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TransformUniform {
    /// 4×4 orthographic projection matrix (column-major).
    pub projection: [[f32; 4]; 4],
    /// 4×4 model matrix (column-major).
    pub model: [[f32; 4]; 4],
}

impl TransformUniform {
    pub fn new(projection: Mat4, model: Mat4) -> Self {
        Self {
            projection: projection.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
        }
    }

    /// Pixel-space projection for a `width × height` viewport with an
    /// identity model.
    pub fn screen(width: f32, height: f32) -> Self {
        Self::new(screen_projection(width, height), Mat4::IDENTITY)
    }

    pub fn with_model(mut self, model: Mat4) -> Self {
        self.model = model.to_cols_array_2d();
        self
    }

    pub fn with_projection(mut self, projection: Mat4) -> Self {
        self.projection = projection.to_cols_array_2d();
        self
    }
}

/// Orthographic projection mapping (0,0) to the top-left corner and
/// (width, height) to the bottom-right. Y grows downward; z = 0 lands in
/// the middle of the depth range.
pub fn screen_projection(width: f32, height: f32) -> Mat4 {
    Mat4::orthographic_rh(0.0, width, height, 0.0, -1.0, 1.0)
}

/// Translate, then rotate about Z, then scale, applied to the vertex in
/// reverse order (scale first).
pub fn model_matrix(translation: [f32; 2], rotation_z: f32, scale: [f32; 2]) -> Mat4 {
    Mat4::from_translation(Vec3::new(translation[0], translation[1], 0.0))
        * Mat4::from_rotation_z(rotation_z)
        * Mat4::from_scale(Vec3::new(scale[0], scale[1], 1.0))
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn project(m: Mat4, x: f32, y: f32) -> Vec4 {
        m * Vec4::new(x, y, 0.0, 1.0)
    }

    #[test]
    fn test_vertex_size() {
        assert_eq!(std::mem::size_of::<Vertex>(), 36);
    }

    #[test]
    fn test_transform_uniform_size() {
        assert_eq!(std::mem::size_of::<TransformUniform>(), 128);
    }

    #[test]
    fn test_vertex_new_sets_zero_depth() {
        let v = Vertex::new([3.0, 4.0], [1.0, 1.0, 0.0, 1.0], [0.5, 0.25]);
        assert_eq!(v.position, [3.0, 4.0, 0.0]);
        assert_eq!(v.color, [1.0, 1.0, 0.0, 1.0]);
        assert_eq!(v.uv, [0.5, 0.25]);
    }

    #[test]
    fn test_vertex_layout_offsets() {
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 36);
        assert_eq!(layout.step_mode, VertexStepMode::Vertex);
        let offsets: Vec<_> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 28]);
        let locations: Vec<_> = layout.attributes.iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, vec![0, 1, 2]);
        assert_eq!(layout.attributes[0].format, VertexFormat::Float32x3);
        assert_eq!(layout.attributes[1].format, VertexFormat::Float32x4);
        assert_eq!(layout.attributes[2].format, VertexFormat::Float32x2);
    }

    #[test]
    fn test_screen_projection_corners() {
        let p = screen_projection(800.0, 600.0);

        let tl = project(p, 0.0, 0.0);
        assert!((tl.x + 1.0).abs() < 1e-5 && (tl.y - 1.0).abs() < 1e-5);

        let br = project(p, 800.0, 600.0);
        assert!((br.x - 1.0).abs() < 1e-5 && (br.y + 1.0).abs() < 1e-5);

        let center = project(p, 400.0, 300.0);
        assert!(center.x.abs() < 1e-5 && center.y.abs() < 1e-5);
    }

    #[test]
    fn test_screen_projection_depth_in_range() {
        let z = project(screen_projection(800.0, 600.0), 10.0, 10.0).z;
        assert!((0.0..=1.0).contains(&z), "z = {z}");
    }

    #[test]
    fn test_model_matrix_order() {
        let m = model_matrix([300.0, 150.0], std::f32::consts::FRAC_PI_2, [2.0, 2.0]);
        // (1, 0) → scale (2, 0) → rotate 90° (0, 2) → translate (300, 152).
        let p = project(m, 1.0, 0.0);
        assert!((p.x - 300.0).abs() < 1e-4, "x = {}", p.x);
        assert!((p.y - 152.0).abs() < 1e-4, "y = {}", p.y);
    }

    #[test]
    fn test_screen_uniform_has_identity_model() {
        let u = TransformUniform::screen(800.0, 600.0);
        assert_eq!(u.model, Mat4::IDENTITY.to_cols_array_2d());
        let moved = u.with_model(Mat4::from_translation(Vec3::X));
        assert_eq!(moved.model[3][0], 1.0);
        assert_eq!(moved.projection, u.projection);
    }

    #[test]
    fn test_uniform_bytes() {
        let u = TransformUniform::screen(640.0, 480.0);
        assert_eq!(bytemuck::bytes_of(&u).len(), 128);
    }
}
