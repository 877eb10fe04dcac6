//! High-level renderer that ties the GPU context, the text pipeline, and a
//! frame's geometry together into a single render call.

use std::hash::Hash;

use gputext_text::GlyphAtlas;
use thiserror::Error;
use wgpu::{
    Color, CommandEncoderDescriptor, LoadOp, Operations, RenderPassColorAttachment,
    RenderPassDescriptor, StoreOp, TextureView, TextureViewDescriptor,
};

use crate::context::GpuContext;
use crate::geometry::{GeometryBuffer, GeometryError};
use crate::pipelines::text::{PipelineError, TextPipeline};
use crate::shader::{load_shader, ShaderDesc, ShaderError};
use crate::vertex::TransformUniform;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("No surface configured (headless mode)")]
    NoSurface,
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Frame statistics returned after each render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Vertices uploaded this frame.
    pub vertex_count: usize,
    /// Indices uploaded this frame.
    pub index_count: usize,
    /// Number of draw calls.
    pub draw_calls: u32,
    /// True when no swapchain image was available and nothing was drawn.
    pub skipped: bool,
}

/// Draws one frame of batched glyph geometry.
///
/// # Usage
///
/// ```ignore
/// let mut renderer = Renderer::new(&gpu, &vert, &frag, (4000, 6000)).await?;
/// renderer.set_transforms(TransformUniform::screen(800.0, 600.0));
/// let stats = renderer.render_to_surface(&gpu, &geometry, engine.atlas())?;
/// ```
pub struct Renderer {
    text_pipeline: TextPipeline,
    clear_color: Color,
    transforms: TransformUniform,
}

impl Renderer {
    /// Load both shaders and build the text pipeline with room for
    /// `capacity = (vertices, indices)`.
    pub async fn new(
        gpu: &GpuContext,
        vertex: &ShaderDesc,
        fragment: &ShaderDesc,
        capacity: (usize, usize),
    ) -> Result<Self, RenderError> {
        let vertex = load_shader(&gpu.device, vertex).await?;
        let fragment = load_shader(&gpu.device, fragment).await?;
        let text_pipeline = TextPipeline::new(
            &gpu.device,
            gpu.surface_format,
            &vertex,
            &fragment,
            capacity.0,
            capacity.1,
        )
        .await?;

        Ok(Self {
            text_pipeline,
            clear_color: Color {
                r: 0.3,
                g: 0.4,
                b: 0.5,
                a: 1.0,
            },
            transforms: TransformUniform::screen(1.0, 1.0),
        })
    }

    /// Set the background clear color.
    pub fn set_clear_color(&mut self, r: f64, g: f64, b: f64, a: f64) {
        self.clear_color = Color { r, g, b, a };
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    /// Projection + model used for the next frames.
    pub fn set_transforms(&mut self, transforms: TransformUniform) {
        self.transforms = transforms;
    }

    pub fn transforms(&self) -> &TransformUniform {
        &self.transforms
    }

    pub fn pipeline(&self) -> &TextPipeline {
        &self.text_pipeline
    }

    /// Render to the window surface.
    ///
    /// A swapchain timeout is not an error: the frame is skipped and the
    /// returned stats say so.
    pub fn render_to_surface<K: Eq + Hash + Copy>(
        &mut self,
        gpu: &GpuContext,
        geometry: &GeometryBuffer,
        atlas: &GlyphAtlas<K>,
    ) -> Result<FrameStats, RenderError> {
        let surface = gpu.surface.as_ref().ok_or(RenderError::NoSurface)?;
        let output = match surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("swapchain image not ready, frame skipped");
                return Ok(FrameStats {
                    skipped: true,
                    ..FrameStats::default()
                });
            }
            Err(err) => return Err(err.into()),
        };
        let view = output.texture.create_view(&TextureViewDescriptor::default());

        let stats = self.render(gpu, geometry, atlas, &view)?;
        output.present();
        Ok(stats)
    }

    /// Render to an off-screen texture (headless mode).
    ///
    /// `target_view` must have the context's surface format.
    pub fn render_to_texture<K: Eq + Hash + Copy>(
        &mut self,
        gpu: &GpuContext,
        geometry: &GeometryBuffer,
        atlas: &GlyphAtlas<K>,
        target_view: &TextureView,
    ) -> Result<FrameStats, RenderError> {
        self.render(gpu, geometry, atlas, target_view)
    }

    fn render<K: Eq + Hash + Copy>(
        &mut self,
        gpu: &GpuContext,
        geometry: &GeometryBuffer,
        atlas: &GlyphAtlas<K>,
        target_view: &TextureView,
    ) -> Result<FrameStats, RenderError> {
        self.text_pipeline.sync_atlas(&gpu.device, &gpu.queue, atlas);
        self.text_pipeline.upload_transforms(&gpu.queue, &self.transforms);

        let mut encoder = gpu.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("gputext_frame_encoder"),
        });

        // Copy pass: staging belt → vertex/index buffers.
        self.text_pipeline
            .stage_geometry(&gpu.device, &mut encoder, geometry)?;
        self.text_pipeline.finish_staging();

        let draw_calls = {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("gputext_render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: target_view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(self.clear_color),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.text_pipeline.draw(&mut pass, geometry.batches())
        };

        gpu.queue.submit(std::iter::once(encoder.finish()));
        self.text_pipeline.recall_staging();

        Ok(FrameStats {
            vertex_count: geometry.vertex_count(),
            index_count: geometry.index_count(),
            draw_calls,
            skipped: false,
        })
    }
}

// ===================================================================
// Tests
// ===================================================================
