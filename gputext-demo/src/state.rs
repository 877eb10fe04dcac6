//! Demo state: owns the text → geometry → GPU pipeline.
//!
//! `DemoState` is built once the window exists and holds every resource the
//! frame loop touches. Construction either yields a complete state or the
//! first error; partially created GPU objects are released on drop.

use gputext_render::{
    model_matrix, screen_projection, FrameStats, GeometryBuffer, GeometryError, GpuContext,
    GpuError, RenderError, Renderer, ShaderDesc, TransformUniform,
};
use gputext_text::{Font, FontError, Text, TextEngine};
use thiserror::Error;

use crate::config::{ConfigError, DemoConfig};

#[derive(Error, Debug)]
pub enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Font(#[from] FontError),
    #[error("Failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

/// Owns the entire demo pipeline.
pub struct DemoState {
    gpu: GpuContext,
    renderer: Renderer,
    engine: TextEngine,
    text: Text,
    /// Refilled every frame, cleared after each render.
    geometry: GeometryBuffer,
    config: DemoConfig,
}

impl DemoState {
    /// Build the demo after the GPU context has been created.
    pub fn new(gpu: GpuContext, config: DemoConfig) -> Result<Self, DemoError> {
        let vertex = ShaderDesc::new(&config.vertex_shader).with_uniform_buffers(1);
        let fragment = ShaderDesc::new(&config.fragment_shader).with_samplers(1);
        let mut renderer = pollster::block_on(Renderer::new(
            &gpu,
            &vertex,
            &fragment,
            (config.max_vertices, config.max_indices),
        ))?;
        let [r, g, b, a] = config.clear_color;
        renderer.set_clear_color(r, g, b, a);

        let mut engine = TextEngine::new();
        let font = match &config.font_path {
            Some(path) => engine.load_font(path, config.point_size)?,
            None => Font::system("monospace", config.point_size)?,
        };
        let mut text = engine.create_text_wrapped(&font, &config.text, config.wrap_width);
        text.set_color(config.text_color);

        let geometry = GeometryBuffer::with_capacity(config.max_vertices, config.max_indices);

        let mut state = Self {
            gpu,
            renderer,
            engine,
            text,
            geometry,
            config,
        };
        let (width, height) = match state.gpu.surface_size() {
            (0, 0) => (state.config.width, state.config.height),
            size => size,
        };
        state.update_transforms(width, height);
        Ok(state)
    }

    /// Handle a window resize: reconfigure the surface and re-project.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.gpu.resize(width, height);
        self.update_transforms(width, height);
    }

    /// Re-apply the surface configuration after a lost/outdated surface.
    pub fn reconfigure(&mut self) {
        self.gpu.reconfigure();
    }

    /// Batch the text, render it, and clear the geometry buffer.
    ///
    /// The buffer is cleared on every path so each frame starts empty.
    pub fn frame(&mut self) -> Result<FrameStats, RenderError> {
        let result = self.batch().map_err(RenderError::from).and_then(|()| {
            self.renderer
                .render_to_surface(&self.gpu, &self.geometry, self.engine.atlas())
        });
        self.geometry.clear();
        result
    }

    fn batch(&mut self) -> Result<(), GeometryError> {
        let color = self.text.color();
        if let Some(head) = self.text.draw_data(&mut self.engine) {
            self.geometry.append_chain(head, color)?;
        }
        Ok(())
    }

    fn update_transforms(&mut self, width: u32, height: u32) {
        let model = &self.config.model;
        let transforms = TransformUniform::new(
            screen_projection(width as f32, height as f32),
            model_matrix(model.translation, model.rotation_degrees.to_radians(), model.scale),
        );
        self.renderer.set_transforms(transforms);
        log::debug!("projection updated for {width}x{height}");
    }
}

// ===================================================================
// Tests
// ===================================================================
