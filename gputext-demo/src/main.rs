//! gputext demo: draws a rotated block of text with wgpu.
//!
//! Uses `winit` 0.30 for windowing and input, `gputext-text` for shaping
//! and the glyph atlas, and `gputext-render` for batching and drawing.
//! Escape or closing the window quits.

mod config;
mod state;

use log::info;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowAttributes, WindowId},
};

use gputext_render::{GeometryError, GpuContext, RenderError};
use config::DemoConfig;
use state::{DemoError, DemoState};

/// Winit 0.30 application handler.
struct App {
    config: DemoConfig,
    window: Option<Arc<Window>>,
    state: Option<DemoState>,
    /// First startup failure; returned from `main` once the loop exits.
    error: Option<DemoError>,
    frame_count: u64,
}

impl App {
    fn new(config: DemoConfig) -> Self {
        Self {
            config,
            window: None,
            state: None,
            error: None,
            frame_count: 0,
        }
    }

    fn init(&self, event_loop: &ActiveEventLoop) -> Result<(Arc<Window>, DemoState), DemoError> {
        let attrs = WindowAttributes::default()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let size = window.inner_size();
        let gpu = pollster::block_on(GpuContext::new_with_surface(
            window.clone(),
            size.width.max(1),
            size.height.max(1),
        ))?;
        let adapter = gpu.adapter_name();
        let state = DemoState::new(gpu, self.config.clone())?;

        info!("gputext demo initialized: {}×{}, GPU: {adapter}", size.width, size.height);
        Ok((window, state))
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.error.is_some() {
            return; // Already initialized.
        }

        match self.init(event_loop) {
            Ok((window, state)) => {
                window.request_redraw();
                self.window = Some(window);
                self.state = Some(state);
            }
            Err(err) => {
                log::error!("Startup failed: {err}");
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let (Some(window), Some(state)) = (self.window.as_ref(), self.state.as_mut()) else {
            return;
        };

        match event {
            // ── Close / Escape ──────────────────────────────────
            WindowEvent::CloseRequested => {
                info!("Window closed after {} frames", self.frame_count);
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                if event.logical_key == Key::Named(NamedKey::Escape) {
                    info!("Escape pressed after {} frames", self.frame_count);
                    event_loop.exit();
                }
            }

            // ── Resize ──────────────────────────────────────────
            WindowEvent::Resized(new_size) => {
                state.resize(new_size.width, new_size.height);
                window.request_redraw();
            }

            // ── Redraw ──────────────────────────────────────────
            WindowEvent::RedrawRequested => {
                match state.frame() {
                    Ok(stats) => {
                        self.frame_count += 1;
                        if self.frame_count % 300 == 0 {
                            info!(
                                "Frame {}: {} vertices, {} indices, {} draw call(s)",
                                self.frame_count, stats.vertex_count, stats.index_count, stats.draw_calls
                            );
                        }
                    }
                    Err(RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                        // Reconfigure surface on lost/outdated.
                        state.reconfigure();
                    }
                    Err(RenderError::Geometry(err @ GeometryError::CapacityExceeded { .. })) => {
                        log::warn!("Frame skipped: {err}");
                    }
                    Err(e) => {
                        log::error!("Render error: {e}");
                    }
                }
                window.request_redraw();
            }

            _ => {}
        }
    }
}

fn main() -> Result<(), DemoError> {
    env_logger::init();

    info!("Starting gputext demo...");
    let config = DemoConfig::load()?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
