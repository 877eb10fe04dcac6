//! GPU context: owns `wgpu::Device`, `Queue`, and optional `Surface`.
//!
//! Two construction paths:
//!
//! 1. **Headless** (`GpuContext::new_headless`): no window, no surface.
//!    Used for tests and off-screen rendering.
//!
//! 2. **Windowed** (`GpuContext::new_with_surface`): the surface is created
//!    from a window handle and configured for VSync presentation.
//!
//! Every resource is released when the context is dropped.

use thiserror::Error;
use wgpu::{
    Adapter, Device, DeviceDescriptor, Instance, InstanceDescriptor, Queue,
    RequestAdapterOptions, Surface, SurfaceConfiguration, SurfaceTarget, TextureFormat,
    TextureUsages,
};

#[derive(Error, Debug)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("Surface reports no supported formats")]
    NoSurfaceFormat,
}

/// Core GPU state shared by every rendering subsystem.
pub struct GpuContext {
    pub device: Device,
    pub queue: Queue,
    pub adapter: Adapter,
    /// Present only when rendering to a window.
    pub surface: Option<Surface<'static>>,
    pub surface_config: Option<SurfaceConfiguration>,
    pub surface_format: TextureFormat,
}

impl GpuContext {
    /// Create a headless context (no window, no surface).
    pub async fn new_headless() -> Result<Self, GpuError> {
        let instance = Instance::new(&InstanceDescriptor::default());
        let adapter = request_adapter(&instance, None).await?;
        let (device, queue) = request_device(&adapter, "gputext-headless").await?;

        Ok(Self {
            device,
            queue,
            adapter,
            surface: None,
            surface_config: None,
            // Rgba8UnormSrgb is renderable and copyable everywhere.
            surface_format: TextureFormat::Rgba8UnormSrgb,
        })
    }

    /// Create a context whose surface presents to `window`.
    ///
    /// `window` must stay alive as long as the context; pass an `Arc` of
    /// the window so the surface can hold it.
    pub async fn new_with_surface<W>(window: W, width: u32, height: u32) -> Result<Self, GpuError>
    where
        W: wgpu::WasmNotSendSync + Into<SurfaceTarget<'static>>,
    {
        let instance = Instance::new(&InstanceDescriptor::default());
        let surface = instance.create_surface(window)?;
        let adapter = request_adapter(&instance, Some(&surface)).await?;
        let (device, queue) = request_device(&adapter, "gputext-windowed").await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or(GpuError::NoSurfaceFormat)?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo, // VSync
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        log::debug!("surface configured: {format:?} {}x{}", config.width, config.height);

        Ok(Self {
            device,
            queue,
            adapter,
            surface: Some(surface),
            surface_config: Some(config),
            surface_format: format,
        })
    }

    /// Resize the surface. No-op if headless or if either side is zero
    /// (minimized window).
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Some(config) = &mut self.surface_config {
            config.width = width;
            config.height = height;
            if let Some(surface) = &self.surface {
                surface.configure(&self.device, config);
            }
        }
    }

    /// Re-apply the current configuration, e.g. after a lost surface.
    pub fn reconfigure(&self) {
        if let (Some(surface), Some(config)) = (&self.surface, &self.surface_config) {
            surface.configure(&self.device, config);
        }
    }

    /// Current surface dimensions, or `(0, 0)` if headless.
    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_config
            .as_ref()
            .map(|c| (c.width, c.height))
            .unwrap_or((0, 0))
    }

    pub fn adapter_name(&self) -> String {
        self.adapter.get_info().name
    }
}

async fn request_adapter(instance: &Instance, surface: Option<&Surface<'_>>) -> Result<Adapter, GpuError> {
    instance
        .request_adapter(&RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .ok_or(GpuError::NoAdapter)
}

async fn request_device(adapter: &Adapter, label: &str) -> Result<(Device, Queue), GpuError> {
    let (device, queue) = adapter
        .request_device(
            &DeviceDescriptor {
                label: Some(label),
                ..Default::default()
            },
            None,
        )
        .await?;
    Ok((device, queue))
}

// ===================================================================
// Tests
// ===================================================================
