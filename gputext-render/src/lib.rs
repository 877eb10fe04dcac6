//! # gputext-render
//!
//! GPU text rendering backend for gputext, built on `wgpu`.
//!
//! ## Architecture
//!
//! ```text
//!  Text::draw_data() (gputext-text)
//!       │  DrawSequence chain, one per atlas page
//!       ▼
//!  GeometryBuffer.append_chain()   ◀─── rebased indices, uniform color
//!       │
//!       ▼
//!  Renderer.render_to_surface()    ◀─── staging copy + one draw per page
//! ```
//!
//! ## Crate modules
//!
//! - [`context`]: GPU device/queue/surface initialisation
//! - [`vertex`]: vertex and transform uniform types
//! - [`geometry`]: per-frame vertex/index batching
//! - [`shader`]: shader loading and bind group conventions
//! - [`pipelines`]: wgpu render pipelines (text)
//! - [`renderer`]: high-level frame orchestration

pub mod context;
pub mod geometry;
pub mod pipelines;
pub mod renderer;
pub mod shader;
pub mod vertex;

// Re-exports for convenience
pub use context::{GpuContext, GpuError};
pub use geometry::{Batch, GeometryBuffer, GeometryError, Upload, MAX_INDEX_COUNT, MAX_VERTEX_COUNT};
pub use pipelines::{PipelineError, TextPipeline};
pub use renderer::{FrameStats, RenderError, Renderer};
pub use shader::{load_shader, Shader, ShaderDesc, ShaderError, ShaderResources, ShaderStage};
pub use vertex::{model_matrix, screen_projection, TransformUniform, Vertex};
