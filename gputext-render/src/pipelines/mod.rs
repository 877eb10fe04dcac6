//! Render pipelines.

pub mod text;

pub use text::{PipelineError, TextPipeline};
