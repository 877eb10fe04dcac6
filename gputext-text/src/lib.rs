//! # gputext-text
//!
//! Text engine for gputext. Loads fonts, shapes and rasterizes text via
//! `cosmic-text`, packs glyphs into a paged texture atlas and hands out
//! per-page draw sequences for GPU batching.
//!
//! ## Architecture
//!
//! ```text
//! TextEngine (cosmic-text FontSystem + SwashCache + GlyphAtlas)
//!     │
//!     ▼
//! Text::draw_data() ──► DrawSequence ─next─► DrawSequence ─► …
//!     │                      (one per atlas page)
//!     ▼
//! GlyphAtlas pages ──► GPU upload (textures)
//! ```
//!
//! - **`fonts`**: font handles loaded from files or named families.
//! - **`engine`**: shaping, rasterization, sequence building.
//! - **`text`**: lazily shaped text objects.
//! - **`sequence`**: strided vertex/index runs and their chains.
//! - **`atlas`**: CPU-side glyph atlas with shelf packing.

pub mod atlas;
pub mod engine;
pub mod fonts;
pub mod sequence;
pub mod text;

// Re-exports for ergonomic use.
pub use atlas::{AtlasPage, AtlasRegion, BitmapFormat, GlyphAtlas};
pub use engine::TextEngine;
pub use fonts::{Font, FontError, FontFamily};
pub use sequence::{DrawSequence, SequenceError, Sequences, Stride};
pub use text::Text;
