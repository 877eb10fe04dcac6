//! Text engine: shapes text and rasterizes glyphs using `cosmic-text`.
//!
//! The engine manages a `FontSystem` (font discovery + shaping), a
//! `SwashCache` (glyph rasterization) and the [`GlyphAtlas`] the glyphs
//! land in. Shaped text comes out as a chain of [`DrawSequence`]s, one per
//! atlas page, ready to be batched into a vertex/index buffer.

use std::collections::BTreeMap;
use std::path::Path;

use cosmic_text::{Buffer, FontSystem, Shaping, SwashCache, SwashContent};

use crate::atlas::{BitmapFormat, GlyphAtlas};
use crate::fonts::{Font, FontError};
use crate::sequence::{DrawSequence, QuadRun};
use crate::text::Text;

/// Result of shaping one text object.
#[derive(Clone, Debug)]
pub(crate) struct Shaped {
    /// Head of the per-page chain; `None` when nothing is visible.
    pub head: Option<DrawSequence>,
    /// Laid-out width in pixels.
    pub width: f32,
    /// Laid-out height in pixels.
    pub height: f32,
    /// Atlas epoch the regions were allocated under.
    pub epoch: u64,
}

/// Core text engine wrapping cosmic-text.
pub struct TextEngine {
    font_system: FontSystem,
    swash_cache: SwashCache,
    atlas: GlyphAtlas,
}

impl TextEngine {
    /// Create an engine with system font discovery and a default atlas.
    pub fn new() -> Self {
        Self::with_atlas(FontSystem::new(), GlyphAtlas::default())
    }

    /// Create an engine from an existing font system and atlas.
    pub fn with_atlas(font_system: FontSystem, atlas: GlyphAtlas) -> Self {
        Self {
            font_system,
            swash_cache: SwashCache::new(),
            atlas,
        }
    }

    pub fn font_system(&self) -> &FontSystem {
        &self.font_system
    }

    pub fn font_system_mut(&mut self) -> &mut FontSystem {
        &mut self.font_system
    }

    pub fn atlas(&self) -> &GlyphAtlas {
        &self.atlas
    }

    pub fn atlas_mut(&mut self) -> &mut GlyphAtlas {
        &mut self.atlas
    }

    /// Load a font file at `point_size`.
    pub fn load_font(&mut self, path: impl AsRef<Path>, point_size: f32) -> Result<Font, FontError> {
        Font::from_file(&mut self.font_system, path, point_size)
    }

    /// Create a text object that wraps at `wrap_width` pixels.
    ///
    /// A `wrap_width` of 0 wraps only at explicit newlines.
    pub fn create_text_wrapped(&self, font: &Font, string: &str, wrap_width: u32) -> Text {
        Text::new(font.clone(), string, wrap_width)
    }

    /// Shape `string`, rasterize its glyphs into the atlas and build the
    /// per-page sequence chain.
    pub(crate) fn shape(&mut self, font: &Font, string: &str, wrap_width: u32) -> Shaped {
        let mut buffer = Buffer::new(&mut self.font_system, font.metrics());
        let max_width = (wrap_width > 0).then_some(wrap_width as f32);
        buffer.set_size(&mut self.font_system, max_width, None);
        buffer.set_text(&mut self.font_system, string, font.attrs(), Shaping::Advanced);
        buffer.shape_until_scroll(&mut self.font_system, false);

        let mut runs: BTreeMap<usize, QuadRun> = BTreeMap::new();
        let mut width: f32 = 0.0;
        let mut height: f32 = 0.0;
        let mut skipped = 0usize;

        for run in buffer.layout_runs() {
            width = width.max(run.line_w);
            height = height.max(run.line_top + font.line_height());

            for glyph in run.glyphs.iter() {
                let physical = glyph.physical((0.0, 0.0), 1.0);

                let Some(image) = self
                    .swash_cache
                    .get_image(&mut self.font_system, physical.cache_key)
                else {
                    continue; // whitespace or missing glyph
                };

                let (w, h) = (image.placement.width, image.placement.height);
                if w == 0 || h == 0 {
                    continue;
                }

                let format = match image.content {
                    SwashContent::Mask => BitmapFormat::Alpha,
                    SwashContent::Color | SwashContent::SubpixelMask => BitmapFormat::Rgba,
                };

                let Some(region) = self.atlas.insert(physical.cache_key, w, h, &image.data, format)
                else {
                    skipped += 1;
                    continue;
                };

                let x = (physical.x + image.placement.left) as f32;
                let y = run.line_y + (physical.y - image.placement.top) as f32;

                runs.entry(region.page).or_default().push_quad(
                    [x, y],
                    [x + w as f32, y + h as f32],
                    [region.u_min, region.v_min],
                    [region.u_max, region.v_max],
                );
            }
        }

        if skipped > 0 {
            log::warn!("{skipped} glyph(s) skipped: glyph atlas is full");
        }

        // Link back to front so the chain runs in page order.
        let head = runs.into_iter().rev().fold(None, |next, (page, run)| {
            let sequence = run.into_sequence(page);
            Some(match next {
                Some(next) => sequence.with_next(next),
                None => sequence,
            })
        });

        Shaped {
            head,
            width,
            height,
            epoch: self.atlas.epoch(),
        }
    }
}

impl Default for TextEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_fonts() -> Option<TextEngine> {
        let engine = TextEngine::new();
        // Hosts without any installed fonts can't shape anything.
        (engine.font_system().db().faces().count() > 0).then_some(engine)
    }

    #[test]
    fn test_shape_empty_string() {
        let Some(mut engine) = engine_with_fonts() else { return };
        let font = Font::system("sans-serif", 16.0).unwrap();
        let shaped = engine.shape(&font, "", 0);
        assert!(shaped.head.is_none());
    }

    #[test]
    fn test_shape_produces_quads() {
        let Some(mut engine) = engine_with_fonts() else { return };
        let font = Font::system("sans-serif", 24.0).unwrap();
        let shaped = engine.shape(&font, "Hello", 0);
        let head = shaped.head.expect("expected glyphs for 'Hello'");
        let (vertices, indices) = head.chain_totals();
        assert!(vertices > 0);
        assert_eq!(vertices % 4, 0);
        assert_eq!(indices, vertices / 4 * 6);
        assert!(shaped.width > 0.0);
        assert!(shaped.height > 0.0);
        assert!(engine.atlas().glyph_count() > 0);
    }

    #[test]
    fn test_whitespace_has_no_geometry() {
        let Some(mut engine) = engine_with_fonts() else { return };
        let font = Font::system("monospace", 16.0).unwrap();
        let shaped = engine.shape(&font, "   ", 0);
        assert!(shaped.head.is_none());
    }

    #[test]
    fn test_newline_adds_a_line() {
        let Some(mut engine) = engine_with_fonts() else { return };
        let font = Font::system("monospace", 20.0).unwrap();
        let one = engine.shape(&font, "hello 1234", 0);
        let two = engine.shape(&font, "hello 1234\nwgpu is cool!", 0);
        assert!(two.height > one.height, "{} <= {}", two.height, one.height);
    }

    #[test]
    fn test_wrap_width_breaks_lines() {
        let Some(mut engine) = engine_with_fonts() else { return };
        let font = Font::system("sans-serif", 16.0).unwrap();
        let wide = engine.shape(&font, "Hello World Glyph Batches", 0);
        let narrow = engine.shape(&font, "Hello World Glyph Batches", 80);
        assert!(narrow.height > wide.height);
        assert!(narrow.width <= wide.width);
    }

    #[test]
    fn test_uvs_within_unit_square() {
        let Some(mut engine) = engine_with_fonts() else { return };
        let font = Font::system("sans-serif", 18.0).unwrap();
        let shaped = engine.shape(&font, "UV check", 0);
        if let Some(head) = shaped.head {
            for seq in &head {
                for i in 0..seq.num_vertices() {
                    let [u, v] = seq.uv(i);
                    assert!((0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v));
                }
            }
        }
    }

    #[test]
    fn test_full_atlas_skips_glyphs() {
        let Some(engine) = engine_with_fonts() else { return };
        let font_system = engine.font_system;
        // Pages too small for any 48px glyph.
        let mut engine = TextEngine::with_atlas(font_system, GlyphAtlas::new(8, 1));
        let font = Font::system("sans-serif", 48.0).unwrap();
        let shaped = engine.shape(&font, "WM", 0);
        assert!(shaped.head.is_none());
        assert!(shaped.width > 0.0);
    }

    #[test]
    fn test_load_missing_font_fails() {
        let mut engine = TextEngine::with_atlas(
            FontSystem::new_with_locale_and_db("en-US".into(), cosmic_text::fontdb::Database::new()),
            GlyphAtlas::default(),
        );
        assert!(matches!(
            engine.load_font("/nonexistent.ttf", 20.0),
            Err(FontError::Io { .. })
        ));
    }
}
