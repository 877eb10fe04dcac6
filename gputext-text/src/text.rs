//! Text objects: a string, a font, a wrap width and a color.
//!
//! Shaping is lazy: setters only mark the object dirty, and the next call to
//! [`Text::draw_data`] re-shapes through the engine. Draw data is also
//! rebuilt when the engine's atlas has been cleared since the last shape.

use crate::engine::{Shaped, TextEngine};
use crate::fonts::Font;
use crate::sequence::DrawSequence;

/// A wrapped block of text owned by the caller.
#[derive(Clone, Debug)]
pub struct Text {
    font: Font,
    string: String,
    wrap_width: u32,
    color: [f32; 4],
    shaped: Option<Shaped>,
}

impl Text {
    pub(crate) fn new(font: Font, string: &str, wrap_width: u32) -> Self {
        Self {
            font,
            string: string.to_owned(),
            wrap_width,
            color: [1.0, 1.0, 1.0, 1.0],
            shaped: None,
        }
    }

    pub fn string(&self) -> &str {
        &self.string
    }

    pub fn set_string(&mut self, string: &str) {
        if self.string != string {
            self.string = string.to_owned();
            self.shaped = None;
        }
    }

    pub fn font(&self) -> &Font {
        &self.font
    }

    pub fn set_font(&mut self, font: Font) {
        if self.font != font {
            self.font = font;
            self.shaped = None;
        }
    }

    pub fn wrap_width(&self) -> u32 {
        self.wrap_width
    }

    pub fn set_wrap_width(&mut self, wrap_width: u32) {
        if self.wrap_width != wrap_width {
            self.wrap_width = wrap_width;
            self.shaped = None;
        }
    }

    /// Fill color applied uniformly when the text is batched.
    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    /// Color doesn't affect shaping, so this never invalidates draw data.
    pub fn set_color(&mut self, color: [f32; 4]) {
        self.color = color;
    }

    /// Head of the draw-sequence chain, one sequence per atlas page.
    ///
    /// Returns `None` when the text has no visible glyphs.
    pub fn draw_data(&mut self, engine: &mut TextEngine) -> Option<&DrawSequence> {
        self.ensure_shaped(engine).head.as_ref()
    }

    /// Laid-out `(width, height)` in pixels.
    pub fn size(&mut self, engine: &mut TextEngine) -> (f32, f32) {
        let shaped = self.ensure_shaped(engine);
        (shaped.width, shaped.height)
    }

    fn ensure_shaped(&mut self, engine: &mut TextEngine) -> &Shaped {
        let epoch = engine.atlas().epoch();
        if self.shaped.as_ref().is_some_and(|s| s.epoch != epoch) {
            self.shaped = None;
        }
        self.shaped
            .get_or_insert_with(|| engine.shape(&self.font, &self.string, self.wrap_width))
    }
}

// ===================================================================
// Tests
// ===================================================================
