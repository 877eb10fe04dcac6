//! Font handles: a family plus a size, resolved by `cosmic-text`.
//!
//! Fonts come from two places:
//!
//! - **Files** ([`Font::from_file`]): the file is read and its faces added
//!   to the engine's font database; the handle names the first new family.
//! - **Installed families** ([`Font::system`]): a concrete family name or
//!   one of the generic families `sans-serif`, `serif`, `monospace`.
//!
//! Sizes are given in points at 72 DPI, so one point is one pixel.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use cosmic_text::{Attrs, Family, FontSystem, Metrics};
use thiserror::Error;

/// Pixels per point at 72 DPI.
const PIXELS_PER_POINT: f32 = 1.0;

/// Default line height as a multiple of the font size.
const LINE_HEIGHT_FACTOR: f32 = 1.2;

#[derive(Error, Debug)]
pub enum FontError {
    #[error("Failed to read font {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No font faces found in {0}")]
    NoFaces(PathBuf),
    #[error("Invalid point size {0}")]
    InvalidSize(f32),
}

/// Family selector.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FontFamily {
    Named(String),
    SansSerif,
    Serif,
    Monospace,
}

impl FontFamily {
    /// Parse a family name. For a CSS-style chain (`"Foo, monospace"`) the
    /// first entry wins; cosmic-text falls back on its own when it's missing.
    pub fn parse(name: &str) -> Self {
        let first = name
            .split(',')
            .next()
            .unwrap_or(name)
            .trim()
            .trim_matches('"')
            .trim_matches('\'');
        match first.to_ascii_lowercase().as_str() {
            "sans-serif" => Self::SansSerif,
            "serif" => Self::Serif,
            "monospace" => Self::Monospace,
            _ => Self::Named(first.to_owned()),
        }
    }

    fn as_cosmic(&self) -> Family<'_> {
        match self {
            Self::Named(name) => Family::Name(name.as_str()),
            Self::SansSerif => Family::SansSerif,
            Self::Serif => Family::Serif,
            Self::Monospace => Family::Monospace,
        }
    }
}

/// A loaded font at a given size.
#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    family: FontFamily,
    point_size: f32,
    line_height: f32,
}

impl Font {
    /// Load a font file into `font_system` and return a handle to it.
    pub fn from_file(
        font_system: &mut FontSystem,
        path: impl AsRef<Path>,
        point_size: f32,
    ) -> Result<Self, FontError> {
        let path = path.as_ref();
        check_size(point_size)?;

        let data = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let db = font_system.db_mut();
        let known: HashSet<_> = db.faces().map(|face| face.id).collect();
        db.load_font_data(data);

        let family = db
            .faces()
            .filter(|face| !known.contains(&face.id))
            .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
            .ok_or_else(|| FontError::NoFaces(path.to_path_buf()))?;

        log::debug!("loaded font '{family}' from {}", path.display());
        Ok(Self::with_family(FontFamily::Named(family), point_size))
    }

    /// Refer to an installed or generic family.
    pub fn system(family: &str, point_size: f32) -> Result<Self, FontError> {
        check_size(point_size)?;
        Ok(Self::with_family(FontFamily::parse(family), point_size))
    }

    fn with_family(family: FontFamily, point_size: f32) -> Self {
        let px = point_size * PIXELS_PER_POINT;
        Self {
            family,
            point_size,
            line_height: px * LINE_HEIGHT_FACTOR,
        }
    }

    /// Override the line height (pixels).
    pub fn with_line_height(mut self, line_height: f32) -> Self {
        self.line_height = line_height;
        self
    }

    pub fn family(&self) -> &FontFamily {
        &self.family
    }

    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    /// Font size in pixels.
    pub fn pixel_size(&self) -> f32 {
        self.point_size * PIXELS_PER_POINT
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    pub(crate) fn metrics(&self) -> Metrics {
        Metrics::new(self.pixel_size(), self.line_height)
    }

    pub(crate) fn attrs(&self) -> Attrs<'_> {
        Attrs::new().family(self.family.as_cosmic())
    }
}

fn check_size(point_size: f32) -> Result<(), FontError> {
    if point_size.is_finite() && point_size > 0.0 {
        Ok(())
    } else {
        Err(FontError::InvalidSize(point_size))
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cosmic_text::fontdb::Database;

    #[test]
    fn test_parse_generic_families() {
        assert_eq!(FontFamily::parse("monospace"), FontFamily::Monospace);
        assert_eq!(FontFamily::parse("Serif"), FontFamily::Serif);
        assert_eq!(FontFamily::parse(" sans-serif "), FontFamily::SansSerif);
    }

    #[test]
    fn test_parse_css_chain_takes_first() {
        assert_eq!(
            FontFamily::parse("\"Noto Sans Mono\", monospace"),
            FontFamily::Named("Noto Sans Mono".into())
        );
    }

    #[test]
    fn test_system_font_metrics() {
        let font = Font::system("monospace", 20.0).unwrap();
        assert_eq!(font.point_size(), 20.0);
        assert_eq!(font.pixel_size(), 20.0);
        assert!((font.line_height() - 24.0).abs() < 1e-5);
        assert!((font.with_line_height(30.0).line_height() - 30.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_size_rejected() {
        assert!(matches!(Font::system("serif", 0.0), Err(FontError::InvalidSize(_))));
        assert!(matches!(Font::system("serif", f32::NAN), Err(FontError::InvalidSize(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let mut fs = FontSystem::new_with_locale_and_db("en-US".into(), Database::new());
        let err = Font::from_file(&mut fs, "/nonexistent/font.ttf", 12.0).unwrap_err();
        assert!(matches!(err, FontError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/font.ttf"));
    }

    #[test]
    fn test_non_font_file_has_no_faces() {
        let mut fs = FontSystem::new_with_locale_and_db("en-US".into(), Database::new());
        let path = std::env::temp_dir().join("gputext-not-a-font.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();
        let err = Font::from_file(&mut fs, &path, 12.0).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, FontError::NoFaces(_)));
    }
}
