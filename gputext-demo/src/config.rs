//! Demo configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! yields the stock demo. `GPUTEXT_CONFIG` names an optional JSON file;
//! `GPUTEXT_FONT` and `GPUTEXT_TEXT` override single fields on top of it.

use std::io;
use std::path::{Path, PathBuf};

use gputext_render::{MAX_INDEX_COUNT, MAX_VERTEX_COUNT};
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV: &str = "GPUTEXT_CONFIG";
pub const FONT_ENV: &str = "GPUTEXT_FONT";
pub const TEXT_ENV: &str = "GPUTEXT_TEXT";

const DEFAULT_FONT: &str = "/usr/share/fonts/truetype/noto/NotoSansMono-Regular.ttf";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Model transform applied to the whole text block.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelTransform {
    /// Pixel offset of the text origin.
    pub translation: [f32; 2],
    /// Rotation about the Z axis, in degrees.
    pub rotation_degrees: f32,
    pub scale: [f32; 2],
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            translation: [300.0, 150.0],
            rotation_degrees: 45.0,
            scale: [1.2, 1.2],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Font file to load; `null` picks the system monospace family.
    pub font_path: Option<PathBuf>,
    pub point_size: f32,
    pub text: String,
    /// Wrap width in pixels, 0 = no wrapping.
    pub wrap_width: u32,
    pub text_color: [f32; 4],
    pub clear_color: [f64; 4],
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub max_vertices: usize,
    pub max_indices: usize,
    pub model: ModelTransform,
}

impl Default for DemoConfig {
    fn default() -> Self {
        let shaders = default_shader_dir();
        Self {
            title: "GPU text test".to_string(),
            width: 800,
            height: 600,
            font_path: Some(PathBuf::from(DEFAULT_FONT)),
            point_size: 20.0,
            text: "hello 1234\nwgpu is cool!".to_string(),
            wrap_width: 0,
            text_color: [1.0, 1.0, 0.0, 1.0],
            clear_color: [0.3, 0.4, 0.5, 1.0],
            vertex_shader: shaders.join("text.vert.wgsl"),
            fragment_shader: shaders.join("text.frag.wgsl"),
            max_vertices: MAX_VERTEX_COUNT,
            max_indices: MAX_INDEX_COUNT,
            model: ModelTransform::default(),
        }
    }
}

/// `shaders/` next to the executable when present, otherwise the shaders
/// shipped in the source tree.
///
/// Installed binaries should ship the shader directory alongside them or
/// point `vertex_shader` / `fragment_shader` at it via `GPUTEXT_CONFIG`.
pub fn default_shader_dir() -> PathBuf {
    let installed = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("shaders")))
        .filter(|dir| dir.is_dir());
    installed.unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("../gputext-render/shaders"))
}

impl DemoConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using `var` to look up environment variables.
    pub fn load_with(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match var(CONFIG_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(font) = var(FONT_ENV) {
            config.font_path = (!font.is_empty()).then(|| PathBuf::from(font));
        }
        if let Some(text) = var(TEXT_ENV) {
            config.text = text;
        }
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = DemoConfig::default();
        assert_eq!(config.title, "GPU text test");
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.point_size, 20.0);
        assert_eq!(config.text, "hello 1234\nwgpu is cool!");
        assert_eq!(config.text_color, [1.0, 1.0, 0.0, 1.0]);
        assert_eq!(config.clear_color, [0.3, 0.4, 0.5, 1.0]);
        assert_eq!((config.max_vertices, config.max_indices), (4000, 6000));
        assert_eq!(config.model.rotation_degrees, 45.0);
        assert!(config.vertex_shader.ends_with("text.vert.wgsl"));
    }

    #[test]
    fn test_default_shaders_exist() {
        let dir = default_shader_dir();
        assert!(dir.join("text.vert.wgsl").is_file(), "{}", dir.display());
        assert!(dir.join("text.frag.wgsl").is_file());
        assert_eq!(DemoConfig::default().vertex_shader, dir.join("text.vert.wgsl"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: DemoConfig =
            serde_json::from_str(r#"{ "text": "hi", "model": { "scale": [2.0, 2.0] } }"#).unwrap();
        assert_eq!(config.text, "hi");
        assert_eq!(config.model.scale, [2.0, 2.0]);
        assert_eq!(config.model.translation, [300.0, 150.0]);
        assert_eq!(config.width, 800);
    }

    #[test]
    fn test_null_font_selects_system_family() {
        let config: DemoConfig = serde_json::from_str(r#"{ "font_path": null }"#).unwrap();
        assert_eq!(config.font_path, None);
    }

    #[test]
    fn test_env_overrides() {
        let path = write_temp("gputext-config-overrides.json", r#"{ "width": 1024, "text": "file" }"#);
        let env: HashMap<&str, String> = [
            (CONFIG_ENV, path.display().to_string()),
            (FONT_ENV, "/tmp/font.ttf".to_string()),
            (TEXT_ENV, "env".to_string()),
        ]
        .into_iter()
        .collect();

        let config = DemoConfig::load_with(|key| env.get(key).cloned()).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(config.width, 1024);
        assert_eq!(config.text, "env");
        assert_eq!(config.font_path, Some(PathBuf::from("/tmp/font.ttf")));
    }

    #[test]
    fn test_empty_font_env_clears_path() {
        let config = DemoConfig::load_with(|key| (key == FONT_ENV).then(String::new)).unwrap();
        assert_eq!(config.font_path, None);
    }

    #[test]
    fn test_no_env_is_default() {
        assert_eq!(DemoConfig::load_with(|_| None).unwrap(), DemoConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let err = DemoConfig::from_file("/nonexistent/gputext.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let path = write_temp("gputext-config-invalid.json", "{ width: ");
        let err = DemoConfig::from_file(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
