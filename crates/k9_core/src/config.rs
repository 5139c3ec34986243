//! Application configuration loaded from a JSON file.
//!
//! Every field has a default, so an absent file is not an error: the demo runs
//! with the built-in values. A file that exists but cannot be read or parsed
//! is reported, since silently ignoring a typo is worse than refusing to start.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "assets/k9.json";
pub const CONFIG_ENV_VAR: &str = "K9_CONFIG";

/// Point sizes a loaded font can be rendered at.
pub const FONT_POINT_SIZES: &[u32] = &[
    8, 9, 10, 11, 12, 14, 16, 18, 20, 22, 24, 26, 28, 30, 32, 34, 36, 38, 40, 42, 44, 46, 48, 52,
    56, 60, 64, 68, 72,
];

/// Upper bound of the music volume scale (the lower bound is always zero).
pub const MAX_VOLUME: u32 = 128;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowSection,
    pub assets: AssetSection,
    pub audio: AudioSection,
    pub text: TextSection,
    pub log_filter: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowSection {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetSection {
    pub sprite_texture: PathBuf,
    pub font: PathBuf,
    pub music_manifest: PathBuf,
    /// WGSL file replacing the built-in sprite shader.
    pub shader: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSection {
    pub initial_volume: u32,
    pub autoplay: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TextSection {
    pub content: String,
    pub point_size: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: WindowSection::default(),
            assets: AssetSection::default(),
            audio: AudioSection::default(),
            text: TextSection::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            title: "ImGUI Example".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

impl Default for AssetSection {
    fn default() -> Self {
        Self {
            sprite_texture: PathBuf::from("assets/textures/fox.jpg"),
            font: PathBuf::from("assets/fonts/font.ttf"),
            music_manifest: PathBuf::from("assets/music/music.json"),
            shader: None,
        }
    }
}

impl Default for AudioSection {
    fn default() -> Self {
        Self {
            initial_volume: MAX_VOLUME / 2,
            autoplay: None,
        }
    }
}

impl Default for TextSection {
    fn default() -> Self {
        Self {
            content: "K9 sprite demo".to_string(),
            point_size: 30,
        }
    }
}

impl AppConfig {
    /// Resolve the config path: explicit argument first, then `K9_CONFIG`,
    /// then [`DEFAULT_CONFIG_PATH`].
    pub fn resolve_path(arg: Option<String>) -> PathBuf {
        arg.or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load and validate the config at `path`, falling back to defaults when
    /// the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!(
                "Config '{}' not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&raw).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        log::info!("Loaded config '{}'", path.display());
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if self.audio.initial_volume > MAX_VOLUME {
            return Err(ConfigError::Invalid(format!(
                "audio.initial_volume {} exceeds the maximum of {}",
                self.audio.initial_volume, MAX_VOLUME
            )));
        }
        if !FONT_POINT_SIZES.contains(&self.text.point_size) {
            return Err(ConfigError::Invalid(format!(
                "text.point_size {} is not a supported font size",
                self.text.point_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "k9_config_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn defaults_match_the_demo_window() {
        let config = AppConfig::default();
        assert_eq!(config.window.title, "ImGUI Example");
        assert_eq!((config.window.width, config.window.height), (1280, 720));
        assert_eq!(config.audio.initial_volume, 64);
        assert_eq!(config.text.point_size, 30);
        assert!(config.assets.shader.is_none());
        config.validate().expect("defaults should validate");
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let config = AppConfig::from_json(r#"{ "window": { "title": "Custom" } }"#)
            .expect("partial config should parse");
        assert_eq!(config.window.title, "Custom");
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn optional_fields_parse() {
        let config = AppConfig::from_json(
            r#"{ "assets": { "shader": "shaders/custom.wgsl" }, "audio": { "autoplay": "theme" } }"#,
        )
        .expect("config should parse");
        assert_eq!(
            config.assets.shader.as_deref(),
            Some(Path::new("shaders/custom.wgsl"))
        );
        assert_eq!(config.audio.autoplay.as_deref(), Some("theme"));
    }

    #[test]
    fn zero_window_size_is_rejected() {
        let err = AppConfig::from_json(r#"{ "window": { "width": 0 } }"#)
            .expect_err("zero width should fail");
        assert!(err.to_string().contains("non-zero"));
    }

    #[test]
    fn volume_above_max_is_rejected() {
        let err = AppConfig::from_json(r#"{ "audio": { "initial_volume": 129 } }"#)
            .expect_err("volume overflow should fail");
        assert!(err.to_string().contains("initial_volume"));
    }

    #[test]
    fn unsupported_point_size_is_rejected() {
        let err = AppConfig::from_json(r#"{ "text": { "point_size": 13 } }"#)
            .expect_err("size 13 is not in the font size table");
        assert!(err.to_string().contains("point_size"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = temp_file_path("missing");
        let _ = fs::remove_file(&path);
        let config = AppConfig::load_or_default(&path).expect("missing file is not an error");
        assert_eq!(config.window.width, 1280);
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let path = temp_file_path("malformed");
        fs::write(&path, "{ not json").expect("failed to write temp config");
        let err = AppConfig::load_or_default(&path).expect_err("malformed file should fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&path.display().to_string()));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn shipped_sample_config_is_valid() {
        let config = AppConfig::from_json(include_str!("../../../assets/k9.json"))
            .expect("assets/k9.json should parse");
        assert_eq!(config.assets.music_manifest, PathBuf::from("assets/music/music.json"));
        assert_eq!(config.audio.initial_volume, 64);
    }

    #[test]
    fn explicit_argument_wins_path_resolution() {
        let path = AppConfig::resolve_path(Some("custom.json".to_string()));
        assert_eq!(path, PathBuf::from("custom.json"));
    }
}
