//! Player settings, loadable from a JSON file.

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::color::Color;
use crate::error::{LottieError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Capacity of the resolved key path cache.
    pub cache_capacity: usize,
    /// Folder image assets are read from, relative paths resolved against it.
    pub images_folder: Option<PathBuf>,
    /// `#rrggbb` or `#rrggbbaa` fill drawn under every frame.
    pub background: Option<String>,
    pub isolate_group_opacity: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            images_folder: None,
            background: None,
            isolate_group_opacity: true,
        }
    }
}

impl PlayerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| LottieError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Parsed background colour. Unparseable values are logged and ignored.
    pub fn background_color(&self) -> Option<Color> {
        let hex = self.background.as_deref()?;
        let color = Color::from_hex(hex);
        if color.is_none() {
            warn!(background = hex, "Ignoring unparseable background colour");
        }
        color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = PlayerConfig::from_json_str(&json!({"background": "#102030"}).to_string()).unwrap();
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert!(config.isolate_group_opacity);
        assert_eq!(config.background_color(), Some(Color::rgba(0x10, 0x20, 0x30, 255)));
    }

    #[test]
    fn test_bad_background_is_ignored() {
        let config = PlayerConfig {
            background: Some("blue".into()),
            ..PlayerConfig::default()
        };
        assert_eq!(config.background_color(), None);
    }

    #[test]
    fn test_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("player.json");
        assert!(matches!(
            PlayerConfig::from_json_file(&missing),
            Err(LottieError::ReadFile { path, .. }) if path == missing
        ));

        std::fs::write(&missing, r#"{"cache_capacity": 3, "images_folder": "assets"}"#).unwrap();
        let config = PlayerConfig::from_json_file(&missing).unwrap();
        assert_eq!(config.cache_capacity, 3);
        assert_eq!(config.images_folder, Some(PathBuf::from("assets")));

        std::fs::write(&missing, "{").unwrap();
        assert!(matches!(PlayerConfig::from_json_file(&missing), Err(LottieError::Parse(_))));
    }
}
