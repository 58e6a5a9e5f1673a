//! Game configuration loaded from TOML, with defaults and validation.
//!
//! Missing files fall back to defaults and partial files only override the
//! keys they name; a malformed or out-of-range file is an error, so a typo
//! never silently reverts a setting.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors. All fatal to the load attempt, never to the game.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// File locations for game content and saves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory of `.md` story templates.
    pub stories_dir: PathBuf,

    /// JSON item catalog.
    pub items_file: PathBuf,

    /// Where the save file lives.
    pub save_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            stories_dir: PathBuf::from("data/stories"),
            items_file: PathBuf::from("data/items.json"),
            save_file: PathBuf::from("saves/adventure.json"),
        }
    }
}

/// Gameplay tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    /// Bound on the look-back log.
    pub recent_log_cap: usize,

    /// Save automatically when the player quits.
    pub auto_save: bool,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            recent_log_cap: 50,
            auto_save: true,
        }
    }
}

/// Presentation hints consumed by the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub line_width: usize,
    pub prompt: String,
    pub show_door_list: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            line_width: 80,
            prompt: "> ".to_string(),
            show_door_list: true,
        }
    }
}

/// Top-level game configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GameConfig {
    pub paths: PathsConfig,
    pub gameplay: GameplayConfig,
    pub display: DisplayConfig,
}

impl GameConfig {
    /// Parse a configuration document. Keys not present keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file. A missing file is not an error: the
    /// defaults apply, matching first-run behavior.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: err,
            }),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(40..=120).contains(&self.display.line_width) {
            return Err(ConfigError::Invalid {
                key: "display.line_width",
                reason: format!("{} is outside 40..=120", self.display.line_width),
            });
        }
        if !(1..=500).contains(&self.gameplay.recent_log_cap) {
            return Err(ConfigError::Invalid {
                key: "gameplay.recent_log_cap",
                reason: format!("{} is outside 1..=500", self.gameplay.recent_log_cap),
            });
        }
        Ok(())
    }
}
