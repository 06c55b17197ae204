use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

mod tab_group_config;
mod undo_config;
mod window_config;

pub use tab_group_config::TabGroupConfig;
pub use undo_config::UndoConfig;
pub use window_config::{WindowConfig, DEFAULT_MAX_WINDOWS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tab model configuration (config.json)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub window: WindowConfig,
    pub tab_groups: TabGroupConfig,
    pub undo: UndoConfig,
}

impl Config {
    /// Default config file path
    pub fn path() -> PathBuf {
        const FILENAME: &str = "config.json";
        if let Some(mut path) = dirs::config_dir() {
            path.push("tabmodel");
            path.push(FILENAME);
            return path;
        }

        // Fallback to home directory
        if let Some(mut path) = dirs::home_dir() {
            path.push(".tabmodel");
            path.push(FILENAME);
            return path;
        }

        PathBuf::from(FILENAME)
    }

    /// Load the default config file, falling back to defaults when it is missing or broken
    pub fn load() -> Self {
        let path = Self::path();
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), ?e, "Ignoring unreadable config file");
                Self::default()
            }
        }
    }

    /// Load an explicitly requested config file
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }
}
