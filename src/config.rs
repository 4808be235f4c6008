use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_inbox_page_size")]
    pub inbox_page_size: usize,
    #[serde(default = "default_project_page_size")]
    pub project_page_size: usize,
    #[serde(default = "default_task_page_size")]
    pub task_page_size: usize,
    /// Days between weekly reviews before the review prompt shows up.
    #[serde(default = "default_review_interval_days")]
    pub review_interval_days: i64,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            inbox_page_size: default_inbox_page_size(),
            project_page_size: default_project_page_size(),
            task_page_size: default_task_page_size(),
            review_interval_days: default_review_interval_days(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

// Default value functions
fn default_database_path() -> String {
    Config::default_database_path_for_profile(utils::Profile::Prod)
}

fn default_inbox_page_size() -> usize {
    10
}

fn default_project_page_size() -> usize {
    8
}

fn default_task_page_size() -> usize {
    10
}

fn default_review_interval_days() -> i64 {
    7
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from the profile's config directory, writing the
    /// defaults out first if the file is missing.
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        if config_path.exists() {
            return Self::load_from_path(&config_path);
        }

        let mut config = Config {
            database_path: Self::default_database_path_for_profile(profile),
            ..Config::default()
        };
        config.save_to_path(&config_path)?;
        info!(path = %config_path.display(), "wrote default config");
        Ok(config)
    }

    /// Load configuration from an explicit file. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "config file missing, using defaults");
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Save configuration to file, creating parent directories as needed
    pub fn save_to_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get default database path for a specific profile
    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("gtd.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/gtdesk-dev/gtd.db".to_string(),
                utils::Profile::Prod => "~/.local/share/gtdesk/gtd.db".to_string(),
            }
        }
    }

    /// Get the expanded database path (with ~ expansion)
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, size) in [
            ("inbox_page_size", self.inbox_page_size),
            ("project_page_size", self.project_page_size),
            ("task_page_size", self.task_page_size),
        ] {
            if size == 0 {
                return Err(ConfigError::InvalidValue(format!("{key} must be at least 1")));
            }
        }
        if self.review_interval_days < 1 {
            return Err(ConfigError::InvalidValue("review_interval_days must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "database_path = \"/tmp/x.db\"\ntask_page_size = 25\n").unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.database_path, "/tmp/x.db");
        assert_eq!(config.task_page_size, 25);
        assert_eq!(config.inbox_page_size, 10);
        assert_eq!(config.project_page_size, 8);
        assert_eq!(config.review_interval_days, 7);
    }

    #[test]
    fn save_then_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config {
            review_interval_days: 14,
            config_version: None,
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.review_interval_days, 14);
        assert_eq!(loaded.config_version, Some(CURRENT_CONFIG_VERSION));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "inbox_page_size = 0\n").unwrap();
        assert!(matches!(Config::load_from_path(&path), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_path(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.inbox_page_size, 10);
    }
}
