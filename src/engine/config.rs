//! Updater Configuration Module
//! Handles loading and validating updater.config.json

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::updater::{ApplyStrategy, InstallLayout, RequestOptions, VersionPolicy};

pub const CONFIG_FILE_NAME: &str = "updater.config.json";
pub const DEFAULT_LOG_FILE: &str = "updater-log.txt";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Invalid config format: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error("Could not determine config directory")]
    NoConfigDir,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdaterConfig {
    /// Manifest endpoint
    pub api: String,
    /// Relative paths resolve against the install directory; `null` disables
    #[serde(default = "default_log_file")]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub request_options: RequestOptions,
    pub install: InstallLayout,
    #[serde(default)]
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PolicyConfig {
    #[serde(default)]
    pub version: VersionPolicy,
    #[serde(default)]
    pub apply_strategy: ApplyStrategy,
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_LOG_FILE))
}

impl UpdaterConfig {
    pub fn new(api: impl Into<String>, install: InstallLayout) -> Self {
        Self {
            api: api.into(),
            log_file: default_log_file(),
            request_options: RequestOptions::default(),
            install,
            policy: PolicyConfig::default(),
        }
    }

    /// Platform config location, e.g. `~/.config/bundle-updater/updater.config.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("bundle-updater").join(CONFIG_FILE_NAME))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: UpdaterConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.trim().is_empty() {
            return Err(ConfigError::Invalid("api must not be empty".to_string()));
        }
        reqwest::Url::parse(&self.api)
            .map_err(|e| ConfigError::Invalid(format!("api {}: {}", self.api, e)))?;
        if self.install.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("install.path must not be empty".to_string()));
        }
        if self.install.staged_file_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "install.staged_file_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolved log file path, if logging to a file is enabled
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| self.install.resolve(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_minimal_config_defaults() {
        let config: UpdaterConfig = serde_json::from_str(
            r#"{"api": "https://updates.example.com/check", "install": {"path": "/opt/app/app.asar"}}"#,
        )
        .unwrap();

        assert_eq!(config.log_file, Some(PathBuf::from(DEFAULT_LOG_FILE)));
        assert_eq!(
            config.log_path(),
            Some(PathBuf::from("/opt/app/updater-log.txt"))
        );
        assert_eq!(config.policy.version, VersionPolicy::ServerTrust);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_null_log_file_disables_logging() {
        let config: UpdaterConfig = serde_json::from_str(
            r#"{"api": "https://u.example.com", "log_file": null, "install": {"path": "/a/app.asar"}}"#,
        )
        .unwrap();
        assert_eq!(config.log_path(), None);
    }

    #[test]
    fn test_validate_rejects_bad_api() {
        let mut config = UpdaterConfig::new("", InstallLayout::new("/a/app.asar"));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.api = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = UpdaterConfig::new(
            "https://updates.example.com/check",
            InstallLayout::new("/opt/app/app.asar").with_expected_artifact_name("app.asar"),
        );
        config.policy.version = VersionPolicy::RequireNewer;
        config.save(&path).unwrap();

        let loaded = UpdaterConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing() {
        let dir = tempdir().unwrap();
        let result = UpdaterConfig::load(&dir.path().join(CONFIG_FILE_NAME));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
