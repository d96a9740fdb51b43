use crate::errors::{DigestError, DigestResult};
use crate::interpret::InterpretOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "thread-digest";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_THINKING_BUDGET: i32 = 1024;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Configuration for ThreadDigest
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct DigestConfig {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub thinking_budget: Option<i32>,
    pub request_timeout_secs: Option<u64>,
    pub strip_fallback_title: Option<bool>,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl DigestConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> DigestResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DigestError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content)
            .map_err(|e| DigestError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> DigestResult<()> {
        let content = toml::to_string(self).map_err(|e| {
            DigestError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                DigestError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content).map_err(|e| {
            DigestError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            model_name: other.model_name.clone().or_else(|| self.model_name.clone()),
            thinking_budget: other.thinking_budget.or(self.thinking_budget),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            strip_fallback_title: other.strip_fallback_title.or(self.strip_fallback_title),
            data_dir: other.data_dir.clone().or_else(|| self.data_dir.clone()),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
        }
    }

    pub fn model_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn thinking_budget(&self) -> i32 {
        self.thinking_budget.unwrap_or(DEFAULT_THINKING_BUDGET)
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    pub fn interpret_options(&self) -> InterpretOptions {
        InterpretOptions {
            strip_fallback_title: self.strip_fallback_title.unwrap_or(false),
        }
    }

    /// Directory holding history and preferences
    pub fn data_dir(&self) -> DigestResult<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => get_default_data_dir(APP_NAME),
        }
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> DigestResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        DigestError::ConfigError("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> DigestResult<PathBuf> {
    Ok(get_default_config_dir(app_name)?.join("config.toml"))
}

/// Helper function to get default data directory
pub fn get_default_data_dir(app_name: &str) -> DigestResult<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        DigestError::ConfigError("Could not determine data directory".to_string())
    })?;

    Ok(data_dir.join(app_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = DigestConfig::default();
        assert_eq!(config.model_name(), DEFAULT_MODEL);
        assert_eq!(config.thinking_budget(), 1024);
        assert_eq!(config.request_timeout_secs(), 120);
        assert!(!config.interpret_options().strip_fallback_title);
    }

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempdir().unwrap();
        let config = DigestConfig::load_from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, DigestConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = DigestConfig {
            model_name: Some("gemini-2.5-pro".into()),
            request_timeout_secs: Some(30),
            strip_fallback_title: Some(true),
            ..Default::default()
        };

        config.save_to_file(&path).unwrap();
        let loaded = DigestConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.interpret_options().strip_fallback_title);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model_name = [").unwrap();
        let err = DigestConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, DigestError::ConfigError(_)));
    }

    #[test]
    fn test_merge_prefers_other() {
        let base = DigestConfig {
            api_key: Some("file-key".into()),
            model_name: Some("file-model".into()),
            thinking_budget: Some(512),
            ..Default::default()
        };
        let overrides = DigestConfig {
            api_key: Some("flag-key".into()),
            request_timeout_secs: Some(5),
            ..Default::default()
        };

        let merged = base.merge(&overrides);
        assert_eq!(merged.api_key.as_deref(), Some("flag-key"));
        assert_eq!(merged.model_name(), "file-model");
        assert_eq!(merged.thinking_budget(), 512);
        assert_eq!(merged.request_timeout_secs(), 5);
    }
}
