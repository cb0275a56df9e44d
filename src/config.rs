use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::utils::get_env_with_prefix;

/// Configuration for request unmarshalling and logging
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How uploaded files are buffered
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    /// Bytes held in memory before an upload is written to a temporary file
    /// (default: 32MB)
    #[serde(default = "default_max_memory")]
    pub max_memory: u64,
    /// Directory for temporary files. Uses the system temp dir when unset.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    #[serde(default = "default_temp_prefix")]
    pub temp_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_memory: default_max_memory(),
            temp_dir: None,
            temp_prefix: default_temp_prefix(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

fn default_max_memory() -> u64 {
    32 << 20
}

fn default_temp_prefix() -> String {
    "tideway-upload-".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

impl UploadConfig {
    /// Load upload settings from `TIDEWAY_MAX_MEMORY` and
    /// `TIDEWAY_UPLOAD_TEMP_DIR`, keeping defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(max_memory) = get_env_with_prefix("MAX_MEMORY") {
            if let Ok(n) = max_memory.parse() {
                config.max_memory = n;
            }
        }
        if let Some(dir) = get_env_with_prefix("UPLOAD_TEMP_DIR") {
            config.temp_dir = Some(PathBuf::from(dir));
        }
        config
    }
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_max_memory(mut self, max_memory: u64) -> Self {
        self.config.upload.max_memory = max_memory;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload.temp_dir = Some(dir.into());
        self
    }

    pub fn with_temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.upload.temp_prefix = prefix.into();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    /// Load configuration from environment variables with TIDEWAY_ prefix
    pub fn from_env(mut self) -> Self {
        self.config.upload = UploadConfig::from_env();

        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }
        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns an error if the log level is unknown or the temp directory
    /// does not exist.
    pub fn build(self) -> Result<Config> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(Error::Config(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if let Some(dir) = &self.config.upload.temp_dir {
            if !dir.is_dir() {
                return Err(Error::Config(format!(
                    "Upload temp dir {} is not a directory",
                    dir.display()
                )));
            }
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigBuilder::new().build().unwrap();

        assert_eq!(config.upload.max_memory, 32 * 1024 * 1024);
        assert_eq!(config.upload.temp_prefix, "tideway-upload-");
        assert!(config.upload.temp_dir.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_builder_overrides() {
        let dir = std::env::temp_dir();
        let config = ConfigBuilder::new()
            .with_max_memory(1024)
            .with_temp_dir(&dir)
            .with_log_level("debug")
            .build()
            .unwrap();

        assert_eq!(config.upload.max_memory, 1024);
        assert_eq!(config.upload.temp_dir, Some(dir));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_log_level() {
        let result = ConfigBuilder::new().with_log_level("loud").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_temp_dir() {
        let result = ConfigBuilder::new()
            .with_temp_dir("/definitely/not/a/real/dir")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_upload_from_env() {
        unsafe {
            std::env::set_var("TIDEWAY_MAX_MEMORY", "4096");
        }
        let config = UploadConfig::from_env();
        unsafe {
            std::env::remove_var("TIDEWAY_MAX_MEMORY");
        }

        assert_eq!(config.max_memory, 4096);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config = serde_json::from_str(r#"{"upload": {"max_memory": 10}}"#).unwrap();

        assert_eq!(config.upload.max_memory, 10);
        assert_eq!(config.upload.temp_prefix, "tideway-upload-");
        assert_eq!(config.logging.level, "info");
    }
}
