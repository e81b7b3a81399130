//! Application configuration management.
//!
//! Handles loading, saving, and validating nexus configuration including:
//! - RSSI threshold for proximity validation
//! - Commit retry budget for session mutations
//! - Storage data directory
//! - HTTP server bind address
//! - Log level and log file directory

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::beacon::{RSSI_CEILING, RSSI_FLOOR};
use crate::error::{NexusError, Result};

/// Default proximity threshold in dBm. Readings at or above it pass.
pub const DEFAULT_RSSI_THRESHOLD: i16 = -65;

/// Default bound on commit retries for session mutations.
pub const DEFAULT_MAX_COMMIT_RETRIES: u32 = 3;

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NexusConfig {
    /// RSSI threshold for proximity validation (dBm).
    /// Typical values: -70 (lenient) to -50 (strict).
    pub rssi_threshold: i16,

    /// How many times a conflicting session commit is retried before the
    /// conflict surfaces to the caller.
    pub max_commit_retries: u32,

    /// Directory for persisted state. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,

    /// HTTP server settings.
    pub server: ServerConfig,

    /// Logging settings.
    pub log: LogConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,

    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when neither `RUST_LOG` nor `NEXUS_LOG_LEVEL`
    /// is set. Accepts anything `tracing_subscriber::EnvFilter` parses.
    pub level: String,

    /// Directory for rolling log files in production. `None` falls back to
    /// the platform default.
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl Default for NexusConfig {
    fn default() -> Self {
        Self {
            rssi_threshold: DEFAULT_RSSI_THRESHOLD,
            max_commit_retries: DEFAULT_MAX_COMMIT_RETRIES,
            data_dir: None,
            server: ServerConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl NexusConfig {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// validated.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| NexusError::ConfigParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| NexusError::ConfigParseError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the configuration for values the system cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`NexusError::ConfigValidationError`] naming the offending
    /// field.
    pub fn validate(&self) -> Result<()> {
        if self.rssi_threshold < RSSI_FLOOR || self.rssi_threshold > RSSI_CEILING {
            return Err(NexusError::ConfigValidationError(format!(
                "rssi_threshold: {} is outside [{RSSI_FLOOR}, {RSSI_CEILING}]",
                self.rssi_threshold
            )));
        }
        if self.max_commit_retries == 0 {
            return Err(NexusError::ConfigValidationError(
                "max_commit_retries: must be at least 1".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(NexusError::ConfigValidationError(
                "server.port: must be non-zero".to_string(),
            ));
        }
        if self.log.level.trim().is_empty() {
            return Err(NexusError::ConfigValidationError(
                "log.level: must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The default configuration file path.
    ///
    /// On Linux servers: `/etc/nexus/config.toml`
    /// For development: the platform config directory.
    pub fn default_path() -> Result<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            Ok(PathBuf::from("/etc/nexus/config.toml"))
        }
        #[cfg(not(target_os = "linux"))]
        {
            let dirs = directories::ProjectDirs::from("", "", "nexus").ok_or_else(|| {
                NexusError::ConfigValidationError("Cannot determine config directory".into())
            })?;
            Ok(dirs.config_dir().join("config.toml"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = NexusConfig::default();
        assert_eq!(config.rssi_threshold, -65);
        assert_eq!(config.max_commit_retries, 3);
        assert!(config.data_dir.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let mut config = NexusConfig::default();
        config.rssi_threshold = -10;
        assert!(config.validate().is_err());

        config.rssi_threshold = -130;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let mut config = NexusConfig::default();
        config.max_commit_retries = 0;
        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut config = NexusConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_log_level() {
        let mut config = NexusConfig::default();
        config.log.level = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = NexusConfig::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, NexusConfig::default());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = NexusConfig::default();
        config.rssi_threshold = -70;
        config.server.port = 8080;
        config.save(&path).unwrap();

        let loaded = NexusConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "rssi_threshold = \"very close\"").unwrap();

        let err = NexusConfig::load_or_default(&path).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "rssi_threshold = -5").unwrap();

        let err = NexusConfig::load_or_default(&path).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "rssi_threshold = -70").unwrap();

        let config = NexusConfig::load_or_default(&path).unwrap();
        assert_eq!(config.rssi_threshold, -70);
        assert_eq!(config.max_commit_retries, DEFAULT_MAX_COMMIT_RETRIES);
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.log, LogConfig::default());
    }

    #[test]
    fn test_log_section_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = NexusConfig::default();
        config.log.level = "debug".to_string();
        config.log.directory = Some(PathBuf::from("/tmp/nexus-logs"));
        config.save(&path).unwrap();

        let loaded = NexusConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded.log, config.log);
    }
}
