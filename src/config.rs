//! Engine configuration loading and resolution
//!
//! Resolution follows the priority order: command-line argument, environment
//! variable, TOML config file, compiled default. The first two are handled by
//! clap in the binary; this module covers the file and default layers.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default output buffer capacity in bytes
pub const DEFAULT_BUFFER_CAPACITY: usize = 65536;

/// Default number of output buffers cycled through the pool
pub const DEFAULT_BUFFER_COUNT: usize = 3;

/// Playback engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output buffer capacity in bytes
    pub buffer_capacity: usize,

    /// Number of output buffers in the pool
    pub buffer_count: usize,

    /// How long each wait for a free buffer blocks before re-checking the
    /// stop flag, in milliseconds
    pub free_wait_ms: u64,

    /// Upper bound on waiting for a sink completion before the session is
    /// declared stalled, in milliseconds
    pub stall_timeout_ms: u64,

    /// Output device name (None = default device)
    pub device: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            buffer_count: DEFAULT_BUFFER_COUNT,
            free_wait_ms: 100,
            stall_timeout_ms: 10_000,
            device: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// An explicitly given path must exist and parse. Without one, the
    /// platform config file (`<config dir>/streamplay/config.toml`) is used
    /// if present, otherwise compiled defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        if let Some(path) = Self::default_config_file() {
            if path.exists() {
                debug!("Loading config file: {}", path.display());
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Parse configuration from a TOML file
    fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Default configuration file path for the platform
    fn default_config_file() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("streamplay").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(Error::Config("buffer_capacity must be non-zero".to_string()));
        }
        if self.buffer_count == 0 {
            return Err(Error::Config("buffer_count must be at least 1".to_string()));
        }
        if self.free_wait_ms == 0 {
            return Err(Error::Config("free_wait_ms must be non-zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
        assert_eq!(config.buffer_count, DEFAULT_BUFFER_COUNT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = EngineConfig {
            buffer_capacity: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_count() {
        let config = EngineConfig {
            buffer_count: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str("buffer_count = 4").unwrap();
        assert_eq!(config.buffer_count, 4);
        assert_eq!(config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
    }
}
