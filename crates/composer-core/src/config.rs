//! Session configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration load failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid config TOML
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Offending key
        field: &'static str,
        /// What is wrong
        reason: &'static str,
    },
}

/// Composer session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Baselines kept in the cache
    pub baseline_cache_capacity: u64,
    /// Seconds before a cached baseline is refetched
    pub baseline_ttl_secs: u64,
    /// Run the navigation validator before discarding a job's drafts
    pub validate_before_discard: bool,
    /// Default `tracing` filter for the binary
    pub log_filter: String,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            baseline_cache_capacity: 64,
            baseline_ttl_secs: 300,
            validate_before_discard: true,
            log_filter: "info".to_string(),
        }
    }
}

impl ComposerConfig {
    /// Default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML; missing keys take defaults
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` or `ConfigError::Invalid`
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`Self::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` for a zero cache capacity or TTL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baseline_cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "baseline_cache_capacity",
                reason: "must be at least 1",
            });
        }
        if self.baseline_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "baseline_ttl_secs",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.baseline_cache_capacity = capacity;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_ttl_secs(mut self, secs: u64) -> Self {
        self.baseline_ttl_secs = secs;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_validate_before_discard(mut self, enabled: bool) -> Self {
        self.validate_before_discard = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Cache TTL as a duration
    #[inline]
    #[must_use]
    pub fn baseline_ttl(&self) -> Duration {
        Duration::from_secs(self.baseline_ttl_secs)
    }
}
