//! Runtime configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! max_render_passes = 25
//!
//! [debounce]
//! default_delay_ms = 300
//!
//! [fetch]
//! timeout_ms = 10000
//!
//! [storage]
//! key_prefix = "app:"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings shared by an instance and the hooks rendered inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Upper bound on consecutive passes in one `Instance::flush`.
    #[serde(default = "default_max_render_passes")]
    pub max_render_passes: usize,

    #[serde(default)]
    pub debounce: DebounceConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Delay used by `use_debounce_default`.
    #[serde(default = "default_debounce_delay_ms")]
    pub default_delay_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout for `use_fetch`. No timeout when absent.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Prefix prepended to every persisted-state key.
    #[serde(default)]
    pub key_prefix: String,
}

fn default_max_render_passes() -> usize {
    25
}

fn default_debounce_delay_ms() -> u64 {
    300
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_render_passes: default_max_render_passes(),
            debounce: DebounceConfig::default(),
            fetch: FetchConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            default_delay_ms: default_debounce_delay_ms(),
        }
    }
}

impl RuntimeConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_render_passes == 0 {
            return Err(ConfigError::Invalid(
                "max_render_passes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce.default_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch.timeout_ms.map(Duration::from_millis)
    }

    /// Apply the storage prefix to a key.
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.storage.key_prefix, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.debounce_delay(), Duration::from_millis(300));
        assert_eq!(config.fetch_timeout(), None);
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [fetch]
            timeout_ms = 1500

            [storage]
            key_prefix = "app:"
            "#,
        )
        .unwrap();

        assert_eq!(config.max_render_passes, 25);
        assert_eq!(config.fetch_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.storage_key("theme"), "app:theme");
    }

    #[test]
    fn zero_render_passes_is_rejected() {
        let err = RuntimeConfig::from_toml_str("max_render_passes = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = RuntimeConfig::from_toml_str("max_render_passes = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_missing_file() {
        let err = RuntimeConfig::load_from(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
