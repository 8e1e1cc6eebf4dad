//! Configuration file support for the registry
//!
//! Loads and validates registry configuration from TOML:
//!
//! ```toml
//! [network]
//! vlan_pool = "100-199, 300"
//!
//! [fabric]
//! request_timeout_secs = 30
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::allocator::VlanPool;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid VLAN pool {pool:?}: {reason}")]
    InvalidPool { pool: String, reason: String },

    #[error("Configuration error: {0}")]
    Invalid(String),
}

/// Network identifier settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Comma-separated VLAN ids and ranges handed to new networks
    #[serde(default = "default_vlan_pool")]
    pub vlan_pool: String,
}

/// Switch transport settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricConfig {
    /// Per-request timeout; absent keeps the HTTP client default
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Complete registry configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub fabric: FabricConfig,
}

fn default_vlan_pool() -> String {
    "2-4094".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            vlan_pool: default_vlan_pool(),
        }
    }
}

impl RegistryConfig {
    /// Load and validate configuration from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.vlan_pool()?;

        if self.fabric.request_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the configured VLAN pool
    pub fn vlan_pool(&self) -> Result<VlanPool, ConfigError> {
        self.network.vlan_pool.parse()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Option<Duration> {
        self.fabric.request_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.network.vlan_pool, "2-4094");
        assert_eq!(config.fabric.request_timeout_secs, None);
        assert!(config.validate().is_ok());
        assert_eq!(config.vlan_pool().unwrap().capacity(), 4093);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = RegistryConfig::from_toml_str("[fabric]\nrequest_timeout_secs = 30\n").unwrap();
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.network, NetworkConfig::default());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            RegistryConfig::from_toml_str("[network]\nvlan_pool = \"1-10\"\n"),
            Err(ConfigError::InvalidPool { .. })
        ));
        assert!(matches!(
            RegistryConfig::from_toml_str("[fabric]\nrequest_timeout_secs = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RegistryConfig::from_toml_str("[network\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[network]\nvlan_pool = \"100-199, 300\"\n\n[fabric]\nrequest_timeout_secs = 5\n"
        )
        .unwrap();

        let config = RegistryConfig::load(file.path()).unwrap();
        assert_eq!(config.vlan_pool().unwrap().capacity(), 101);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = RegistryConfig::load(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
