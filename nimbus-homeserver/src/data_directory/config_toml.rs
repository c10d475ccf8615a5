//! Configuration file for the homeserver.
//!
//! All default values live in `config.default.toml`, which is embedded at compile time.
//! A user supplied file only has to contain the values it wants to change; it is deep
//! merged on top of the defaults before deserialization.

use super::log_level::{LogLevel, TargetLevel};
use crate::shared::toml_merge;
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Embedded copy of the default configuration (single source of truth for defaults)
pub const DEFAULT_CONFIG: &str = include_str!("config.default.toml");

/// Error that can occur when reading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigReadError {
    /// The file did not exist or could not be read.
    #[error("config file not found: {0}")]
    ConfigFileNotFound(#[from] std::io::Error),
    /// The TOML was syntactically invalid.
    #[error("config file is not valid TOML: {0}")]
    ConfigFileNotValid(#[from] toml::de::Error),
    /// Failed to merge defaults with overrides.
    #[error("failed to merge embedded and user TOML: {0}")]
    ConfigMergeError(String),
}

/// `[general]` section.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct GeneralToml {
    /// Per tenant storage quota in megabytes. 0 disables enforcement.
    pub storage_quota_mb: u64,
}

/// `[storage]` section.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StorageToml {
    /// Storage root. Relative paths are resolved against the data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Deepest directory level walked by search, quota and recursive copy.
    pub max_traversal_depth: usize,
}

/// `[dav]` section.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DavToml {
    /// Listen socket of the WebDAV gateway.
    pub listen_socket: SocketAddr,
    /// Largest accepted request body in megabytes.
    pub max_body_mb: u64,
}

/// `[logging]` section.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LoggingToml {
    /// Default level for every target.
    pub level: LogLevel,
    /// `target=level` overrides.
    #[serde(default)]
    pub module_levels: Vec<TargetLevel>,
}

/// The overall application configuration, composed of several subsections.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConfigToml {
    /// Quota settings.
    pub general: GeneralToml,
    /// Where and how tenant data is stored.
    pub storage: StorageToml,
    /// WebDAV gateway settings.
    pub dav: DavToml,
    /// Log filter settings. Tracing is left uninitialized when absent.
    #[serde(default)]
    pub logging: Option<LoggingToml>,
}

impl Default for ConfigToml {
    fn default() -> Self {
        ConfigToml::from_str(DEFAULT_CONFIG).expect("Embedded config.default.toml must be valid")
    }
}

impl ConfigToml {
    /// Read and parse a configuration file, overlaying it on top of the embedded defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigReadError> {
        let raw = fs::read_to_string(path)?;
        Self::from_str_with_defaults(&raw)
    }

    /// Parse a raw TOML string, overlaying it on top of the embedded defaults.
    pub fn from_str_with_defaults(raw: &str) -> Result<Self, ConfigReadError> {
        let defaults: toml::Value = DEFAULT_CONFIG.parse()?;
        let overrides: toml::Value = raw.parse()?;
        let merged = toml_merge::merge(defaults, overrides)
            .map_err(|e| ConfigReadError::ConfigMergeError(e.to_string()))?;
        Ok(merged.try_into()?)
    }

    /// The default config with every value commented out.
    ///
    /// Written to new data directories so users see what can be tuned.
    pub fn default_string() -> String {
        DEFAULT_CONFIG
            .lines()
            .map(|line| {
                let trimmed = line.trim_start();
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
                    line.to_string()
                } else {
                    format!("# {line}")
                }
            })
            .collect::<Vec<String>>()
            .join("\n")
    }

    /// Per tenant quota in bytes. `None` when unlimited.
    pub fn storage_quota_bytes(&self) -> Option<u64> {
        match self.general.storage_quota_mb {
            0 => None,
            mb => Some(mb * 1024 * 1024),
        }
    }

    /// Storage root resolved against `data_dir`.
    pub fn storage_root(&self, data_dir: &Path) -> PathBuf {
        match &self.storage.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => data_dir.join(root),
            None => data_dir.join("storage"),
        }
    }

    /// Returns a default config tuned for unit tests.
    pub fn test() -> Self {
        let mut config = Self::default();
        // Ephemeral port so parallel tests don't collide.
        config.dav.listen_socket = SocketAddr::from(([127, 0, 0, 1], 0));
        config.logging = None;
        config
    }
}

impl FromStr for ConfigToml {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}
