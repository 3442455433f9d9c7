//! Store configuration
//!
//! A JSON file with per-field defaults; `{}` is a valid configuration.
//!
//! ```json
//! {
//!   "compression_level": 0,
//!   "atomic_writes": false,
//!   "fixed_text_max_bytes": 64,
//!   "fixed_text_ragged_ratio": 2.0,
//!   "attrs": "all",
//!   "log_level": "warn"
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;
use crate::resolve::ResolverSettings;
use crate::tree::{AttrPolicy, WriteOptions};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io(_) => "TREESTORE_CONFIG_IO",
            ConfigError::Parse(_) => "TREESTORE_CONFIG_PARSE",
            ConfigError::Invalid(_) => "TREESTORE_CONFIG_INVALID",
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Compression level recorded on every leaf (0..=9)
    #[serde(default)]
    pub compression_level: u8,

    /// Stage every write and rename it into place
    #[serde(default)]
    pub atomic_writes: bool,

    #[serde(default = "default_fixed_text_max_bytes")]
    pub fixed_text_max_bytes: usize,

    #[serde(default = "default_fixed_text_ragged_ratio")]
    pub fixed_text_ragged_ratio: f64,

    /// Default attribute policy for reads: `all`, `none`, `a,b` or `-a,-b`
    #[serde(default = "default_attrs")]
    pub attrs: String,

    /// Minimum log severity: trace, info, warn or error
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_fixed_text_max_bytes() -> usize {
    ResolverSettings::default().fixed_text_max_bytes
}

fn default_fixed_text_ragged_ratio() -> f64 {
    ResolverSettings::default().fixed_text_ragged_ratio
}

fn default_attrs() -> String {
    "all".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compression_level: 0,
            atomic_writes: false,
            fixed_text_max_bytes: default_fixed_text_max_bytes(),
            fixed_text_ragged_ratio: default_fixed_text_ragged_ratio(),
            attrs: default_attrs(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.compression_level > 9 {
            return Err(ConfigError::Invalid(format!(
                "compression_level {} is outside 0..=9",
                self.compression_level
            )));
        }
        if self.fixed_text_max_bytes == 0 {
            return Err(ConfigError::Invalid(
                "fixed_text_max_bytes must be positive".to_string(),
            ));
        }
        if !(self.fixed_text_ragged_ratio >= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "fixed_text_ragged_ratio {} is below 1.0",
                self.fixed_text_ragged_ratio
            )));
        }
        self.severity()?;
        self.attr_policy()?;
        Ok(())
    }

    pub fn severity(&self) -> ConfigResult<Severity> {
        self.log_level.parse().map_err(ConfigError::Invalid)
    }

    pub fn attr_policy(&self) -> ConfigResult<AttrPolicy> {
        self.attrs
            .parse()
            .map_err(|e: crate::tree::TreeError| ConfigError::Invalid(format!("attrs: {}", e)))
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            fixed_text_max_bytes: self.fixed_text_max_bytes,
            fixed_text_ragged_ratio: self.fixed_text_ragged_ratio,
        }
    }

    /// Write options with no overrides
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions::new()
            .with_compression(self.compression_level)
            .with_atomic(self.atomic_writes)
            .with_settings(self.resolver_settings())
    }
}
