//! Configuration management for lsr.
//!
//! Loads configuration from a TOML file; command-line flags override it.

use crate::manifest::DEFAULT_MANIFEST_NAME;
use crate::utils::errors::{LsrError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Manifest file name inside the scanned root
    pub manifest_name: String,

    /// Reuse previous digests when size and mtime are unchanged
    pub trust: bool,

    /// Follow symbolic links while walking
    pub follow_links: bool,

    /// What to do with entries that cannot be read
    pub on_walk_error: WalkErrorPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalkErrorPolicy {
    /// Fail the run
    #[default]
    Abort,
    /// Report the entry and keep its previous records
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            trust: false,
            follow_links: false,
            on_walk_error: WalkErrorPolicy::Abort,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// The manifest must be a plain file name directly under the root.
    pub fn validate(&self) -> Result<()> {
        let name = &self.scan.manifest_name;
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(LsrError::Config(format!(
                "manifest_name must be a plain file name, got {name:?}"
            )));
        }
        Ok(())
    }
}
