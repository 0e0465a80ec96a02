//! Configuration management for the CLI

use anyhow::{Context, Result};
use logpilot_core::EndpointConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration stored at `~/.config/logpilot/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend URL used when neither `--api-url` nor `LOGPILOT_API_URL` is set
    pub api_url: Option<String>,
    /// Default stats poll interval for `lp watch` and `lp chat`
    pub poll_interval_ms: Option<u64>,
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file or home directory yields the default configuration.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Backend URL: explicit flag or env first, then the file, then the default
    pub fn resolve_api_url(&self, explicit: Option<String>) -> String {
        explicit
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| EndpointConfig::default().base_url)
    }

    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("logpilot").join("config.json"))
    }
}
