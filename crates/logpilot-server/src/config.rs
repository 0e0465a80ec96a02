//! Server configuration

use anyhow::{Context, Result};
use logpilot_core::{DashboardConfig, EndpointConfig};
use serde::Deserialize;
use std::time::Duration;

/// Server configuration
///
/// Read from an optional `logpilot.toml` in the working directory, then
/// overridden by `LOGPILOT_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Instance name attached to structured log records
    #[serde(default = "default_instance")]
    pub instance: String,

    /// Port of the dashboard API and health/metrics endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Base URL of the log backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Stats endpoint path relative to the backend URL
    #[serde(default = "default_stats_path")]
    pub stats_path: String,

    /// Stats poll cadence in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Highlight decay window in milliseconds
    #[serde(default = "default_decay_window_ms")]
    pub decay_window_ms: u64,

    /// Timeout of a single answer in seconds
    #[serde(default = "default_answer_timeout_secs")]
    pub answer_timeout_secs: u64,
}

fn default_instance() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "logpilot".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_backend_url() -> String {
    EndpointConfig::default().base_url
}

fn default_stats_path() -> String {
    EndpointConfig::default().stats_path
}

fn default_poll_interval_ms() -> u64 {
    DashboardConfig::default().poll_interval.as_millis() as u64
}

fn default_decay_window_ms() -> u64 {
    DashboardConfig::default().decay_window.as_millis() as u64
}

fn default_answer_timeout_secs() -> u64 {
    EndpointConfig::default().answer_timeout.as_secs()
}

impl ServerConfig {
    /// Load configuration from `logpilot.toml` and the environment
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("logpilot").required(false))
            .add_source(config::Environment::with_prefix("LOGPILOT").try_parsing(true));

        Self::from_builder(builder)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let config: Self = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than zero");
        }
        url::Url::parse(&self.backend_url)
            .with_context(|| format!("Invalid backend_url: {}", self.backend_url))?;
        Ok(())
    }

    /// Backend endpoints derived from this configuration
    pub fn endpoints(&self) -> EndpointConfig {
        EndpointConfig {
            base_url: self.backend_url.clone(),
            stats_path: self.stats_path.clone(),
            answer_timeout: Duration::from_secs(self.answer_timeout_secs),
            ..EndpointConfig::default()
        }
    }

    /// Dashboard timing derived from this configuration
    pub fn dashboard(&self) -> DashboardConfig {
        DashboardConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            decay_window: Duration::from_millis(self.decay_window_ms),
        }
    }
}
