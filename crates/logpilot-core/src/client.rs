//! HTTP plumbing shared by the stats and answering clients

use crate::error::FetchError;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use url::Url;

/// Endpoint configuration for the log backend
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Base URL of the backend (e.g. "http://127.0.0.1:6969")
    pub base_url: String,
    /// Path of the aggregate statistics endpoint
    pub stats_path: String,
    /// Path of the question answering endpoint
    pub query_path: String,
    /// Path of the backend liveness endpoint
    pub health_path: String,
    /// Timeout for a single stats fetch
    pub stats_timeout: Duration,
    /// Timeout for a single answer; language models can be slow
    pub answer_timeout: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:6969".to_string(),
            stats_path: "api/stats".to_string(),
            query_path: "query".to_string(),
            health_path: "health".to_string(),
            stats_timeout: Duration::from_secs(10),
            answer_timeout: Duration::from_secs(180),
        }
    }
}

impl EndpointConfig {
    /// Default paths and timeouts against the given base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// Thin JSON client bound to one base URL and one request timeout
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = normalize_base(base_url)?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = self.base_url.join(path)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::Transport)?;

        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, FetchError> {
        let url = self.base_url.join(path)?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(FetchError::Transport)?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FetchError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(FetchError::Transport)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Parse a base URL, making sure relative joins keep its path prefix
fn normalize_base(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).context("Invalid API URL")?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
