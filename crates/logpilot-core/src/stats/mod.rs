//! Aggregate statistics retrieval
//!
//! This module provides the stats source abstraction, its HTTP
//! implementation against the log backend, and the polling loop that
//! feeds snapshots into the dashboard.

mod poller;

pub use poller::{PollConfig, PollHandle, SnapshotSink, StatsPoller, DEFAULT_POLL_INTERVAL};

use crate::client::{ApiClient, EndpointConfig};
use crate::error::FetchError;
use crate::models::StatsSnapshot;
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Source of aggregate statistics snapshots
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Fetch one snapshot
    ///
    /// Failures are returned as values; implementations never panic across
    /// this boundary.
    async fn poll(&self) -> Result<StatsSnapshot, FetchError>;
}

/// Stats source backed by the log backend's HTTP stats endpoint
pub struct HttpStatsClient {
    api: ApiClient,
    path: String,
}

impl HttpStatsClient {
    pub fn new(endpoints: &EndpointConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(&endpoints.base_url, endpoints.stats_timeout)?,
            path: endpoints.stats_path.clone(),
        })
    }
}

#[async_trait]
impl StatsSource for HttpStatsClient {
    async fn poll(&self) -> Result<StatsSnapshot, FetchError> {
        match self.api.get::<StatsSnapshot>(&self.path).await {
            Ok(snapshot) => {
                debug!(
                    pods = snapshot.pod_performance.len(),
                    timeline_points = snapshot.timeline.len(),
                    "Fetched statistics snapshot"
                );
                Ok(snapshot)
            }
            Err(e) => {
                warn!(
                    kind = e.kind(),
                    error = %e,
                    base_url = %self.api.base_url(),
                    "Stats fetch failed"
                );
                Err(e)
            }
        }
    }
}
