//! Health tracking for the engine's external dependencies
//!
//! Each backend dependency is a named component whose status follows the
//! outcome of the latest call made to it. Liveness aggregates the worst
//! component status; readiness additionally requires a first statistics
//! snapshot.

use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Calls are failing in a way that may recover on its own
    Degraded,
    /// Calls are failing in a way retries will not fix
    Unhealthy,
}

impl ComponentStatus {
    /// Whether the engine can still serve with this status
    pub fn is_operational(&self) -> bool {
        *self != ComponentStatus::Unhealthy
    }
}

/// Latest known state of one component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Unix seconds of the last status change
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Unhealthy, Some(message.into()))
    }

    /// Status implied by the outcome of one backend call
    pub fn from_call(outcome: Result<(), &FetchError>) -> Self {
        match outcome {
            Ok(()) => Self::healthy(),
            Err(e) if e.is_transient() => Self::degraded(format!("{}: {}", e.kind(), e)),
            Err(e) => Self::unhealthy(format!("{}: {}", e.kind(), e)),
        }
    }
}

/// Body of the liveness endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status among the components; healthy when there are none
    pub fn compute_status(components: &BTreeMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Body of the readiness endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReadinessResponse {
    fn ready() -> Self {
        Self {
            ready: true,
            reason: None,
        }
    }

    fn not_ready(reason: &str) -> Self {
        Self {
            ready: false,
            reason: Some(reason.to_string()),
        }
    }
}

/// Component names for health tracking
pub mod components {
    pub const STATS_POLLER: &str = "stats_poller";
    pub const ANSWERING_SERVICE: &str = "answering_service";
}

#[derive(Debug, Default)]
struct RegistryState {
    components: BTreeMap<String, ComponentHealth>,
    ready: bool,
}

/// Shared, cloneable registry of component health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component as healthy
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    /// Replace a component's health, registering it if unknown
    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Record the outcome of a call to a backend dependency
    ///
    /// Transient failures degrade the component. Undecodable payloads and
    /// client errors mark it unhealthy.
    pub async fn record_call(&self, name: &str, outcome: Result<(), &FetchError>) {
        self.update(name, ComponentHealth::from_call(outcome)).await;
    }

    /// Mark whether the dashboard holds a statistics snapshot
    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.ready = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.state.read().await.components.clone();
        HealthResponse {
            status: HealthResponse::compute_status(&components),
            components,
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;

        if !state.ready {
            return ReadinessResponse::not_ready("No statistics snapshot loaded yet");
        }
        if HealthResponse::compute_status(&state.components) == ComponentStatus::Unhealthy {
            return ReadinessResponse::not_ready("A backend dependency is unhealthy");
        }
        ReadinessResponse::ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overloaded() -> FetchError {
        FetchError::Server {
            status: 503,
            body: "overloaded".to_string(),
        }
    }

    #[test]
    fn test_status_ordering_picks_worst() {
        let mut components = BTreeMap::new();
        assert_eq!(
            HealthResponse::compute_status(&components),
            ComponentStatus::Healthy
        );

        components.insert("a".to_string(), ComponentHealth::degraded("slow"));
        components.insert("b".to_string(), ComponentHealth::healthy());
        assert_eq!(
            HealthResponse::compute_status(&components),
            ComponentStatus::Degraded
        );

        components.insert("c".to_string(), ComponentHealth::unhealthy("down"));
        assert_eq!(
            HealthResponse::compute_status(&components),
            ComponentStatus::Unhealthy
        );
    }

    #[test]
    fn test_from_call_message_carries_kind() {
        let health = ComponentHealth::from_call(Err(&overloaded()));

        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(health.message.unwrap().starts_with("server: "));
        assert!(ComponentHealth::from_call(Ok(())).message.is_none());
    }

    #[tokio::test]
    async fn test_registered_components_start_healthy() {
        let registry = HealthRegistry::new();
        registry.register(components::STATS_POLLER).await;
        registry.register(components::ANSWERING_SERVICE).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(health.components.len(), 2);
    }

    #[tokio::test]
    async fn test_degraded_poller_keeps_engine_operational() {
        let registry = HealthRegistry::new();
        registry.register(components::ANSWERING_SERVICE).await;
        registry
            .set_degraded(components::STATS_POLLER, "transport failure")
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(health.status.is_operational());
    }

    #[tokio::test]
    async fn test_record_call_maps_failure_classes() {
        let registry = HealthRegistry::new();
        let parse: FetchError = serde_json::from_str::<u64>("{").unwrap_err().into();

        registry
            .record_call(components::STATS_POLLER, Err(&overloaded()))
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        registry.record_call(components::STATS_POLLER, Err(&parse)).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);

        registry.record_call(components::STATS_POLLER, Ok(())).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_readiness_waits_for_snapshot() {
        let registry = HealthRegistry::new();

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("No statistics snapshot loaded yet")
        );

        registry.set_ready(true).await;
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_readiness_lost_when_unhealthy() {
        let registry = HealthRegistry::new();
        registry.set_ready(true).await;

        registry
            .set_unhealthy(components::STATS_POLLER, "malformed payload")
            .await;

        assert!(!registry.readiness().await.ready);
    }
}
