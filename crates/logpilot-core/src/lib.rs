//! Dashboard correlation-and-refresh engine for LogPilot
//!
//! This crate provides the core functionality for:
//! - Periodic refresh of aggregate log statistics
//! - Classification of chat questions into relevant dashboard panels
//! - Timed decay of panel highlights
//! - A single-flight chat session against the answering service
//! - Health checks and observability

pub mod chat;
pub mod classifier;
pub mod client;
pub mod dashboard;
pub mod decay;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod stats;

pub use chat::{AnsweringService, ChatSession, HttpAnsweringClient, QueryListener, SubmitOutcome};
pub use client::EndpointConfig;
pub use dashboard::{DashboardConfig, DashboardController, DashboardControllerBuilder, DashboardView};
pub use error::FetchError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use stats::{HttpStatsClient, StatsSource};
