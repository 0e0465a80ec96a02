//! HTTP API for the dashboard, the chat session, health checks and metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use logpilot_core::{
    health::{ComponentStatus, HealthRegistry},
    ChatMessage, ChatSession, DashboardController, SubmitOutcome,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub dashboard: Arc<DashboardController>,
    pub chat: Arc<ChatSession>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        dashboard: Arc<DashboardController>,
        chat: Arc<ChatSession>,
    ) -> Self {
        Self {
            health_registry,
            dashboard,
            chat,
        }
    }
}

/// Body of `POST /api/chat`
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub text: String,
}

/// Reply of `POST /api/chat`
#[derive(Debug, Serialize)]
pub struct ChatReply {
    #[serde(flatten)]
    pub outcome: SubmitOutcome,
    pub messages: Vec<ChatMessage>,
}

/// History of the chat session
#[derive(Debug, Serialize)]
pub struct ChatHistory {
    pub busy: bool,
    pub messages: Vec<ChatMessage>,
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - 200 once the dashboard holds statistics
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Current dashboard view with every chart model
async fn dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.dashboard.view().panels())
}

async fn chat_messages(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ChatHistory {
        busy: state.chat.is_busy(),
        messages: state.chat.messages(),
    })
}

/// Submit a question; 409 while another question is in flight
async fn submit_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    let outcome = state.chat.submit(&request.text).await;

    let status_code = match outcome {
        SubmitOutcome::Busy => StatusCode::CONFLICT,
        _ => StatusCode::OK,
    };

    let reply = ChatReply {
        outcome,
        messages: state.chat.messages(),
    };

    (status_code, Json(reply))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/dashboard", get(dashboard))
        .route("/api/chat/messages", get(chat_messages))
        .route("/api/chat", axum::routing::post(submit_chat))
        .with_state(state)
}

/// Start the API server, stopping when `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
