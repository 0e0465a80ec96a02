//! Integration tests for the server API endpoints

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use logpilot_core::{
    chat::SERVICE_FAILURE_MESSAGE,
    health::{components, HealthRegistry},
    AnsweringService, ChatSession, DashboardController, DashboardControllerBuilder, FetchError,
    QueryAnswer, StatsSnapshot, StatsSource,
};
use logpilot_server::api::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tower::ServiceExt;

struct FixedStats;

#[async_trait]
impl StatsSource for FixedStats {
    async fn poll(&self) -> Result<StatsSnapshot, FetchError> {
        let mut snapshot = StatsSnapshot {
            auth_failure_count: 2,
            network_timeouts: 5,
            ..StatsSnapshot::default()
        };
        snapshot.severity_counts.insert("ERROR".to_string(), 9);
        snapshot.severity_counts.insert("INFO".to_string(), 30);
        Ok(snapshot)
    }
}

enum Reply {
    Answer(&'static str),
    Fail(u16),
}

struct StubAnswers {
    reply: Reply,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl StubAnswers {
    fn answering(text: &'static str) -> Self {
        Self {
            reply: Reply::Answer(text),
            gate: None,
        }
    }

    fn failing(status: u16) -> Self {
        Self {
            reply: Reply::Fail(status),
            gate: None,
        }
    }
}

#[async_trait]
impl AnsweringService for StubAnswers {
    async fn answer(&self, _query: &str) -> Result<QueryAnswer, FetchError> {
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        match self.reply {
            Reply::Answer(text) => Ok(QueryAnswer {
                answer: text.to_string(),
                evidence: vec![json!({"pod": "inference-1"})],
            }),
            Reply::Fail(status) => Err(FetchError::Server {
                status,
                body: "unavailable".to_string(),
            }),
        }
    }
}

struct TestApp {
    router: Router,
    health: HealthRegistry,
    dashboard: Arc<DashboardController>,
}

async fn setup_test_app(answers: StubAnswers) -> TestApp {
    let health = HealthRegistry::new();
    health.register(components::STATS_POLLER).await;
    health.register(components::ANSWERING_SERVICE).await;

    let dashboard = Arc::new(
        DashboardControllerBuilder::new()
            .source(Arc::new(FixedStats))
            .health(health.clone())
            .build()
            .unwrap(),
    );
    let chat = Arc::new(
        ChatSession::new(Arc::new(answers))
            .with_listener(dashboard.clone())
            .with_health(health.clone()),
    );

    let state = Arc::new(AppState::new(health.clone(), dashboard.clone(), chat));

    TestApp {
        router: create_router(state),
        health,
        dashboard,
    }
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

async fn post_chat(app: &Router, text: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "text": text }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let app = setup_test_app(StubAnswers::answering("ok")).await;

    let (status, health) = get(&app.router, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let app = setup_test_app(StubAnswers::answering("ok")).await;
    app.health
        .set_unhealthy(components::STATS_POLLER, "Malformed stats payload")
        .await;

    let (status, health) = get(&app.router, "/healthz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test(start_paused = true)]
async fn test_readyz_follows_first_snapshot() {
    let app = setup_test_app(StubAnswers::answering("ok")).await;

    let (status, readiness) = get(&app.router, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);

    app.dashboard.start();
    tokio::time::sleep(Duration::from_millis(1)).await;

    let (status, readiness) = get(&app.router, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test(start_paused = true)]
async fn test_dashboard_reports_loading_then_panels() {
    let app = setup_test_app(StubAnswers::answering("ok")).await;

    let (status, view) = get(&app.router, "/api/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["phase"], "loading");

    app.dashboard.start();
    tokio::time::sleep(Duration::from_millis(1)).await;

    let (_, view) = get(&app.router, "/api/dashboard").await;
    assert_eq!(view["phase"], "ready");
    assert_eq!(view["severity"]["labels"], json!(["ERROR", "INFO"]));
    assert_eq!(view["severity"]["values"], json!([9, 30]));
    assert_eq!(view["security"]["auth_failures"], 2);
    assert_eq!(view["security"]["network_timeouts"], 5);
}

#[tokio::test]
async fn test_chat_answer_highlights_dashboard() {
    let app = setup_test_app(StubAnswers::answering("Pod inference-1 timed out twice.")).await;

    let (status, reply) = post_chat(&app.router, "  why are pods timing out  ").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["outcome"], "answered");
    assert_eq!(reply["text"], "Pod inference-1 timed out twice.");
    assert_eq!(reply["evidence"].as_array().unwrap().len(), 1);
    assert_eq!(reply["messages"][0]["role"], "user");
    assert_eq!(reply["messages"][0]["text"], "why are pods timing out");
    assert_eq!(reply["messages"][1]["role"], "assistant");

    let (_, view) = get(&app.router, "/api/dashboard").await;
    assert_eq!(view["highlights"]["pods"], true);
    assert_eq!(view["highlights"]["security"], true);
    assert_eq!(view["highlights"]["severity"], false);
}

#[tokio::test]
async fn test_blank_chat_is_ignored() {
    let app = setup_test_app(StubAnswers::answering("unused")).await;

    let (status, reply) = post_chat(&app.router, "   ").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["outcome"], "ignored");
    assert_eq!(reply["messages"], json!([]));
}

#[tokio::test]
async fn test_chat_failure_appends_warning() {
    let app = setup_test_app(StubAnswers::failing(503)).await;

    let (status, reply) = post_chat(&app.router, "auth errors today").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["outcome"], "failed");
    assert_eq!(reply["kind"], "server");
    assert_eq!(reply["messages"][1]["text"], SERVICE_FAILURE_MESSAGE);

    let (_, health) = get(&app.router, "/healthz").await;
    assert_eq!(
        health["components"][components::ANSWERING_SERVICE]["status"],
        "degraded"
    );
}

#[tokio::test]
async fn test_second_chat_while_busy_is_rejected() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let answers = StubAnswers {
        reply: Reply::Answer("done"),
        gate: Some((entered.clone(), release.clone())),
    };
    let app = setup_test_app(answers).await;

    let router = app.router.clone();
    let first = tokio::spawn(async move { post_chat(&router, "pod latency").await });
    entered.notified().await;

    let (status, reply) = post_chat(&app.router, "error trend").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(reply["outcome"], "busy");

    let (_, history) = get(&app.router, "/api/chat/messages").await;
    assert_eq!(history["busy"], true);
    assert_eq!(history["messages"].as_array().unwrap().len(), 1);

    release.notify_one();
    let (status, reply) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["outcome"], "answered");
    assert_eq!(reply["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_engine_metrics() {
    let app = setup_test_app(StubAnswers::answering("ok")).await;
    post_chat(&app.router, "component load").await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("logpilot_queries_submitted_total"));
}
