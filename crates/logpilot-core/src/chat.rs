//! Chat session against the answering service
//!
//! Keeps the ordered message history and allows one outstanding question
//! at a time. Every accepted question is also forwarded to a
//! [`QueryListener`] (the dashboard) regardless of how answering goes.

use crate::client::{ApiClient, EndpointConfig};
use crate::error::FetchError;
use crate::health::{components, HealthRegistry};
use crate::models::{BackendHealth, ChatMessage, QueryAnswer, QueryRequest};
use crate::observability::{EngineMetrics, StructuredLogger};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::debug;

/// Assistant text used when the service answers with nothing
pub const EMPTY_ANSWER_FALLBACK: &str = "No answer generated.";

/// Assistant text used when the service cannot be reached or fails
pub const SERVICE_FAILURE_MESSAGE: &str = "⚠️ Server took too long to respond or is offline.";

/// Failure kind recorded when a submission is dropped mid-answer
const CANCELED_KIND: &str = "canceled";

/// Remote service answering natural-language questions about logs
#[async_trait]
pub trait AnsweringService: Send + Sync {
    async fn answer(&self, query: &str) -> Result<QueryAnswer, FetchError>;
}

/// Observer of submitted questions
pub trait QueryListener: Send + Sync {
    fn query_received(&self, query: &str);
}

/// Answering service backed by the log backend's `/query` endpoint
pub struct HttpAnsweringClient {
    api: ApiClient,
    query_path: String,
    health_path: String,
}

impl HttpAnsweringClient {
    pub fn new(endpoints: &EndpointConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(&endpoints.base_url, endpoints.answer_timeout)?,
            query_path: endpoints.query_path.clone(),
            health_path: endpoints.health_path.clone(),
        })
    }

    /// Ask the backend whether it is alive
    pub async fn health(&self) -> Result<BackendHealth, FetchError> {
        self.api.get(&self.health_path).await
    }
}

#[async_trait]
impl AnsweringService for HttpAnsweringClient {
    async fn answer(&self, query: &str) -> Result<QueryAnswer, FetchError> {
        let request = QueryRequest {
            query: query.to_string(),
        };
        self.api.post(&self.query_path, &request).await
    }
}

/// Result of a [`ChatSession::submit`] call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Blank input; nothing happened
    Ignored,
    /// Another question is in flight; nothing happened
    Busy,
    /// The service answered; the answer (or the empty-answer fallback) was appended
    Answered {
        text: String,
        evidence: Vec<serde_json::Value>,
    },
    /// The service failed; the warning message was appended
    Failed { kind: &'static str },
}

impl SubmitOutcome {
    /// Whether the submission reached the answering service
    pub fn was_dispatched(&self) -> bool {
        matches!(self, SubmitOutcome::Answered { .. } | SubmitOutcome::Failed { .. })
    }
}

/// Holds the busy flag for one submission
///
/// Dropping the guard clears the flag. If the submission is canceled after
/// its question was recorded but before a reply was, the warning message is
/// appended so every question in the history has a reply.
struct BusyGuard<'a> {
    session: &'a ChatSession,
    awaiting_reply: bool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(session: &'a ChatSession) -> Option<Self> {
        session
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                session,
                awaiting_reply: false,
            })
    }

    /// Record the question; a reply is now owed
    fn ask(&mut self, query: &str) {
        self.session.append(ChatMessage::user(query));
        self.awaiting_reply = true;
    }

    /// Record the reply
    fn reply(&mut self, text: impl Into<String>) {
        self.session.append(ChatMessage::assistant(text));
        self.awaiting_reply = false;
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if self.awaiting_reply {
            self.session.logger.log_answer_failed(CANCELED_KIND, "submission dropped");
            self.session.metrics.inc_answer_failures(CANCELED_KIND);
            self.session
                .append(ChatMessage::assistant(SERVICE_FAILURE_MESSAGE));
        }
        self.session.busy.store(false, Ordering::Release);
    }
}

/// Ordered chat history with single-flight submission
pub struct ChatSession {
    service: Arc<dyn AnsweringService>,
    listener: Option<Arc<dyn QueryListener>>,
    health: Option<HealthRegistry>,
    messages: RwLock<Vec<ChatMessage>>,
    busy: AtomicBool,
    metrics: EngineMetrics,
    logger: StructuredLogger,
}

impl ChatSession {
    pub fn new(service: Arc<dyn AnsweringService>) -> Self {
        Self {
            service,
            listener: None,
            health: None,
            messages: RwLock::new(Vec::new()),
            busy: AtomicBool::new(false),
            metrics: EngineMetrics::new(),
            logger: StructuredLogger::new("chat"),
        }
    }

    /// Forward every accepted question to `listener`
    pub fn with_listener(mut self, listener: Arc<dyn QueryListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Report answering-service outcomes to a health registry
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Ask a question
    ///
    /// Blank input and input arriving while another question is in flight
    /// are ignored without touching the history or the service. Service
    /// failures never propagate: they become a warning message.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let query = text.trim();
        if query.is_empty() {
            return SubmitOutcome::Ignored;
        }

        let Some(mut guard) = BusyGuard::acquire(self) else {
            self.metrics.inc_queries_rejected();
            debug!("Rejected query while another is in flight");
            return SubmitOutcome::Busy;
        };

        guard.ask(query);
        self.metrics.inc_queries_submitted();

        if let Some(listener) = &self.listener {
            listener.query_received(query);
        }

        let start = Instant::now();
        let result = self.service.answer(query).await;
        self.metrics
            .observe_answer_latency(start.elapsed().as_secs_f64());

        match result {
            Ok(answer) => {
                let text = if answer.answer.trim().is_empty() {
                    EMPTY_ANSWER_FALLBACK.to_string()
                } else {
                    answer.answer
                };
                guard.reply(text.clone());
                self.record_health(Ok(())).await;

                SubmitOutcome::Answered {
                    text,
                    evidence: answer.evidence,
                }
            }
            Err(e) => {
                let kind = e.kind();
                self.logger.log_answer_failed(kind, &e.to_string());
                self.metrics.inc_answer_failures(kind);
                guard.reply(SERVICE_FAILURE_MESSAGE);
                self.record_health(Err(&e)).await;

                SubmitOutcome::Failed { kind }
            }
        }
    }

    /// Snapshot of the history
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.messages.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a question is awaiting its answer
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn append(&self, message: ChatMessage) {
        self.messages
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
    }

    async fn record_health(&self, outcome: Result<(), &FetchError>) {
        if let Some(health) = &self.health {
            health
                .record_call(components::ANSWERING_SERVICE, outcome)
                .await;
        }
    }
}
