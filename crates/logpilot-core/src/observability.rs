//! Observability infrastructure for the dashboard engine
//!
//! Provides:
//! - Prometheus metrics (poll outcomes and latency, query traffic, answer failures, highlights)
//! - Structured JSON logging with tracing

use crate::models::{HighlightFlags, StatsSnapshot};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for stats fetch latency (in seconds)
const POLL_LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Histogram buckets for answer latency (in seconds); answers may take minutes
const ANSWER_LATENCY_BUCKETS: &[f64] = &[0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 180.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct EngineMetricsInner {
    stats_polls: IntCounterVec,
    stats_poll_latency_seconds: Histogram,
    dashboard_ready: IntGauge,
    queries_submitted: IntCounter,
    queries_rejected: IntCounter,
    answer_failures: IntCounterVec,
    answer_latency_seconds: Histogram,
    highlight_resets: IntCounter,
    active_highlights: IntGauge,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            stats_polls: register_int_counter_vec!(
                "logpilot_stats_polls_total",
                "Stats polls by outcome",
                &["outcome"]
            )
            .expect("Failed to register stats_polls"),

            stats_poll_latency_seconds: register_histogram!(
                "logpilot_stats_poll_latency_seconds",
                "Time spent fetching aggregate statistics",
                POLL_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register stats_poll_latency_seconds"),

            dashboard_ready: register_int_gauge!(
                "logpilot_dashboard_ready",
                "Whether the dashboard holds a statistics snapshot"
            )
            .expect("Failed to register dashboard_ready"),

            queries_submitted: register_int_counter!(
                "logpilot_queries_submitted_total",
                "Chat queries accepted for answering"
            )
            .expect("Failed to register queries_submitted"),

            queries_rejected: register_int_counter!(
                "logpilot_queries_rejected_total",
                "Chat queries rejected because another query was in flight"
            )
            .expect("Failed to register queries_rejected"),

            answer_failures: register_int_counter_vec!(
                "logpilot_answer_failures_total",
                "Failed calls to the answering service by failure kind",
                &["kind"]
            )
            .expect("Failed to register answer_failures"),

            answer_latency_seconds: register_histogram!(
                "logpilot_answer_latency_seconds",
                "Time spent waiting for the answering service",
                ANSWER_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register answer_latency_seconds"),

            highlight_resets: register_int_counter!(
                "logpilot_highlight_resets_total",
                "Highlight sets cleared by the decay timer"
            )
            .expect("Failed to register highlight_resets"),

            active_highlights: register_int_gauge!(
                "logpilot_active_highlights",
                "Number of dashboard panels currently highlighted"
            )
            .expect("Failed to register active_highlights"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    /// Record the outcome and latency of one stats poll
    pub fn observe_poll(&self, outcome: &str, duration_secs: f64) {
        let inner = self.inner();
        inner.stats_polls.with_label_values(&[outcome]).inc();
        inner.stats_poll_latency_seconds.observe(duration_secs);
    }

    pub fn set_dashboard_ready(&self, ready: bool) {
        self.inner().dashboard_ready.set(i64::from(ready));
    }

    pub fn inc_queries_submitted(&self) {
        self.inner().queries_submitted.inc();
    }

    pub fn inc_queries_rejected(&self) {
        self.inner().queries_rejected.inc();
    }

    pub fn inc_answer_failures(&self, kind: &str) {
        self.inner().answer_failures.with_label_values(&[kind]).inc();
    }

    pub fn observe_answer_latency(&self, duration_secs: f64) {
        self.inner().answer_latency_seconds.observe(duration_secs);
    }

    pub fn inc_highlight_resets(&self) {
        self.inner().highlight_resets.inc();
    }

    pub fn set_active_highlights(&self, count: usize) {
        self.inner().active_highlights.set(count as i64);
    }
}

/// Structured logger for engine events
///
/// Provides consistent JSON-formatted logging for snapshots, highlights,
/// answers and lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a classified query and the panels it lights
    pub fn log_query_classified(&self, query_len: usize, flags: &HighlightFlags) {
        info!(
            event = "query_classified",
            instance = %self.instance,
            query_len = query_len,
            severity = flags.severity,
            timeline = flags.timeline,
            pods = flags.pods,
            components = flags.components,
            security = flags.security,
            "Highlighted dashboard panels for query"
        );
    }

    /// Log a freshly applied statistics snapshot
    pub fn log_snapshot_applied(&self, snapshot: &StatsSnapshot, first: bool) {
        info!(
            event = "snapshot_applied",
            instance = %self.instance,
            first = first,
            severities = snapshot.severity_counts.len(),
            timeline_points = snapshot.timeline.len(),
            pods = snapshot.pod_performance.len(),
            components = snapshot.errors_by_component.len(),
            auth_fails = snapshot.auth_failure_count,
            network_timeouts = snapshot.network_timeouts,
            "Applied statistics snapshot"
        );
    }

    /// Log the decay of a highlight set
    pub fn log_highlights_decayed(&self, cleared: usize) {
        info!(
            event = "highlights_decayed",
            instance = %self.instance,
            cleared = cleared,
            "Cleared dashboard highlights"
        );
    }

    /// Log a failed call to the answering service
    pub fn log_answer_failed(&self, kind: &str, error: &str) {
        warn!(
            event = "answer_failed",
            instance = %self.instance,
            kind = %kind,
            error = %error,
            "Answering service call failed, showing fallback message"
        );
    }

    /// Log engine startup
    pub fn log_startup(&self, version: &str, backend_url: &str) {
        info!(
            event = "engine_started",
            instance = %self.instance,
            version = %version,
            backend_url = %backend_url,
            "LogPilot engine started"
        );
    }

    /// Log engine shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "engine_shutdown",
            instance = %self.instance,
            reason = %reason,
            "LogPilot engine shutting down"
        );
    }
}
