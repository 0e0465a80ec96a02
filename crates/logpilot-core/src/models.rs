//! Core data models for the log dashboard and chat session
//!
//! Wire names follow the stats and answering services. Every snapshot field is
//! optional on the wire: an absent or `null` field decodes to its empty value.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Aggregate log statistics returned by the stats service
///
/// A snapshot is immutable once decoded and is replaced wholesale on every
/// successful poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Log line count per severity label (`ERROR`, `WARN`, ...)
    #[serde(default, deserialize_with = "null_as_default")]
    pub severity_counts: BTreeMap<String, u64>,
    /// Hourly error counts, ordered by timestamp
    #[serde(default, deserialize_with = "null_as_default")]
    pub timeline: Vec<TimelinePoint>,
    /// Latency and timeout figures per pod
    #[serde(default, deserialize_with = "lenient_map")]
    pub pod_performance: BTreeMap<String, PodPerformance>,
    /// Error count per component
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors_by_component: BTreeMap<String, u64>,
    #[serde(
        default,
        rename = "auth_fails",
        alias = "auth_failure_count",
        deserialize_with = "null_as_default"
    )]
    pub auth_failure_count: u64,
    #[serde(
        default,
        alias = "network_timeout_count",
        deserialize_with = "null_as_default"
    )]
    pub network_timeouts: u64,
}

/// One bucket of the error timeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(
        default,
        rename = "errors",
        alias = "error_count",
        deserialize_with = "null_as_default"
    )]
    pub error_count: u64,
}

/// Performance figures for a single pod
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PodPerformance {
    #[serde(default, deserialize_with = "null_as_default")]
    pub latency_avg_ms: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timeouts: u64,
}

/// Dashboard panels a query can be relevant to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Severity,
    Timeline,
    Pods,
    Components,
    Security,
}

impl Topic {
    pub const ALL: [Topic; 5] = [
        Topic::Severity,
        Topic::Timeline,
        Topic::Pods,
        Topic::Components,
        Topic::Security,
    ];

    /// Panel title shown by front-ends
    pub fn title(&self) -> &'static str {
        match self {
            Topic::Severity => "Severity Breakdown",
            Topic::Timeline => "Error Timeline (hrs)",
            Topic::Pods => "Pod Performance",
            Topic::Components => "Error Distribution by Component",
            Topic::Security => "Security Anomalies",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Severity => write!(f, "severity"),
            Topic::Timeline => write!(f, "timeline"),
            Topic::Pods => write!(f, "pods"),
            Topic::Components => write!(f, "components"),
            Topic::Security => write!(f, "security"),
        }
    }
}

/// Which dashboard panels are relevant to the most recent query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightFlags {
    pub severity: bool,
    pub timeline: bool,
    pub pods: bool,
    pub components: bool,
    pub security: bool,
}

impl HighlightFlags {
    /// All five flags cleared
    pub const NONE: HighlightFlags = HighlightFlags {
        severity: false,
        timeline: false,
        pods: false,
        components: false,
        security: false,
    };

    pub fn get(&self, topic: Topic) -> bool {
        match topic {
            Topic::Severity => self.severity,
            Topic::Timeline => self.timeline,
            Topic::Pods => self.pods,
            Topic::Components => self.components,
            Topic::Security => self.security,
        }
    }

    pub fn set(&mut self, topic: Topic, value: bool) {
        match topic {
            Topic::Severity => self.severity = value,
            Topic::Timeline => self.timeline = value,
            Topic::Pods => self.pods = value,
            Topic::Components => self.components = value,
            Topic::Security => self.security = value,
        }
    }

    pub fn any(&self) -> bool {
        Topic::ALL.iter().any(|t| self.get(*t))
    }

    pub fn count(&self) -> usize {
        Topic::ALL.iter().filter(|t| self.get(**t)).count()
    }

    /// Highlighted topics in panel order
    pub fn active(&self) -> Vec<Topic> {
        Topic::ALL.into_iter().filter(|t| self.get(*t)).collect()
    }
}

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single entry of the chat history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Request body for the answering service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Response body of the answering service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryAnswer {
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub evidence: Vec<serde_json::Value>,
}

/// Liveness report of the backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendHealth {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_map<'de, D, V>(deserializer: D) -> Result<BTreeMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de> + Default,
{
    let raw: Option<BTreeMap<String, Option<V>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.unwrap_or_default()))
        .collect())
}
