//! Read-only view models derived from dashboard state

use crate::models::{HighlightFlags, StatsSnapshot, Topic};
use serde::Serialize;
use std::sync::Arc;

/// Lifecycle phase of the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No snapshot received yet
    Loading,
    /// A snapshot is available
    Ready,
}

/// Immutable picture of the dashboard published to observers
#[derive(Debug, Clone)]
pub struct DashboardView {
    /// Monotonic publication counter
    pub version: u64,
    pub snapshot: Option<Arc<StatsSnapshot>>,
    pub highlights: HighlightFlags,
}

impl Default for DashboardView {
    fn default() -> Self {
        Self {
            version: 0,
            snapshot: None,
            highlights: HighlightFlags::NONE,
        }
    }
}

impl DashboardView {
    pub fn phase(&self) -> Phase {
        if self.snapshot.is_some() {
            Phase::Ready
        } else {
            Phase::Loading
        }
    }

    pub fn is_highlighted(&self, topic: Topic) -> bool {
        self.highlights.get(topic)
    }

    /// Severity breakdown (pie chart)
    pub fn severity_chart(&self) -> ChartSeries {
        self.snapshot
            .as_deref()
            .map(|s| ChartSeries::from_counts(s.severity_counts.iter()))
            .unwrap_or_default()
    }

    /// Error count per hour (line chart)
    pub fn timeline_chart(&self) -> ChartSeries {
        let Some(snapshot) = self.snapshot.as_deref() else {
            return ChartSeries::default();
        };

        ChartSeries {
            labels: snapshot
                .timeline
                .iter()
                .map(|p| timeline_label(&p.timestamp).to_string())
                .collect(),
            values: snapshot.timeline.iter().map(|p| p.error_count).collect(),
        }
    }

    /// Latency and timeouts per pod (grouped bar chart)
    pub fn pod_chart(&self) -> PodChart {
        let Some(snapshot) = self.snapshot.as_deref() else {
            return PodChart::default();
        };

        let mut chart = PodChart::default();
        for (name, perf) in &snapshot.pod_performance {
            chart.names.push(name.clone());
            chart.latency_ms.push(perf.latency_avg_ms);
            chart.timeouts.push(perf.timeouts);
        }
        chart
    }

    /// Errors per component (bar chart)
    pub fn component_chart(&self) -> ChartSeries {
        self.snapshot
            .as_deref()
            .map(|s| ChartSeries::from_counts(s.errors_by_component.iter()))
            .unwrap_or_default()
    }

    pub fn security_panel(&self) -> SecurityPanel {
        self.snapshot
            .as_deref()
            .map(|s| SecurityPanel {
                auth_failures: s.auth_failure_count,
                network_timeouts: s.network_timeouts,
            })
            .unwrap_or_default()
    }

    /// Every panel in one serializable value
    pub fn panels(&self) -> DashboardPanels {
        DashboardPanels {
            phase: self.phase(),
            version: self.version,
            highlights: self.highlights,
            severity: self.severity_chart(),
            timeline: self.timeline_chart(),
            pods: self.pod_chart(),
            components: self.component_chart(),
            security: self.security_panel(),
        }
    }
}

/// Labels with one value each, aligned by index
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<u64>,
}

impl ChartSeries {
    fn from_counts<'a>(counts: impl Iterator<Item = (&'a String, &'a u64)>) -> Self {
        let (labels, values) = counts.map(|(k, v)| (k.clone(), *v)).unzip();
        Self { labels, values }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.values.iter().sum()
    }
}

/// Pod names with latency and timeout series of the same length
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PodChart {
    pub names: Vec<String>,
    pub latency_ms: Vec<f64>,
    pub timeouts: Vec<u64>,
}

impl PodChart {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SecurityPanel {
    pub auth_failures: u64,
    pub network_timeouts: u64,
}

/// Serializable rendering of the full dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardPanels {
    pub phase: Phase,
    pub version: u64,
    pub highlights: HighlightFlags,
    pub severity: ChartSeries,
    pub timeline: ChartSeries,
    pub pods: PodChart,
    pub components: ChartSeries,
    pub security: SecurityPanel,
}

/// `HH:MM` part of an ISO-8601 timestamp, or the whole string if shorter
fn timeline_label(timestamp: &str) -> &str {
    timestamp.get(11..16).unwrap_or(timestamp)
}
