//! Dashboard state controller
//!
//! Owns the current statistics snapshot and highlight flags, drives the
//! stats polling loop and the highlight decay timer, and publishes an
//! immutable [`DashboardView`] to subscribers after every change.

mod view;


pub use view::{ChartSeries, DashboardPanels, DashboardView, Phase, PodChart, SecurityPanel};

use crate::chat::QueryListener;
use crate::classifier;
use crate::decay::{DecayTimer, DEFAULT_DECAY_WINDOW};
use crate::error::FetchError;
use crate::health::HealthRegistry;
use crate::models::{HighlightFlags, StatsSnapshot};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::stats::{PollConfig, PollHandle, SnapshotSink, StatsPoller, StatsSource};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockWriteGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Timing knobs of the dashboard
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Cadence of stats polls (default: 5 seconds)
    pub poll_interval: Duration,
    /// How long highlights stay lit after a query (default: 10 seconds)
    pub decay_window: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval: PollConfig::default().interval,
            decay_window: DEFAULT_DECAY_WINDOW,
        }
    }
}

/// Mutable dashboard state, only touched under the state lock
#[derive(Debug, Default)]
struct DashboardState {
    snapshot: Option<Arc<StatsSnapshot>>,
    highlights: HighlightFlags,
    /// Bumped on every classification; a decay only clears its own epoch
    highlight_epoch: u64,
    version: u64,
}

/// State shared between the controller, the poller and decay callbacks
struct Shared {
    state: RwLock<DashboardState>,
    torn_down: AtomicBool,
    view_tx: watch::Sender<DashboardView>,
    logger: StructuredLogger,
    metrics: EngineMetrics,
}

impl Shared {
    fn write(&self) -> RwLockWriteGuard<'_, DashboardState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Publish the current state; caller holds the write lock
    fn publish(&self, state: &mut DashboardState) {
        state.version += 1;
        let view = DashboardView {
            version: state.version,
            snapshot: state.snapshot.clone(),
            highlights: state.highlights,
        };
        self.metrics.set_active_highlights(view.highlights.count());
        self.view_tx.send_replace(view);
    }

    /// Clear the highlights set by classification `epoch`
    ///
    /// No-op after teardown or once a newer classification has happened.
    fn expire_highlights(&self, epoch: u64) -> bool {
        let mut state = self.write();
        if self.is_torn_down() || state.highlight_epoch != epoch {
            return false;
        }

        let cleared = state.highlights.count();
        if cleared == 0 {
            return false;
        }

        state.highlights = HighlightFlags::NONE;
        self.publish(&mut state);
        drop(state);

        self.metrics.inc_highlight_resets();
        self.logger.log_highlights_decayed(cleared);
        true
    }
}

impl SnapshotSink for Shared {
    fn apply_snapshot(&self, snapshot: StatsSnapshot) {
        let mut state = self.write();
        if self.is_torn_down() {
            return;
        }

        let first = state.snapshot.is_none();
        let snapshot = Arc::new(snapshot);
        state.snapshot = Some(snapshot.clone());
        self.publish(&mut state);
        drop(state);

        if first {
            self.metrics.set_dashboard_ready(true);
            self.logger.log_snapshot_applied(&snapshot, true);
        } else {
            debug!(
                pods = snapshot.pod_performance.len(),
                timeline_points = snapshot.timeline.len(),
                "Refreshed statistics snapshot"
            );
        }
    }

    fn poll_failed(&self, error: &FetchError) {
        debug!(kind = error.kind(), "Keeping previous statistics snapshot");
    }
}

/// Controller of the live dashboard
///
/// Dropping the controller tears it down.
pub struct DashboardController {
    shared: Arc<Shared>,
    source: Arc<dyn StatsSource>,
    config: DashboardConfig,
    health: Option<HealthRegistry>,
    decay: DecayTimer,
    poll: Mutex<Option<PollHandle>>,
}

impl DashboardController {
    /// Create a controller in the `Loading` phase; polling starts with [`start`](Self::start)
    pub fn new(source: Arc<dyn StatsSource>, config: DashboardConfig) -> Self {
        let (view_tx, _) = watch::channel(DashboardView::default());
        let shared = Arc::new(Shared {
            state: RwLock::new(DashboardState::default()),
            torn_down: AtomicBool::new(false),
            view_tx,
            logger: StructuredLogger::new("dashboard"),
            metrics: EngineMetrics::new(),
        });

        Self {
            shared,
            source,
            decay: DecayTimer::new(config.decay_window),
            config,
            health: None,
            poll: Mutex::new(None),
        }
    }

    /// Begin polling: one fetch now, then one every poll interval
    ///
    /// Returns false if polling is already running or the controller has
    /// been torn down. Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut poll = self.poll.lock().unwrap_or_else(|e| e.into_inner());
        if self.shared.is_torn_down() || poll.as_ref().is_some_and(PollHandle::is_active) {
            return false;
        }

        let sink: Arc<dyn SnapshotSink> = self.shared.clone();
        let mut poller = StatsPoller::new(
            self.source.clone(),
            sink,
            PollConfig {
                interval: self.config.poll_interval,
            },
        );
        if let Some(health) = &self.health {
            poller = poller.with_health(health.clone());
        }

        *poll = Some(poller.spawn());
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            decay_window_ms = self.config.decay_window.as_millis() as u64,
            "Dashboard started"
        );
        true
    }

    /// React to a newly submitted query
    ///
    /// Replaces the highlight flags with the query's classification and
    /// re-arms the decay timer. Blank queries change nothing and arm no
    /// timer. Returns the flags in effect afterwards.
    pub fn on_query(&self, query: &str) -> HighlightFlags {
        if classifier::is_blank(query) {
            return self.highlights();
        }

        let flags = classifier::classify(query);

        let mut state = self.shared.write();
        if self.shared.is_torn_down() {
            return state.highlights;
        }

        state.highlights = flags;
        state.highlight_epoch += 1;
        let epoch = state.highlight_epoch;
        self.shared.publish(&mut state);

        // Armed under the state lock so concurrent queries cannot interleave
        // their flag update and timer arm.
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        self.decay.arm(move || {
            if let Some(shared) = shared.upgrade() {
                shared.expire_highlights(epoch);
            }
        });
        drop(state);

        self.shared.logger.log_query_classified(query.len(), &flags);
        flags
    }

    /// Stop polling and cancel any pending decay
    ///
    /// Idempotent. No state change is published afterwards.
    pub fn teardown(&self) {
        {
            let _state = self.shared.write();
            if self.shared.torn_down.swap(true, Ordering::SeqCst) {
                return;
            }
        }

        let decay_canceled = self.decay.cancel();
        if let Some(poll) = self.poll.lock().unwrap_or_else(|e| e.into_inner()).take() {
            poll.cancel();
        }

        info!(decay_canceled = decay_canceled, "Dashboard torn down");
    }

    /// Current view
    pub fn view(&self) -> DashboardView {
        self.shared.view_tx.borrow().clone()
    }

    /// Receive every view published from now on
    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.shared.view_tx.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.view().phase()
    }

    pub fn highlights(&self) -> HighlightFlags {
        self.shared
            .state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .highlights
    }

    pub fn is_polling(&self) -> bool {
        self.poll
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(PollHandle::is_active)
    }

    /// Whether a highlight reset is scheduled
    pub fn is_decay_pending(&self) -> bool {
        self.decay.is_armed()
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.is_torn_down()
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }
}

impl QueryListener for DashboardController {
    fn query_received(&self, query: &str) {
        self.on_query(query);
    }
}

impl Drop for DashboardController {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Builder for creating a dashboard controller
pub struct DashboardControllerBuilder {
    source: Option<Arc<dyn StatsSource>>,
    health: Option<HealthRegistry>,
    config: DashboardConfig,
}

impl DashboardControllerBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            source: None,
            health: None,
            config: DashboardConfig::default(),
        }
    }

    /// Set the stats source
    pub fn source(mut self, source: Arc<dyn StatsSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Report poll outcomes and readiness to a health registry
    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Set the poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the highlight decay window
    pub fn decay_window(mut self, window: Duration) -> Self {
        self.config.decay_window = window;
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: DashboardConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the controller
    pub fn build(self) -> Result<DashboardController> {
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("Stats source is required"))?;

        if self.config.poll_interval.is_zero() {
            anyhow::bail!("Poll interval must be greater than zero");
        }

        let mut controller = DashboardController::new(source, self.config);
        controller.health = self.health;
        Ok(controller)
    }
}

impl Default for DashboardControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
