//! Stats polling loop
//!
//! Fetches a snapshot immediately on start and then on a fixed cadence,
//! handing every outcome to a sink. Fetches run one at a time, so results
//! are applied in the order they were issued.

use super::StatsSource;
use crate::error::FetchError;
use crate::health::{components, HealthRegistry};
use crate::models::StatsSnapshot;
use crate::observability::EngineMetrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Default cadence of stats polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Configuration for the stats polling loop
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Time between the starts of two consecutive polls (default: 5 seconds)
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Receiver of poll outcomes
pub trait SnapshotSink: Send + Sync {
    /// Take a freshly fetched snapshot
    fn apply_snapshot(&self, snapshot: StatsSnapshot);

    /// Observe a failed poll; the previous snapshot stays in place
    fn poll_failed(&self, _error: &FetchError) {}
}

/// Polling loop that periodically fetches statistics
pub struct StatsPoller {
    source: Arc<dyn StatsSource>,
    sink: Arc<dyn SnapshotSink>,
    config: PollConfig,
    health: Option<HealthRegistry>,
    metrics: EngineMetrics,
}

impl StatsPoller {
    /// Create a new polling loop
    pub fn new(
        source: Arc<dyn StatsSource>,
        sink: Arc<dyn SnapshotSink>,
        config: PollConfig,
    ) -> Self {
        Self {
            source,
            sink,
            config,
            health: None,
            metrics: EngineMetrics::new(),
        }
    }

    /// Report poll outcomes to a health registry
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Start polling on the current runtime
    pub fn spawn(self) -> PollHandle {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(self.run(shutdown_rx));
        PollHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Run the polling loop until a shutdown signal arrives
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            "Starting stats polling loop"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut poll_count = 0u64;
        let mut failure_count = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let start = Instant::now();

                    // An in-flight fetch is abandoned on shutdown
                    let result = tokio::select! {
                        result = self.source.poll() => result,
                        _ = shutdown.recv() => {
                            info!("Shutting down stats polling loop");
                            break;
                        }
                    };

                    let elapsed = start.elapsed();
                    poll_count += 1;
                    if result.is_err() {
                        failure_count += 1;
                    }

                    self.handle_result(result, elapsed).await;

                    debug!(
                        polls = poll_count,
                        failures = failure_count,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Stats poll complete"
                    );
                }
                _ = shutdown.recv() => {
                    info!("Shutting down stats polling loop");
                    break;
                }
            }
        }
    }

    async fn handle_result(&self, result: Result<StatsSnapshot, FetchError>, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        match result {
            Ok(snapshot) => {
                self.metrics.observe_poll("success", secs);
                self.sink.apply_snapshot(snapshot);
                if let Some(health) = &self.health {
                    health.record_call(components::STATS_POLLER, Ok(())).await;
                    health.set_ready(true).await;
                }
            }
            Err(e) => {
                self.metrics.observe_poll(e.kind(), secs);
                self.sink.poll_failed(&e);
                if let Some(health) = &self.health {
                    health.record_call(components::STATS_POLLER, Err(&e)).await;
                }
            }
        }
    }
}

/// Handle to a running polling loop
///
/// Canceling is idempotent. Dropping the handle cancels the loop.
pub struct PollHandle {
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop the loop; no poll starts after this returns
    pub fn cancel(&self) {
        // Err only means the loop already exited
        let _ = self.shutdown.send(());
        self.task.abort();
    }

    /// Whether the loop is still running
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Source returning scripted outcomes, then empty snapshots
    struct ScriptedSource {
        calls: AtomicUsize,
        script: Mutex<VecDeque<Result<StatsSnapshot, FetchError>>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<StatsSnapshot, FetchError>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(script.into()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatsSource for ScriptedSource {
        async fn poll(&self) -> Result<StatsSnapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(StatsSnapshot::default()))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        applied: Mutex<Vec<StatsSnapshot>>,
        failures: AtomicUsize,
    }

    impl SnapshotSink for RecordingSink {
        fn apply_snapshot(&self, snapshot: StatsSnapshot) {
            self.applied.lock().unwrap().push(snapshot);
        }

        fn poll_failed(&self, _error: &FetchError) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn snapshot_with_auth_fails(n: u64) -> StatsSnapshot {
        StatsSnapshot {
            auth_failure_count: n,
            ..StatsSnapshot::default()
        }
    }

    /// Source that holds every fetch until released
    #[derive(Default)]
    struct GatedSource {
        entered: Notify,
        release: Notify,
        completed: AtomicUsize,
    }

    #[async_trait]
    impl StatsSource for GatedSource {
        async fn poll(&self) -> Result<StatsSnapshot, FetchError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(snapshot_with_auth_fails(1))
        }
    }

    #[test]
    fn test_poll_config_default() {
        assert_eq!(PollConfig::default().interval, Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_immediately_then_on_interval() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let sink = Arc::new(RecordingSink::default());

        let handle = StatsPoller::new(source.clone(), sink.clone(), PollConfig::default()).spawn();

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(source.calls(), 1);

        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(source.calls(), 2);

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(source.calls(), 4);

        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_reach_sink_and_health() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(snapshot_with_auth_fails(3)),
            Err(FetchError::Server {
                status: 502,
                body: "bad gateway".to_string(),
            }),
        ]));
        let sink = Arc::new(RecordingSink::default());
        let health = HealthRegistry::new();

        let handle = StatsPoller::new(source, sink.clone(), PollConfig::default())
            .with_health(health.clone())
            .spawn();

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(health.readiness().await.ready);

        tokio::time::sleep(Duration::from_millis(5000)).await;

        assert_eq!(sink.applied.lock().unwrap().len(), 1);
        assert_eq!(sink.applied.lock().unwrap()[0].auth_failure_count, 3);
        assert_eq!(sink.failures.load(Ordering::SeqCst), 1);
        let status = health.health().await.components[components::STATS_POLLER].status;
        assert_eq!(status, crate::health::ComponentStatus::Degraded);

        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_polling_idempotently() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let sink = Arc::new(RecordingSink::default());

        let handle = StatsPoller::new(source.clone(), sink, PollConfig::default()).spawn();
        tokio::time::sleep(Duration::from_millis(1)).await;

        handle.cancel();
        handle.cancel();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(source.calls(), 1);
        assert!(!handle.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_abandons_in_flight_fetch() {
        let source = Arc::new(GatedSource::default());
        let sink = Arc::new(RecordingSink::default());

        let handle = StatsPoller::new(source.clone(), sink.clone(), PollConfig::default()).spawn();
        source.entered.notified().await;

        handle.cancel();
        source.release.notify_one();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(source.completed.load(Ordering::SeqCst), 0);
        assert!(sink.applied.lock().unwrap().is_empty());
        assert_eq!(sink.failures.load(Ordering::SeqCst), 0);
        assert!(!handle.is_active());
    }
}
