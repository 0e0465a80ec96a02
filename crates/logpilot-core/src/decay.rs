//! One-shot, re-armable expiry timer for highlight decay

use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default time a highlight stays lit after the query that set it
pub const DEFAULT_DECAY_WINDOW: Duration = Duration::from_secs(10);

/// Schedules a single callback a fixed window after it is armed
///
/// At most one callback is pending at a time: arming again cancels the
/// previous one. Dropping the timer cancels whatever is pending.
pub struct DecayTimer {
    window: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DecayTimer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `on_expire` to run once after the window elapses
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F>(&self, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let window = self.window;
        let task = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            on_expire();
        });

        let previous = self.lock().replace(task);
        if let Some(previous) = previous {
            previous.abort();
            debug!("Superseded pending highlight decay");
        }
    }

    /// Cancel the pending callback, if any
    ///
    /// Returns true when a callback that had not yet fired was canceled.
    pub fn cancel(&self) -> bool {
        match self.lock().take() {
            Some(task) => {
                let was_pending = !task.is_finished();
                task.abort();
                was_pending
            }
            None => false,
        }
    }

    /// Whether a callback is scheduled and has not fired yet
    pub fn is_armed(&self) -> bool {
        self.lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        // A poisoned slot still holds a valid handle
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for DecayTimer {
    fn drop(&mut self) {
        if let Some(task) = self.lock().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_callback(counter: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_window() {
        let timer = DecayTimer::new(Duration::from_secs(10));
        let fired = Arc::new(AtomicUsize::new(0));

        timer.arm(counting_callback(&fired));
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_millis(9_999)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_supersedes_previous() {
        let timer = DecayTimer::new(Duration::from_secs(10));
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        timer.arm(counting_callback(&first));
        tokio::time::sleep(Duration::from_secs(6)).await;
        timer.arm(counting_callback(&second));

        // 10s after the first arm: the first must not fire
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        // 10s after the second arm
        tokio::time::sleep(Duration::from_millis(5_001)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let timer = DecayTimer::new(Duration::from_secs(10));
        let fired = Arc::new(AtomicUsize::new(0));

        timer.arm(counting_callback(&fired));
        assert!(timer.cancel());
        assert!(!timer.cancel());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending() {
        let fired = Arc::new(AtomicUsize::new(0));
        {
            let timer = DecayTimer::new(Duration::from_secs(1));
            timer.arm(counting_callback(&fired));
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
