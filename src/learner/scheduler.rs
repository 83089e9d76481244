// src/learner/scheduler.rs — Cancellable deferred tasks and debouncing

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Handle to work scheduled to run after a delay.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Run `work` after `delay` unless cancelled first.
    pub fn schedule<F>(delay: Duration, work: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            work.await;
        });
        Self { handle }
    }

    /// Stop the task. Takes effect immediately if the delay has not elapsed.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Coalesces bursts of triggers into at most one run per window.
///
/// The first trigger arms a timer; further triggers while it is armed are
/// absorbed. The action runs once when the window closes.
#[derive(Clone)]
pub struct Debouncer {
    window: Duration,
    pending: Arc<Mutex<Option<ScheduledTask>>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Arm the timer unless it already is. Returns true if this call armed it.
    pub fn trigger<F, Fut>(&self, action: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Ok(mut pending) = self.pending.lock() else {
            return false;
        };
        if pending.as_ref().is_some_and(|t| !t.is_finished()) {
            return false;
        }

        let slot = Arc::clone(&self.pending);
        *pending = Some(ScheduledTask::schedule(self.window, async move {
            if let Ok(mut guard) = slot.lock() {
                guard.take();
            }
            action().await;
        }));
        true
    }

    /// Drop a pending run without executing it.
    pub fn cancel(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(task) = pending.take() {
                task.cancel();
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .map(|p| p.as_ref().is_some_and(|t| !t.is_finished()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_task_fires_after_delay() {
        let fired = Arc::new(AtomicU32::new(0));
        let f = Arc::clone(&fired);
        let _task = ScheduledTask::schedule(Duration::from_secs(10), async move {
            f.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_task_never_fires() {
        let fired = Arc::new(AtomicU32::new(0));
        let f = Arc::clone(&fired);
        let task = ScheduledTask::schedule(Duration::from_secs(10), async move {
            f.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(3)).await;
        task.cancel();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_coalesces_burst() {
        let runs = Arc::new(AtomicU32::new(0));
        let debouncer = Debouncer::new(Duration::from_secs(5));

        for _ in 0..10 {
            let r = Arc::clone(&runs);
            debouncer.trigger(move || async move {
                r.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());

        // A new burst after the window runs again.
        let r = Arc::clone(&runs);
        assert!(debouncer.trigger(move || async move {
            r.fetch_add(1, Ordering::SeqCst);
        }));
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_cancel() {
        let runs = Arc::new(AtomicU32::new(0));
        let debouncer = Debouncer::new(Duration::from_secs(5));
        let r = Arc::clone(&runs);
        debouncer.trigger(move || async move {
            r.fetch_add(1, Ordering::SeqCst);
        });
        debouncer.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
