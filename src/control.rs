//! Cooperative cancellation shared between a tailer and its bootstrap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// The `running` flag checked at the top of every bootstrap retry. Once
/// cleared it never flips back.
#[derive(Debug)]
pub(crate) struct BootstrapControl {
    running: AtomicBool,
    wake: Notify,
}

impl Default for BootstrapControl {
    fn default() -> Self {
        Self {
            running: AtomicBool::new(true),
            wake: Notify::new(),
        }
    }
}

impl BootstrapControl {
    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Clears `running` and wakes any backoff in progress.
    pub(crate) fn cancel(&self) {
        self.running.store(false, Ordering::Release);
        self.wake.notify_waiters();
    }

    /// Sleeps for `interval`, returning early if cancelled.
    pub(crate) async fn backoff(&self, interval: Duration) {
        let notified = self.wake.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent cancel is not missed.
        notified.as_mut().enable();

        if !self.is_running() {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = notified => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::Instant;

    #[test]
    fn test_starts_running() {
        assert!(BootstrapControl::default().is_running());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let control = BootstrapControl::default();
        control.cancel();
        control.cancel();
        assert!(!control.is_running());
    }

    #[tokio::test]
    async fn test_backoff_sleeps_full_interval() {
        let control = BootstrapControl::default();
        let start = Instant::now();
        control.backoff(Duration::from_millis(30)).await;
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_cancel_cuts_backoff_short() {
        let control = Arc::new(BootstrapControl::default());
        let sleeper = Arc::clone(&control);

        let start = Instant::now();
        let handle = tokio::spawn(async move {
            sleeper.backoff(Duration::from_secs(10)).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        control.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_backoff_after_cancel_returns_immediately() {
        let control = BootstrapControl::default();
        control.cancel();

        tokio::time::timeout(Duration::from_millis(100), control.backoff(Duration::from_secs(10)))
            .await
            .unwrap();
    }
}
