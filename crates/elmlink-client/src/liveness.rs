//! Dead-connection detection
//!
//! TCP keep-alive is not guaranteed to surface a dead peer to the
//! application in any useful time frame (a laptop lid close or a mobile
//! radio sleep can leave the socket half-open for minutes). Instead, the
//! session sends a lightweight probe whenever the page regains focus and
//! arms this timer; the server's acknowledgement disarms it. If the timer
//! fires first, the connection is presumed dead and is force-reopened.
//!
//! This is the one cancellable timer in the system. Cancellation is a
//! generation bump: a timeout task only fires its callback if no arm or
//! disarm happened after it was started, so a stale timeout from a previous
//! probe can never trigger a reconnect.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long to wait for `FocusedTabAcknowledged` before declaring the
/// connection dead.
pub const FOCUS_ACK_TIMEOUT: Duration = Duration::from_millis(2000);

/// Focus-probe timeout with generation-based cancellation
#[derive(Debug, Clone, Default)]
pub struct LivenessTimer {
    generation: Arc<AtomicU64>,
}

impl LivenessTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer. Any previously armed timeout is implicitly cancelled.
    ///
    /// `on_timeout` runs on a background task after `timeout`, unless
    /// [`disarm`](Self::disarm) or a newer [`arm`](Self::arm) happens first.
    pub fn arm(&self, timeout: Duration, on_timeout: impl FnOnce() + Send + 'static) {
        let armed_at = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if generation.load(Ordering::SeqCst) == armed_at {
                on_timeout();
            }
        });
    }

    /// Cancel the pending timeout, if any
    pub fn disarm(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_when_not_acknowledged() {
        let timer = LivenessTimer::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        timer.arm(Duration::from_millis(2000), move || {
            let _ = tx.send(());
        });

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_cancels_pending_timeout() {
        let timer = LivenessTimer::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        timer.arm(Duration::from_millis(2000), move || {
            let _ = tx.send(());
        });

        timer.disarm();
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_supersedes_previous_timeout() {
        let timer = LivenessTimer::new();
        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();

        timer.arm(Duration::from_millis(2000), move || {
            let _ = old_tx.send("old");
        });
        tokio::time::sleep(Duration::from_millis(1000)).await;
        timer.arm(Duration::from_millis(2000), move || {
            let _ = new_tx.send("new");
        });

        // The first timeout's deadline passes without firing.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(old_rx.try_recv().is_err());

        // The second one fires at its own deadline.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(new_rx.try_recv().unwrap(), "new");
    }
}
