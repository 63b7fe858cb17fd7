use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Shared pause/resume/cancel switch for one download batch.
///
/// Clones observe the same state. Cancellation is sticky; pause can be
/// toggled any number of times.
#[derive(Debug, Clone)]
pub struct DownloadControl {
    cancel: CancellationToken,
    paused: Arc<watch::Sender<bool>>,
}

impl Default for DownloadControl {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadControl {
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            cancel: CancellationToken::new(),
            paused: Arc::new(paused),
        }
    }

    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
        // Wake anything parked on the pause gate.
        self.paused.send_replace(false);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Resolves once the batch is paused. Pending forever otherwise.
    pub async fn pause_requested(&self) {
        let mut rx = self.paused.subscribe();
        let _ = rx.wait_for(|paused| *paused).await;
    }

    /// Returns immediately unless paused; otherwise waits for resume or cancel.
    pub async fn wait_resumed(&self) {
        let mut rx = self.paused.subscribe();
        tokio::select! {
            _ = rx.wait_for(|paused| !*paused) => {}
            _ = self.cancel.cancelled() => {}
        }
    }
}
