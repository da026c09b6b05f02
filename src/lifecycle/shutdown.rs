//! Shutdown coordination for one proxy instance.
//!
//! Listeners drain through their `axum_server::Handle`. Upgraded WebSocket
//! connections leave the server's bookkeeping once the handshake is done,
//! so each relay is tracked here and watches the same cancellation token.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::task_tracker::TrackedFuture;
use tokio_util::task::TaskTracker;

/// Shutdown trigger plus the set of relays that must finish before the
/// instance is considered ended.
#[derive(Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    relays: TaskTracker,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger the shutdown signal. Idempotent.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once `trigger` has been called, immediately if it already was.
    pub async fn triggered(&self) {
        self.token.cancelled().await
    }

    /// Count `relay` as live until it completes.
    pub fn track<F: Future>(&self, relay: F) -> TrackedFuture<F> {
        self.relays.track_future(relay)
    }

    /// Relays still running.
    pub fn active_relays(&self) -> usize {
        self.relays.len()
    }

    /// Stop accepting new relays and wait for the live ones, up to `timeout`.
    /// Returns false if the deadline passed first.
    pub async fn drain(&self, timeout: Option<Duration>) -> bool {
        self.relays.close();
        match timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.relays.wait())
                .await
                .is_ok(),
            None => {
                self.relays.wait().await;
                true
            }
        }
    }
}
