//! Live-reload broadcast channel.
//!
//! A [`Reloader`] is constructed once at startup and handed explicitly to the
//! transform tasks, the watch orchestrator, and the dev server; there is no
//! ambient global. Tasks push a signal after writing fresh output; every
//! connected browser client waiting on the channel receives it and refreshes.

use crate::paths::AssetKind;
use tokio::sync::broadcast;

/// Signal pushed to connected clients instructing them to refresh.
#[derive(Debug, Clone)]
pub struct ReloadSignal {
    /// Category whose rebuild triggered the reload
    pub kind: AssetKind,
}

/// Cloneable handle to the reload broadcast channel.
///
/// Sending is cheap and synchronous; with no subscribed clients it is a
/// no-op, so tasks can broadcast unconditionally whether or not the dev
/// server is running.
#[derive(Debug, Clone)]
pub struct Reloader {
    tx: broadcast::Sender<ReloadSignal>,
}

impl Reloader {
    /// Create a new broadcast channel. The small buffer is fine: clients
    /// only care that *a* reload happened, not how many.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    /// Push a reload signal for a category.
    pub fn broadcast(&self, kind: AssetKind) {
        if self.tx.send(ReloadSignal { kind }).is_ok() {
            tracing::debug!(category = %kind, "reload broadcast");
        }
    }

    /// Subscribe a client to reload signals.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadSignal> {
        self.tx.subscribe()
    }

    /// Number of currently subscribed clients.
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Reloader {
    fn default() -> Self {
        Self::new()
    }
}
