//! One-shot task sequencing signals

use std::sync::Arc;

use tokio::sync::watch;

/// A one-shot signal: set exactly once by its owning task, awaited by
/// any number of others
///
/// Waiting after the signal is set returns immediately; the signal is
/// never reset. There is deliberately no timeout on [`Signal::wait`]: a
/// waiter whose peer never signals blocks forever, which is acceptable
/// only because both writers are always started together in-process.
#[derive(Debug, Clone)]
pub struct Signal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl Signal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Set the signal, releasing every current and future waiter.
    pub fn set(&self) {
        let was_set = self.tx.send_replace(true);
        debug_assert!(!was_set, "one-shot signal set twice");
    }

    /// Wait until the signal is set.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // Cannot fail: we hold the sending half for as long as we wait.
        let _ = rx.wait_for(|set| *set).await;
    }
}

/// The pair of phase signals a writer owns: one for "read done", one
/// for "write done"
#[derive(Debug, Clone, Default)]
pub struct SignalPair {
    pub searched: Signal,
    pub updated: Signal,
}

impl SignalPair {
    pub fn new() -> Self {
        Self::default()
    }
}
