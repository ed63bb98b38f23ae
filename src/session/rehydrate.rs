//! Rehydration gate
//!
//! Persisted client state must be restored before anything reads it. The
//! gate is a one-way latch: once complete it stays complete.

use std::sync::Arc;
use tokio::sync::watch;

/// One-way "rehydration complete" signal
#[derive(Debug, Clone)]
pub struct RehydrationGate {
    tx: Arc<watch::Sender<bool>>,
}

impl RehydrationGate {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// A gate that is already open
    pub fn completed() -> Self {
        let gate = Self::new();
        gate.complete();
        gate
    }

    pub fn is_complete(&self) -> bool {
        *self.tx.borrow()
    }

    /// Open the gate. Repeated calls are no-ops.
    pub fn complete(&self) {
        let opened = self.tx.send_if_modified(|done| {
            if *done {
                false
            } else {
                *done = true;
                true
            }
        });
        if opened {
            tracing::info!("Rehydration complete");
        }
    }

    /// Suspend until the gate is open
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so the channel cannot close while we wait
        let _ = rx.wait_for(|done| *done).await;
    }
}

impl Default for RehydrationGate {
    fn default() -> Self {
        Self::new()
    }
}
