//! Shutdown coordination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// Fan-out shutdown signal for the HTTP and admin listeners.
///
/// Triggering is idempotent: only the first call broadcasts.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            tracing::info!(listeners = self.tx.receiver_count(), "Shutdown triggered");
            let _ = self.tx.send(());
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
