//! Run/pause/stop coordination between the lifecycle shell and the dispatch
//! loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::observability::metrics;

/// Control flags shared by the lifecycle shell and the dispatch loop.
///
/// Cloning yields another handle to the same flags. Pause is a plain atomic
/// the loop polls; stop is also published on a watch channel so a pending
/// receive can be cancelled.
#[derive(Debug, Clone)]
pub struct ServiceControl {
    paused: Arc<AtomicBool>,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl ServiceControl {
    /// Create flags in the running state.
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            paused: Arc::new(AtomicBool::new(false)),
            stop_tx: Arc::new(stop_tx),
        }
    }

    /// Stop dequeuing requests until [`resume`](Self::resume).
    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            tracing::info!("Service paused");
            metrics::set_paused(true);
        }
    }

    /// Clear the pause flag.
    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            tracing::info!("Service resumed");
            metrics::set_paused(false);
        }
    }

    /// Ask the loop to exit at its next iteration boundary.
    pub fn stop(&self) {
        let was_stopping = self.stop_tx.send_replace(true);
        if !was_stopping {
            tracing::info!("Service stop requested");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_stopping(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Subscribe to the stop signal.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }

    /// Resolve once stop has been requested.
    pub async fn stopped(&self) {
        wait_for_stop(self.subscribe()).await
    }
}

/// Resolve once `rx` observes a stop request or its sender is gone.
pub async fn wait_for_stop(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

impl Default for ServiceControl {
    fn default() -> Self {
        Self::new()
    }
}
