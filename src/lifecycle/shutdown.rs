//! Shutdown coordination.
//!
//! `main` owns a `Shutdown`; the signal handler holds a clone and the listener
//! holds a `ShutdownListener`. Triggering is sticky: a listener created after the
//! trigger still sees it.

use std::sync::Arc;

use tokio::sync::watch;

/// Handle that requests a graceful shutdown.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown. Repeated calls are no-ops.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for a shutdown request.
#[derive(Debug)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Resolve once shutdown is requested.
    ///
    /// Returns `false` if every `Shutdown` handle was dropped without triggering.
    pub async fn wait(mut self) -> bool {
        self.rx.wait_for(|requested| *requested).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn late_listener_sees_trigger() {
        let shutdown = Shutdown::new();
        let early = shutdown.listener();
        shutdown.trigger();
        shutdown.trigger();

        assert!(shutdown.is_triggered());
        assert!(early.wait().await);
        assert!(shutdown.clone().listener().wait().await);
    }

    #[tokio::test]
    async fn dropped_handles_release_listener() {
        let shutdown = Shutdown::new();
        let listener = shutdown.listener();
        drop(shutdown);
        assert!(!listener.wait().await);
    }
}
