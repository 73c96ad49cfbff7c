//! Cancellation handles for in-flight requests.
//!
//! An `AbortController` owns the trigger; any number of `AbortSignal`s
//! observe it. Once aborted, a controller stays aborted.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct AbortController {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the controller aborts. Never resolves if the controller
    /// is dropped without aborting.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
