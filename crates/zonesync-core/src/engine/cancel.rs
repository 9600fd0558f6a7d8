//! Cycle cancellation
//!
//! A [`CancelHandle`] raises the signal; every [`CancelSignal`] clone observes
//! it. The engine checks the signal before each list and each mutation, so a
//! raised signal stops the cycle at the next call boundary. Calls already in
//! flight are not rolled back.

use tokio::sync::watch;

/// Create a connected handle/signal pair
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Raises cancellation for every associated [`CancelSignal`]
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Raise the signal; idempotent
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// A new signal observing this handle
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observes a [`CancelHandle`]
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that is never raised
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// Whether cancellation has been raised
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Fail with [`crate::Error::Cancelled`] if cancellation has been raised
    pub fn check(&self) -> crate::Result<()> {
        if self.is_cancelled() {
            Err(crate::Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Wait until cancellation is raised
    ///
    /// Never completes for a signal whose handle was dropped without cancelling.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}
