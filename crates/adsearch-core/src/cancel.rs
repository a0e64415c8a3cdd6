//! Cancellation and shutdown signalling.
//!
//! A [`CancelSource`] is the single writer; every [`CancelToken`] cloned from
//! it observes the same flag. The pair doubles as the process shutdown signal
//! handed to long-running work.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct CancelSource {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken { rx: self.tx.subscribe() }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Fire after `after` elapses. Requires a running tokio runtime.
    pub fn cancel_after(&self, after: Duration) {
        let tx = Arc::clone(&self.tx);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            tx.send_replace(true);
        });
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the source fires. Pends forever if the source is dropped
    /// without firing.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Drive `fut` unless the token fires first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Error::Cancelled),
            out = fut => out,
        }
    }
}
