//! Cooperative cancellation for terminal query operations.

use std::future::Future;

use tokio::sync::watch;

use crate::error::{QueryError, Result};

/// Fires the paired [`Cancellation`]s.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Another signal observing this handle.
    pub fn token(&self) -> Cancellation {
        Cancellation {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observed by every terminal operation. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

/// A handle and the signal it controls.
pub fn cancellation() -> (CancelHandle, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, Cancellation { rx })
}

impl Cancellation {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(QueryError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once cancelled. Pending forever if the handle is dropped first.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Run `work` unless cancelled first. Cancellation drops the future and
    /// yields [`QueryError::Cancelled`], never a partial result.
    pub async fn run<T>(&self, work: impl Future<Output = Result<T>>) -> Result<T> {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(QueryError::Cancelled),
            result = work => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn never_is_not_cancelled() {
        let cancel = Cancellation::never();
        assert!(!cancel.is_cancelled());
        assert!(cancel.check().is_ok());
    }

    #[tokio::test]
    async fn run_completes_when_not_cancelled() {
        let (_handle, cancel) = cancellation();
        let value = cancel.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn run_short_circuits_when_already_cancelled() {
        let (handle, cancel) = cancellation();
        handle.cancel();
        let result = cancel.run(async { Ok(7) }).await;
        assert!(matches!(result, Err(QueryError::Cancelled)));
    }

    #[tokio::test]
    async fn cancel_interrupts_pending_work() {
        let (handle, cancel) = cancellation();
        let task = tokio::spawn(async move {
            cancel
                .run(async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(())
                })
                .await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();
        let result = task.await.unwrap();
        assert!(matches!(result, Err(QueryError::Cancelled)));
    }

    #[tokio::test]
    async fn dropped_handle_never_fires() {
        let (handle, cancel) = cancellation();
        drop(handle);
        let result = tokio::time::timeout(Duration::from_millis(20), cancel.cancelled()).await;
        assert!(result.is_err());
    }
}
