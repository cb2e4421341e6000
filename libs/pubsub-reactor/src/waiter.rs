use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Application error carried by a resolved waiter.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    #[error("context canceled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("waiter already stopped")]
    AlreadyStopped,
}

/// What a waiter was resolved with.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub data: T,
    pub error: Option<SharedError>,
}

impl<T> Outcome<T> {
    pub fn into_result(self) -> Result<T, SharedError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.data),
        }
    }
}

/// One-shot rendezvous between the code that observes an event and the
/// test that expects it. Pending until [`Waiter::stop`], then resolved
/// for good.
pub struct Waiter<T> {
    tx: watch::Sender<Option<Outcome<T>>>,
}

impl<T> std::fmt::Debug for Waiter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl<T> Default for Waiter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Waiter<T> {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn is_stopped(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Resolve the waiter. Only the first call takes effect; later calls
    /// return `AlreadyStopped` and leave the first outcome in place.
    pub fn stop(&self, data: T, error: Option<SharedError>) -> Result<(), WaitError> {
        let mut outcome = Some(Outcome { data, error });
        let stored = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = outcome.take();
            true
        });

        if stored {
            Ok(())
        } else {
            tracing::warn!("waiter stopped twice, keeping the first outcome");
            Err(WaitError::AlreadyStopped)
        }
    }
}

impl<T: Clone> Waiter<T> {
    /// Block until the waiter is resolved or `cancel` fires.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<Outcome<T>, WaitError> {
        let mut rx = self.tx.subscribe();
        tokio::select! {
            _ = cancel.cancelled() => Err(WaitError::Cancelled),
            resolved = rx.wait_for(Option::is_some) => match resolved {
                Ok(outcome) => outcome.clone().ok_or(WaitError::Cancelled),
                // the sender lives in `self`
                Err(_) => Err(WaitError::Cancelled),
            },
        }
    }

    /// [`Waiter::wait`] bounded by `max`, whatever `cancel` does.
    pub async fn wait_max_duration(
        &self,
        cancel: &CancellationToken,
        max: Duration,
    ) -> Result<Outcome<T>, WaitError> {
        tokio::time::timeout(max, self.wait(cancel))
            .await
            .unwrap_or(Err(WaitError::DeadlineExceeded))
    }
}
