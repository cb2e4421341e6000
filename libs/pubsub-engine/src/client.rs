use std::sync::Arc;
use std::time::Duration;

use pubsub_api::{BrokerClient, ClientFactory};

use crate::error::PubSubError;

/// Open a broker client, retrying `attempts` more times after a failure
/// with `interval` between tries.
pub async fn connect_with_retry(
    factory: &dyn ClientFactory,
    project_id: &str,
    attempts: u32,
    interval: Duration,
) -> Result<Arc<dyn BrokerClient>, PubSubError> {
    for attempt in 0..=attempts {
        match factory.create(project_id).await {
            Ok(client) => {
                tracing::debug!(project = %project_id, attempt = attempt + 1, "pubsub client creation success");
                return Ok(client);
            }
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    project = %project_id,
                    attempt = attempt + 1,
                    error = %e,
                    "pubsub client creation error, attempting again in {}s",
                    interval.as_secs()
                );
                tokio::time::sleep(interval).await;
            }
            Err(e) => {
                tracing::warn!(project = %project_id, attempt = attempt + 1, error = %e, "pubsub client creation error");
            }
        }
    }

    Err(PubSubError::ClientCreation(attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use pretty_assertions::assert_eq;
    use pubsub_api::{BoxFuture, BrokerError};

    /// Fails every call.
    #[derive(Default)]
    struct FailingFactory {
        calls: AtomicU32,
    }

    impl ClientFactory for FailingFactory {
        fn create(&self, _project_id: &str) -> BoxFuture<'_, Result<Arc<dyn BrokerClient>, BrokerError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(BrokerError::unavailable("connection refused")) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_all_attempts() {
        let factory = FailingFactory::default();
        let err = connect_with_retry(&factory, "p", 2, Duration::from_secs(1))
            .await
            .err()
            .unwrap();

        assert_eq!(err.to_string(), "pubsub client creation error after 2 attempts");
        assert_eq!(factory.calls.load(Ordering::SeqCst), 3);
    }
}
