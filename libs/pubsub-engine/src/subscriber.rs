use std::future::Future;
use std::sync::Arc;

use pubsub_api::{CancellationToken, ReceiveOptions};

use crate::error::{PubSubError, Resource};
use crate::factory::SubscriptionFactory;
use crate::message::Message;
use crate::subscription::{Subscription, SubscriptionRegistry};

/// Receives from subscriptions, creating and caching each `Subscription`
/// on first use.
pub struct Subscriber {
    factory: Arc<SubscriptionFactory>,
    registry: Arc<SubscriptionRegistry>,
}

impl Subscriber {
    pub fn new(factory: Arc<SubscriptionFactory>, registry: Arc<SubscriptionRegistry>) -> Self {
        Self { factory, registry }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Receive from `subscription_id`, invoking `callback` for every
    /// message. Blocks until `cancel` fires or the broker shuts down.
    pub async fn subscribe<F, Fut>(
        &self,
        cancel: CancellationToken,
        subscription_id: &str,
        options: &ReceiveOptions,
        callback: F,
    ) -> Result<(), PubSubError>
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let subscription = self.subscription(subscription_id).await?;
        subscription.subscribe(cancel, options, callback).await
    }

    async fn subscription(&self, subscription_id: &str) -> Result<Arc<Subscription>, PubSubError> {
        if !self.registry.has(subscription_id) {
            let subscription = self
                .factory
                .create(subscription_id)
                .await
                .map_err(|source| PubSubError::Create {
                    resource: Resource::Subscription,
                    source: Box::new(source),
                })?;
            let subscription = Arc::new(subscription);
            self.registry.add(Arc::clone(&subscription));
            return Ok(subscription);
        }

        self.registry
            .get(subscription_id)
            .map_err(|source| PubSubError::Get {
                resource: Resource::Subscription,
                source: Box::new(source),
            })
    }
}
