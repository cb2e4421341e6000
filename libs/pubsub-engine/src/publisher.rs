use std::sync::Arc;

use pubsub_api::{Payload, PublishOptions, PublishResult};

use crate::error::{PubSubError, Resource};
use crate::factory::TopicFactory;
use crate::topic::{Topic, TopicRegistry};

/// Publishes payloads to topics, creating and caching each `Topic` on
/// first use.
pub struct Publisher {
    factory: Arc<TopicFactory>,
    registry: Arc<TopicRegistry>,
}

impl Publisher {
    pub fn new(factory: Arc<TopicFactory>, registry: Arc<TopicRegistry>) -> Self {
        Self { factory, registry }
    }

    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    /// Encode `data` with the topic codec and submit it.
    ///
    /// Returns as soon as the message is handed to the broker client;
    /// await the result to get the server-assigned id.
    pub async fn publish(
        &self,
        topic_id: &str,
        data: &Payload,
        options: &PublishOptions,
    ) -> Result<PublishResult, PubSubError> {
        let topic = self.topic(topic_id).await?;
        topic.publish(data, options)
    }

    async fn topic(&self, topic_id: &str) -> Result<Arc<Topic>, PubSubError> {
        if !self.registry.has(topic_id) {
            let topic = self
                .factory
                .create(topic_id)
                .await
                .map_err(|source| PubSubError::Create {
                    resource: Resource::Topic,
                    source: Box::new(source),
                })?;
            let topic = Arc::new(topic);
            self.registry.add(Arc::clone(&topic));
            return Ok(topic);
        }

        self.registry
            .get(topic_id)
            .map_err(|source| PubSubError::Get {
                resource: Resource::Topic,
                source: Box::new(source),
            })
    }

    /// Flush every registered topic. Call before shutdown so buffered
    /// messages are not lost.
    pub async fn stop(&self) {
        for (id, topic) in self.registry.all() {
            tracing::debug!(topic = %id, "stopping topic");
            topic.stop().await;
        }
    }
}
