use std::sync::Arc;

use pubsub_api::{BrokerClient, SchemaEncoding, SchemaSettings, SchemaType};

use crate::codec::{CodecFactory, SchemaCodec};
use crate::error::{PubSubError, Resource};
use crate::schema::SchemaConfigRegistry;
use crate::subscription::Subscription;
use crate::topic::Topic;

/// Resolve the codec for a resource from its (optional) schema settings.
async fn resolve_codec(
    schemas: &SchemaConfigRegistry,
    codecs: &CodecFactory,
    resource: Resource,
    id: &str,
    settings: Option<&SchemaSettings>,
) -> Result<SchemaCodec, PubSubError> {
    let (schema_type, encoding, definition) = match settings {
        Some(settings) if !settings.schema.is_empty() => {
            let config = schemas.get(&settings.schema).await.map_err(|source| {
                PubSubError::ResourceSchema {
                    resource,
                    id: id.to_string(),
                    source: Box::new(source),
                }
            })?;
            (config.schema_type, settings.encoding, config.definition.clone())
        }
        _ => (SchemaType::Unspecified, SchemaEncoding::Unspecified, String::new()),
    };

    codecs
        .create(schema_type, encoding, &definition)
        .map_err(|source| PubSubError::ResourceCodec {
            resource,
            id: id.to_string(),
            source,
        })
}

// ════════════════════════════════════════════════════════════════
//  TopicFactory
// ════════════════════════════════════════════════════════════════

pub struct TopicFactory {
    client: Arc<dyn BrokerClient>,
    schemas: Arc<SchemaConfigRegistry>,
    codecs: CodecFactory,
}

impl TopicFactory {
    pub fn new(client: Arc<dyn BrokerClient>, schemas: Arc<SchemaConfigRegistry>) -> Self {
        Self {
            client,
            schemas,
            codecs: CodecFactory,
        }
    }

    pub async fn create(&self, topic_id: &str) -> Result<Topic, PubSubError> {
        let handle = self.client.topic(topic_id);
        let config = handle
            .config()
            .await
            .map_err(|source| PubSubError::ResourceConfig {
                resource: Resource::Topic,
                id: topic_id.to_string(),
                source,
            })?;

        let codec = resolve_codec(
            &self.schemas,
            &self.codecs,
            Resource::Topic,
            topic_id,
            config.schema_settings.as_ref(),
        )
        .await?;

        tracing::debug!(topic = %topic_id, codec = codec.name(), "created topic");
        Ok(Topic::new(handle, codec))
    }
}

// ════════════════════════════════════════════════════════════════
//  SubscriptionFactory
// ════════════════════════════════════════════════════════════════

pub struct SubscriptionFactory {
    client: Arc<dyn BrokerClient>,
    schemas: Arc<SchemaConfigRegistry>,
    codecs: CodecFactory,
}

impl SubscriptionFactory {
    pub fn new(client: Arc<dyn BrokerClient>, schemas: Arc<SchemaConfigRegistry>) -> Self {
        Self {
            client,
            schemas,
            codecs: CodecFactory,
        }
    }

    /// The codec comes from the schema of the topic the subscription is
    /// bound to.
    pub async fn create(&self, subscription_id: &str) -> Result<Subscription, PubSubError> {
        let handle = self.client.subscription(subscription_id);
        let config = handle
            .config()
            .await
            .map_err(|source| PubSubError::ResourceConfig {
                resource: Resource::Subscription,
                id: subscription_id.to_string(),
                source,
            })?;

        let topic_config = self
            .client
            .topic(&config.topic)
            .config()
            .await
            .map_err(|source| PubSubError::TopicConfig {
                id: subscription_id.to_string(),
                source,
            })?;

        let codec = resolve_codec(
            &self.schemas,
            &self.codecs,
            Resource::Subscription,
            subscription_id,
            topic_config.schema_settings.as_ref(),
        )
        .await?;

        tracing::debug!(subscription = %subscription_id, codec = codec.name(), "created subscription");
        Ok(Subscription::new(handle, codec))
    }
}
