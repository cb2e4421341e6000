//! Create broker resources ahead of use (tests, local sandboxes).

use std::collections::HashMap;
use std::sync::Arc;

use pubsub_api::{
    BrokerClient, SchemaClient, SchemaConfig, SchemaEncoding, SchemaSettings, SubscriptionConfig,
    SubscriptionHandle, TopicConfig, TopicHandle,
};

use crate::config::PubSubConfig;
use crate::error::{PubSubError, Resource};

#[derive(Debug, Clone)]
pub struct SchemaSpec {
    pub id: String,
    pub config: SchemaConfig,
}

#[derive(Debug, Clone)]
pub struct TopicSpec {
    pub id: String,
    pub config: TopicConfig,
}

/// `config.topic` is overwritten with the id of the prepared topic.
#[derive(Debug, Clone)]
pub struct SubscriptionSpec {
    pub id: String,
    pub config: SubscriptionConfig,
}

pub async fn prepare_schema(
    schema_client: &dyn SchemaClient,
    schema: &SchemaSpec,
) -> Result<SchemaConfig, PubSubError> {
    let created = schema_client
        .create_schema(&schema.id, schema.config.clone())
        .await
        .map_err(|source| PubSubError::Prepare {
            resource: Resource::Schema,
            id: schema.id.clone(),
            source,
        })?;
    tracing::info!(schema = %created.name, "prepared schema");
    Ok(created)
}

pub async fn prepare_topic(
    client: &dyn BrokerClient,
    topic: &TopicSpec,
) -> Result<Arc<dyn TopicHandle>, PubSubError> {
    let handle = client
        .create_topic(&topic.id, topic.config.clone())
        .await
        .map_err(|source| PubSubError::Prepare {
            resource: Resource::Topic,
            id: topic.id.clone(),
            source,
        })?;
    tracing::info!(topic = %handle.name(), "prepared topic");
    Ok(handle)
}

/// Create the schema, then a topic whose schema settings reference it.
pub async fn prepare_topic_with_schema(
    schema_client: &dyn SchemaClient,
    client: &dyn BrokerClient,
    topic: &TopicSpec,
    schema: &SchemaSpec,
    encoding: SchemaEncoding,
) -> Result<Arc<dyn TopicHandle>, PubSubError> {
    let created = prepare_schema(schema_client, schema).await?;

    let mut topic = topic.clone();
    topic.config.schema_settings = Some(SchemaSettings {
        schema: created.name,
        encoding,
    });
    prepare_topic(client, &topic).await
}

async fn prepare_subscription(
    client: &dyn BrokerClient,
    topic: &dyn TopicHandle,
    subscription: &SubscriptionSpec,
) -> Result<Arc<dyn SubscriptionHandle>, PubSubError> {
    let mut config = subscription.config.clone();
    config.topic = topic.id().to_string();

    let handle = client
        .create_subscription(&subscription.id, config)
        .await
        .map_err(|source| PubSubError::Prepare {
            resource: Resource::Subscription,
            id: subscription.id.clone(),
            source,
        })?;
    tracing::info!(subscription = %handle.name(), topic = %topic.name(), "prepared subscription");
    Ok(handle)
}

pub async fn prepare_topic_and_subscription(
    client: &dyn BrokerClient,
    topic: &TopicSpec,
    subscription: &SubscriptionSpec,
) -> Result<Arc<dyn SubscriptionHandle>, PubSubError> {
    let topic = prepare_topic(client, topic).await?;
    prepare_subscription(client, topic.as_ref(), subscription).await
}

pub async fn prepare_topic_and_subscription_with_schema(
    schema_client: &dyn SchemaClient,
    client: &dyn BrokerClient,
    topic: &TopicSpec,
    subscription: &SubscriptionSpec,
    schema: &SchemaSpec,
    encoding: SchemaEncoding,
) -> Result<Arc<dyn SubscriptionHandle>, PubSubError> {
    let topic = prepare_topic_with_schema(schema_client, client, topic, schema, encoding).await?;
    prepare_subscription(client, topic.as_ref(), subscription).await
}

/// Create every schema, topic and subscription declared in `config`,
/// in that order.
pub async fn prepare_from_config(
    config: &PubSubConfig,
    schema_client: &dyn SchemaClient,
    client: &dyn BrokerClient,
) -> Result<(), PubSubError> {
    let mut schema_names = HashMap::new();
    for entry in &config.schemas {
        let spec = SchemaSpec {
            id: entry.id.clone(),
            config: entry.to_schema_config()?,
        };
        let created = prepare_schema(schema_client, &spec).await?;
        schema_names.insert(entry.id.clone(), created.name);
    }

    let mut topics = HashMap::new();
    for entry in &config.topics {
        let schema_name = entry
            .schema
            .as_ref()
            .and_then(|id| schema_names.get(id))
            .map(String::as_str);
        let spec = TopicSpec {
            id: entry.id.clone(),
            config: entry.to_topic_config(schema_name),
        };
        topics.insert(entry.id.clone(), prepare_topic(client, &spec).await?);
    }

    for entry in &config.subscriptions {
        let spec = SubscriptionSpec {
            id: entry.id.clone(),
            config: entry.to_subscription_config(),
        };
        match topics.get(&entry.topic) {
            Some(topic) => {
                prepare_subscription(client, topic.as_ref(), &spec).await?;
            }
            None => {
                return Err(PubSubError::Config(format!(
                    "subscription '{}' references unknown topic '{}'",
                    entry.id, entry.topic
                )));
            }
        }
    }

    Ok(())
}
