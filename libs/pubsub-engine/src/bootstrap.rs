use std::sync::Arc;

use pubsub_api::{BrokerClient, ClientFactory, SchemaClient};

use crate::client::connect_with_retry;
use crate::config::PubSubConfig;
use crate::error::PubSubError;
use crate::factory::{SubscriptionFactory, TopicFactory};
use crate::healthcheck::{Probe, ProbeResult, SubscriptionsProbe, TopicsProbe};
use crate::prepare::prepare_from_config;
use crate::publisher::Publisher;
use crate::schema::SchemaConfigRegistry;
use crate::subscriber::Subscriber;
use crate::subscription::SubscriptionRegistry;
use crate::topic::TopicRegistry;

/// The assembled message layer: one broker client, the schema cache,
/// publisher, subscriber and health probes.
pub struct PubSub {
    config: PubSubConfig,
    client: Arc<dyn BrokerClient>,
    schema_client: Arc<dyn SchemaClient>,
    schemas: Arc<SchemaConfigRegistry>,
    publisher: Publisher,
    subscriber: Subscriber,
    probes: Vec<Box<dyn Probe>>,
}

impl std::fmt::Debug for PubSub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSub")
            .field("project", &self.client.project_id())
            .field("topics", self.publisher.registry())
            .field("subscriptions", self.subscriber.registry())
            .finish()
    }
}

impl PubSub {
    /// Connect (with retry) and wire every component.
    pub async fn bootstrap(
        config: PubSubConfig,
        client_factory: &dyn ClientFactory,
        schema_client: Arc<dyn SchemaClient>,
    ) -> Result<Self, PubSubError> {
        let client = connect_with_retry(
            client_factory,
            &config.project.id,
            config.factory.attempts,
            config.factory.interval(),
        )
        .await?;

        let schemas = Arc::new(SchemaConfigRegistry::new(Arc::clone(&schema_client)));

        let publisher = Publisher::new(
            Arc::new(TopicFactory::new(Arc::clone(&client), Arc::clone(&schemas))),
            Arc::new(TopicRegistry::new()),
        );
        let subscriber = Subscriber::new(
            Arc::new(SubscriptionFactory::new(Arc::clone(&client), Arc::clone(&schemas))),
            Arc::new(SubscriptionRegistry::new()),
        );

        let probes: Vec<Box<dyn Probe>> = vec![
            Box::new(TopicsProbe::new(Arc::clone(&client), config.healthcheck.topics.clone())),
            Box::new(SubscriptionsProbe::new(
                Arc::clone(&client),
                config.healthcheck.subscriptions.clone(),
            )),
        ];

        tracing::info!(project = %config.project.id, "pubsub bootstrapped");
        Ok(PubSub {
            config,
            client,
            schema_client,
            schemas,
            publisher,
            subscriber,
            probes,
        })
    }

    pub fn config(&self) -> &PubSubConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<dyn BrokerClient> {
        &self.client
    }

    pub fn schemas(&self) -> &Arc<SchemaConfigRegistry> {
        &self.schemas
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn subscriber(&self) -> &Subscriber {
        &self.subscriber
    }

    /// Create the schemas, topics and subscriptions declared in the config.
    pub async fn prepare(&self) -> Result<(), PubSubError> {
        prepare_from_config(&self.config, self.schema_client.as_ref(), self.client.as_ref()).await
    }

    /// Run every probe, in order.
    pub async fn check_health(&self) -> Vec<(String, ProbeResult)> {
        let mut results = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            results.push((probe.name().to_string(), probe.check().await));
        }
        results
    }

    /// Flush buffered publishes.
    pub async fn shutdown(&self) {
        tracing::info!("stopping publisher");
        self.publisher.stop().await;
    }
}
