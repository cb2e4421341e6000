use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;

use crate::error::BrokerError;
use crate::schema::{SchemaConfig, SubscriptionConfig, TopicConfig};
use crate::settings::{PublishSettings, ReceiveSettings};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ════════════════════════════════════════════════════════════════
//  Messages
// ════════════════════════════════════════════════════════════════

/// Encoded message submitted to a topic handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub data: Vec<u8>,
    pub attributes: HashMap<String, String>,
    pub ordering_key: String,
}

/// Asynchronous outcome of a publish: resolves to the server-assigned
/// message id once the broker has accepted the message.
pub struct PublishResult {
    inner: BoxFuture<'static, Result<String, BrokerError>>,
}

impl PublishResult {
    pub fn new(fut: impl Future<Output = Result<String, BrokerError>> + Send + 'static) -> Self {
        Self { inner: Box::pin(fut) }
    }

    /// Already-resolved result.
    pub fn ready(result: Result<String, BrokerError>) -> Self {
        Self::new(std::future::ready(result))
    }

    /// Wait for the broker to accept the message.
    pub async fn get(self) -> Result<String, BrokerError> {
        self.inner.await
    }
}

impl std::fmt::Debug for PublishResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishResult").finish_non_exhaustive()
    }
}

/// One inbound delivery, as handed out by a subscription handle.
///
/// `ack` / `nack` are fire-and-forget; only the first call on a delivery
/// has an effect, which the broker enforces.
pub trait ReceivedMessage: Send + Sync {
    fn id(&self) -> &str;
    fn ack_id(&self) -> &str;
    fn data(&self) -> &[u8];
    fn attributes(&self) -> &HashMap<String, String>;
    fn publish_time(&self) -> SystemTime;
    fn ordering_key(&self) -> &str;
    /// `None` unless the subscription tracks delivery attempts.
    fn delivery_attempt(&self) -> Option<u32>;
    fn ack(&self);
    fn nack(&self);
}

/// Callback invoked by a receive loop for every delivery.
pub type MessageHandler =
    Arc<dyn Fn(Box<dyn ReceivedMessage>) -> BoxFuture<'static, ()> + Send + Sync>;

// ════════════════════════════════════════════════════════════════
//  Handles
// ════════════════════════════════════════════════════════════════

/// Broker-level publish handle for one topic id.
pub trait TopicHandle: Send + Sync {
    /// Topic id as given by the caller.
    fn id(&self) -> &str;
    /// Fully qualified name, `projects/{p}/topics/{id}`.
    fn name(&self) -> String;
    fn exists(&self) -> BoxFuture<'_, Result<bool, BrokerError>>;
    fn config(&self) -> BoxFuture<'_, Result<TopicConfig, BrokerError>>;
    /// Replace the batching settings used for subsequent publishes.
    fn configure(&self, settings: PublishSettings, enable_message_ordering: bool);
    fn publish(&self, message: OutgoingMessage) -> PublishResult;
    /// Flush buffered messages and stop accepting new ones.
    fn stop(&self) -> BoxFuture<'_, ()>;
}

/// Broker-level consume handle for one subscription id.
pub trait SubscriptionHandle: Send + Sync {
    fn id(&self) -> &str;
    /// Fully qualified name, `projects/{p}/subscriptions/{id}`.
    fn name(&self) -> String;
    fn exists(&self) -> BoxFuture<'_, Result<bool, BrokerError>>;
    fn config(&self) -> BoxFuture<'_, Result<SubscriptionConfig, BrokerError>>;
    /// Run the receive loop until `cancel` fires or the broker shuts down.
    fn receive(
        &self,
        cancel: CancellationToken,
        settings: ReceiveSettings,
        handler: MessageHandler,
    ) -> BoxFuture<'_, Result<(), BrokerError>>;
}

// ════════════════════════════════════════════════════════════════
//  Clients
// ════════════════════════════════════════════════════════════════

pub trait BrokerClient: Send + Sync {
    fn project_id(&self) -> &str;

    /// Handle for `id`. Does not check that the topic exists.
    fn topic(&self, id: &str) -> Arc<dyn TopicHandle>;

    /// Handle for `id`. Does not check that the subscription exists.
    fn subscription(&self, id: &str) -> Arc<dyn SubscriptionHandle>;

    fn create_topic(
        &self,
        id: &str,
        config: TopicConfig,
    ) -> BoxFuture<'_, Result<Arc<dyn TopicHandle>, BrokerError>>;

    /// `config.topic` is the id of the topic to bind to.
    fn create_subscription(
        &self,
        id: &str,
        config: SubscriptionConfig,
    ) -> BoxFuture<'_, Result<Arc<dyn SubscriptionHandle>, BrokerError>>;
}

pub trait SchemaClient: Send + Sync {
    /// Fetch a schema by its normalized id.
    fn schema(&self, id: &str) -> BoxFuture<'_, Result<SchemaConfig, BrokerError>>;

    /// Create a schema; the returned config carries its qualified name.
    fn create_schema(
        &self,
        id: &str,
        config: SchemaConfig,
    ) -> BoxFuture<'_, Result<SchemaConfig, BrokerError>>;
}

/// Opens broker clients for a project.
pub trait ClientFactory: Send + Sync {
    fn create(&self, project_id: &str) -> BoxFuture<'_, Result<Arc<dyn BrokerClient>, BrokerError>>;
}
