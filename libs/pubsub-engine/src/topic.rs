use std::sync::{Arc, Mutex};

use pubsub_api::{
    Codec, MessageSettings, OutgoingMessage, Payload, PublishOptions, PublishResult,
    PublishSettings, TopicHandle,
};

use crate::codec::SchemaCodec;
use crate::error::{PubSubError, Resource};
use crate::registry::{Registered, Registry};

pub type TopicRegistry = Registry<Topic>;

/// Publish settings currently applied to a topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicOptions {
    pub publish: PublishSettings,
    pub message: MessageSettings,
}

/// A broker topic handle bound to the codec of its schema.
pub struct Topic {
    handle: Arc<dyn TopicHandle>,
    codec: Arc<SchemaCodec>,
    options: Mutex<TopicOptions>,
}

impl Topic {
    pub fn new(handle: Arc<dyn TopicHandle>, codec: SchemaCodec) -> Self {
        Self {
            handle,
            codec: Arc::new(codec),
            options: Mutex::new(TopicOptions::default()),
        }
    }

    pub fn id(&self) -> &str {
        self.handle.id()
    }

    pub fn handle(&self) -> &Arc<dyn TopicHandle> {
        &self.handle
    }

    pub fn codec(&self) -> &SchemaCodec {
        &self.codec
    }

    pub fn options(&self) -> TopicOptions {
        self.lock_options().clone()
    }

    /// Overlay `options` onto the defaults and apply the result to the
    /// underlying handle. Returns the applied message settings.
    pub fn with_options(&self, options: &PublishOptions) -> MessageSettings {
        let mut current = self.lock_options();
        self.apply(&mut current, options)
    }

    fn apply(&self, current: &mut TopicOptions, options: &PublishOptions) -> MessageSettings {
        let (publish, message) = options.resolve();
        self.handle
            .configure(publish.clone(), message.enable_message_ordering());
        *current = TopicOptions {
            publish,
            message: message.clone(),
        };
        message
    }

    /// Encode `data` with the topic codec and submit it.
    ///
    /// Does not wait for the broker: await the returned result for the
    /// server-assigned message id.
    ///
    /// The handle settings are shared by every caller of this topic, so
    /// the options lock is held from `configure` until the message is
    /// handed over. Otherwise a concurrent publish without an ordering
    /// key could turn ordering off under a keyed one.
    pub fn publish(
        &self,
        data: &Payload,
        options: &PublishOptions,
    ) -> Result<PublishResult, PubSubError> {
        let encoded = self.codec.encode(data).map_err(PubSubError::Encode)?;

        let mut current = self.lock_options();
        let message = self.apply(&mut current, options);

        tracing::debug!(
            topic = %self.id(),
            codec = self.codec.name(),
            bytes = encoded.len(),
            "publishing message"
        );

        Ok(self.handle.publish(OutgoingMessage {
            data: encoded,
            attributes: message.attributes,
            ordering_key: message.ordering_key,
        }))
    }

    /// Flush buffered messages of the underlying handle.
    pub async fn stop(&self) {
        self.handle.stop().await;
    }

    fn lock_options(&self) -> std::sync::MutexGuard<'_, TopicOptions> {
        match self.options.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!(topic = %self.id(), "topic options lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Registered for Topic {
    const RESOURCE: Resource = Resource::Topic;

    fn resource_id(&self) -> &str {
        self.id()
    }
}

impl std::fmt::Debug for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic")
            .field("id", &self.id())
            .field("codec", &self.codec.name())
            .finish()
    }
}
