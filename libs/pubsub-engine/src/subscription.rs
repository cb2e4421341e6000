use std::future::Future;
use std::sync::{Arc, Mutex};

use pubsub_api::{
    BoxFuture, CancellationToken, MessageHandler, ReceiveOptions, ReceiveSettings,
    ReceivedMessage, SubscriptionHandle,
};

use crate::codec::SchemaCodec;
use crate::error::{PubSubError, Resource};
use crate::message::Message;
use crate::registry::{Registered, Registry};

pub type SubscriptionRegistry = Registry<Subscription>;

/// A broker subscription handle bound to the codec of its topic schema.
pub struct Subscription {
    handle: Arc<dyn SubscriptionHandle>,
    codec: Arc<SchemaCodec>,
    options: Mutex<ReceiveSettings>,
}

impl Subscription {
    pub fn new(handle: Arc<dyn SubscriptionHandle>, codec: SchemaCodec) -> Self {
        Self {
            handle,
            codec: Arc::new(codec),
            options: Mutex::new(ReceiveSettings::default()),
        }
    }

    pub fn id(&self) -> &str {
        self.handle.id()
    }

    pub fn handle(&self) -> &Arc<dyn SubscriptionHandle> {
        &self.handle
    }

    pub fn codec(&self) -> &SchemaCodec {
        &self.codec
    }

    pub fn options(&self) -> ReceiveSettings {
        self.lock_options().clone()
    }

    /// Overlay `options` onto the defaults; returns the applied settings.
    pub fn with_options(&self, options: &ReceiveOptions) -> ReceiveSettings {
        let settings = options.resolve();
        *self.lock_options() = settings.clone();
        settings
    }

    /// Run the receive loop, handing every delivery to `callback` as a
    /// [`Message`] bound to this subscription's codec.
    ///
    /// Blocks until `cancel` fires or the broker shuts down.
    pub async fn subscribe<F, Fut>(
        &self,
        cancel: CancellationToken,
        options: &ReceiveOptions,
        callback: F,
    ) -> Result<(), PubSubError>
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let settings = self.with_options(options);
        let codec = Arc::clone(&self.codec);
        let callback = Arc::new(callback);

        let handler: MessageHandler = Arc::new(move |base: Box<dyn ReceivedMessage>| {
            let message = Message::new(base, Arc::clone(&codec));
            let callback = Arc::clone(&callback);
            Box::pin(async move { (*callback)(message).await }) as BoxFuture<'static, ()>
        });

        tracing::debug!(subscription = %self.id(), codec = self.codec.name(), "starting receive loop");
        self.handle
            .receive(cancel, settings, handler)
            .await
            .map_err(|source| PubSubError::Receive {
                id: self.id().to_string(),
                source,
            })
    }

    fn lock_options(&self) -> std::sync::MutexGuard<'_, ReceiveSettings> {
        match self.options.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!(subscription = %self.id(), "subscription options lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Registered for Subscription {
    const RESOURCE: Resource = Resource::Subscription;

    fn resource_id(&self) -> &str {
        self.id()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id())
            .field("codec", &self.codec.name())
            .finish()
    }
}
