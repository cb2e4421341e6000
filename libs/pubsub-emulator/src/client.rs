use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use pubsub_api::{
    BoxFuture, BrokerClient, BrokerError, CancellationToken, MessageHandler, OutgoingMessage,
    PublishResult, PublishSettings, ReceiveSettings, ReceivedMessage, SubscriptionConfig,
    SubscriptionHandle, TopicConfig, TopicHandle, normalize_subscription_name, topic_name,
};
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;

use crate::server::{Shared, StoredMessage};

/// Broker client handed out by [`crate::Emulator`].
pub struct EmulatorClient {
    shared: Arc<Shared>,
}

impl EmulatorClient {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

impl BrokerClient for EmulatorClient {
    fn project_id(&self) -> &str {
        self.shared.project_id()
    }

    fn topic(&self, id: &str) -> Arc<dyn TopicHandle> {
        Arc::new(EmulatorTopic::new(Arc::clone(&self.shared), id))
    }

    fn subscription(&self, id: &str) -> Arc<dyn SubscriptionHandle> {
        Arc::new(EmulatorSubscription::new(Arc::clone(&self.shared), id))
    }

    fn create_topic(
        &self,
        id: &str,
        config: TopicConfig,
    ) -> BoxFuture<'_, Result<Arc<dyn TopicHandle>, BrokerError>> {
        let id = id.to_string();
        Box::pin(async move {
            self.shared.create_topic(&id, config)?;
            Ok(self.topic(&id))
        })
    }

    fn create_subscription(
        &self,
        id: &str,
        config: SubscriptionConfig,
    ) -> BoxFuture<'_, Result<Arc<dyn SubscriptionHandle>, BrokerError>> {
        let id = id.to_string();
        Box::pin(async move {
            self.shared.create_subscription(&id, config)?;
            Ok(self.subscription(&id))
        })
    }
}

// ════════════════════════════════════════════════════════════════
//  Topic
// ════════════════════════════════════════════════════════════════

struct PublishState {
    settings: PublishSettings,
    enable_message_ordering: bool,
}

/// Publishes straight into the emulator state; there is no batching, so
/// every result is resolved by the time `publish` returns.
pub struct EmulatorTopic {
    shared: Arc<Shared>,
    id: String,
    state: Mutex<PublishState>,
    stopped: AtomicBool,
}

impl EmulatorTopic {
    fn new(shared: Arc<Shared>, id: &str) -> Self {
        Self {
            shared,
            id: id.to_string(),
            state: Mutex::new(PublishState {
                settings: PublishSettings::default(),
                enable_message_ordering: false,
            }),
            stopped: AtomicBool::new(false),
        }
    }

    fn ordering_enabled(&self) -> bool {
        match self.state.lock() {
            Ok(state) => state.enable_message_ordering,
            Err(poisoned) => {
                tracing::warn!("emulator topic lock was poisoned, recovering");
                poisoned.into_inner().enable_message_ordering
            }
        }
    }
}

impl TopicHandle for EmulatorTopic {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> String {
        topic_name(self.shared.project_id(), &self.id)
    }

    fn exists(&self) -> BoxFuture<'_, Result<bool, BrokerError>> {
        Box::pin(async move { Ok(self.shared.topic_config(&self.id)?.is_some()) })
    }

    fn config(&self) -> BoxFuture<'_, Result<TopicConfig, BrokerError>> {
        Box::pin(async move {
            self.shared
                .topic_config(&self.id)?
                .ok_or_else(|| BrokerError::not_found(format!("topic {} not found", self.name())))
        })
    }

    fn configure(&self, settings: PublishSettings, enable_message_ordering: bool) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("emulator topic lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        state.settings = settings;
        state.enable_message_ordering = enable_message_ordering;
    }

    fn publish(&self, message: OutgoingMessage) -> PublishResult {
        if self.stopped.load(Ordering::Acquire) {
            return PublishResult::ready(Err(BrokerError::unavailable(format!(
                "topic {} has been stopped",
                self.name()
            ))));
        }
        if !message.ordering_key.is_empty() && !self.ordering_enabled() {
            return PublishResult::ready(Err(BrokerError::invalid_argument(
                "message ordering is disabled on the topic, but an ordering key was set",
            )));
        }
        PublishResult::ready(self.shared.publish(&self.id, message))
    }

    fn stop(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if !self.stopped.swap(true, Ordering::AcqRel) {
                tracing::debug!(topic = %self.name(), "topic stopped");
            }
        })
    }
}

// ════════════════════════════════════════════════════════════════
//  Subscription
// ════════════════════════════════════════════════════════════════

pub struct EmulatorSubscription {
    shared: Arc<Shared>,
    id: String,
}

impl EmulatorSubscription {
    fn new(shared: Arc<Shared>, id: &str) -> Self {
        Self {
            shared,
            id: id.to_string(),
        }
    }

    /// Next leased message, or `None` once `cancel` fires.
    async fn next(
        &self,
        name: &str,
        notify: &Notify,
        cancel: &CancellationToken,
    ) -> Option<(String, StoredMessage)> {
        loop {
            if let Some(leased) = self.shared.lease(name) {
                return Some(leased);
            }
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = notify.notified() => {}
            }
        }
    }
}

impl SubscriptionHandle for EmulatorSubscription {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> String {
        normalize_subscription_name(self.shared.project_id(), &self.id)
    }

    fn exists(&self) -> BoxFuture<'_, Result<bool, BrokerError>> {
        Box::pin(async move { Ok(self.shared.subscription_config(&self.id)?.is_some()) })
    }

    fn config(&self) -> BoxFuture<'_, Result<SubscriptionConfig, BrokerError>> {
        Box::pin(async move {
            self.shared.subscription_config(&self.id)?.ok_or_else(|| {
                BrokerError::not_found(format!("subscription {} not found", self.name()))
            })
        })
    }

    /// Handlers run concurrently, at most
    /// `min(num_workers, max_outstanding_messages)` at a time; limits past
    /// `Semaphore::MAX_PERMITS` count as unbounded. Returns
    /// once `cancel` fires and every running handler has finished.
    fn receive(
        &self,
        cancel: CancellationToken,
        settings: ReceiveSettings,
        handler: MessageHandler,
    ) -> BoxFuture<'_, Result<(), BrokerError>> {
        Box::pin(async move {
            let name = self.name();
            let notify = self.shared.pull(&name)?;

            let limit = settings
                .num_workers
                .min(settings.max_outstanding_messages)
                .clamp(1, Semaphore::MAX_PERMITS);
            let permits = Arc::new(Semaphore::new(limit));
            let mut handlers = JoinSet::new();
            tracing::debug!(subscription = %name, concurrency = limit, "receive loop started");

            loop {
                let permit = tokio::select! {
                    _ = cancel.cancelled() => break,
                    permit = Arc::clone(&permits).acquire_owned() => {
                        permit.map_err(|e| BrokerError::internal(e.to_string()))?
                    }
                };
                let Some((ack_id, stored)) = self.next(&name, &notify, &cancel).await else {
                    break;
                };

                let message = EmulatedMessage::new(Arc::clone(&self.shared), name.clone(), ack_id, stored);
                let handler = Arc::clone(&handler);
                handlers.spawn(async move {
                    handler(Box::new(message)).await;
                    drop(permit);
                });

                while handlers.try_join_next().is_some() {}
            }

            while handlers.join_next().await.is_some() {}
            tracing::debug!(subscription = %name, "receive loop stopped");
            Ok(())
        })
    }
}

// ════════════════════════════════════════════════════════════════
//  Delivery
// ════════════════════════════════════════════════════════════════

/// One delivery of a stored message. Only the first `ack` or `nack`
/// reaches the emulator.
pub struct EmulatedMessage {
    shared: Arc<Shared>,
    subscription: String,
    ack_id: String,
    message: StoredMessage,
    settled: AtomicBool,
}

impl EmulatedMessage {
    fn new(shared: Arc<Shared>, subscription: String, ack_id: String, message: StoredMessage) -> Self {
        Self {
            shared,
            subscription,
            ack_id,
            message,
            settled: AtomicBool::new(false),
        }
    }

    fn settle(&self) -> bool {
        !self.settled.swap(true, Ordering::AcqRel)
    }
}

impl ReceivedMessage for EmulatedMessage {
    fn id(&self) -> &str {
        &self.message.id
    }

    fn ack_id(&self) -> &str {
        &self.ack_id
    }

    fn data(&self) -> &[u8] {
        &self.message.data
    }

    fn attributes(&self) -> &HashMap<String, String> {
        &self.message.attributes
    }

    fn publish_time(&self) -> SystemTime {
        self.message.publish_time
    }

    fn ordering_key(&self) -> &str {
        &self.message.ordering_key
    }

    fn delivery_attempt(&self) -> Option<u32> {
        Some(self.message.delivery_attempt)
    }

    fn ack(&self) {
        if self.settle() {
            self.shared.acknowledge(&self.subscription, &self.ack_id);
        }
    }

    fn nack(&self) {
        if self.settle() {
            self.shared.modify_ack_deadline(&self.subscription, &self.ack_id, 0);
        }
    }
}
