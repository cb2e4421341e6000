use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::SystemTime;

use pubsub_api::{
    BoxFuture, BrokerClient, BrokerError, ClientFactory, OutgoingMessage, SchemaClient,
    SchemaConfig, SubscriptionConfig, TopicConfig, normalize_schema_id,
    normalize_subscription_name, schema_name, topic_name,
};
use tokio::sync::Notify;

use crate::client::EmulatorClient;
use crate::reactor::{Reactor, Request};

// ════════════════════════════════════════════════════════════════
//  State
// ════════════════════════════════════════════════════════════════

/// A published message as stored for one subscription.
#[derive(Debug, Clone)]
pub(crate) struct StoredMessage {
    pub id: String,
    pub data: Vec<u8>,
    pub attributes: HashMap<String, String>,
    pub ordering_key: String,
    pub publish_time: SystemTime,
    pub delivery_attempt: u32,
}

struct SubscriptionState {
    config: SubscriptionConfig,
    pending: VecDeque<StoredMessage>,
    outstanding: HashMap<String, StoredMessage>,
    notify: Arc<Notify>,
}

#[derive(Default)]
struct State {
    topics: HashMap<String, TopicConfig>,
    subscriptions: HashMap<String, SubscriptionState>,
    schemas: HashMap<String, SchemaConfig>,
}

pub(crate) struct Shared {
    project_id: String,
    state: Mutex<State>,
    reactors: RwLock<HashMap<&'static str, Vec<Arc<dyn Reactor>>>>,
    next_message_id: AtomicU64,
    next_ack_id: AtomicU64,
}

/// In-process stand-in for the broker and the schema service of one
/// project.
///
/// Cloning is cheap; clones share the same state. Every RPC is first
/// offered to the reactors registered for its method name.
#[derive(Clone)]
pub struct Emulator {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Emulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emulator")
            .field("project_id", &self.shared.project_id)
            .finish_non_exhaustive()
    }
}

impl Emulator {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                project_id: project_id.into(),
                state: Mutex::new(State::default()),
                reactors: RwLock::new(HashMap::new()),
                next_message_id: AtomicU64::new(1),
                next_ack_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.shared.project_id
    }

    /// Register `reactor` for each of its method names. Reactors are
    /// offered requests in registration order.
    pub fn add_reactor(&self, reactor: Arc<dyn Reactor>) {
        let mut reactors = match self.shared.reactors.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("emulator reactors lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        for name in reactor.func_names() {
            reactors.entry(name).or_default().push(Arc::clone(&reactor));
        }
    }

    /// Broker client bound to this emulator's project.
    pub fn client(&self) -> Arc<dyn BrokerClient> {
        Arc::new(EmulatorClient::new(Arc::clone(&self.shared)))
    }

    /// Messages published to the subscription and not yet delivered.
    pub fn pending(&self, subscription_id: &str) -> usize {
        let name = normalize_subscription_name(&self.shared.project_id, subscription_id);
        self.shared
            .lock()
            .subscriptions
            .get(&name)
            .map_or(0, |s| s.pending.len())
    }

    /// Messages delivered and neither acked nor nacked.
    pub fn outstanding(&self, subscription_id: &str) -> usize {
        let name = normalize_subscription_name(&self.shared.project_id, subscription_id);
        self.shared
            .lock()
            .subscriptions
            .get(&name)
            .map_or(0, |s| s.outstanding.len())
    }
}

impl ClientFactory for Emulator {
    fn create(&self, project_id: &str) -> BoxFuture<'_, Result<Arc<dyn BrokerClient>, BrokerError>> {
        let result = if project_id == self.shared.project_id {
            Ok(self.client())
        } else {
            Err(BrokerError::invalid_argument(format!(
                "project {project_id} is not served by this emulator"
            )))
        };
        Box::pin(std::future::ready(result))
    }
}

impl SchemaClient for Emulator {
    fn schema(&self, id: &str) -> BoxFuture<'_, Result<SchemaConfig, BrokerError>> {
        let name = schema_name(&self.shared.project_id, normalize_schema_id(id));
        Box::pin(async move {
            self.shared.intercept(&Request::GetSchema { schema: name.clone() })?;
            self.shared
                .lock()
                .schemas
                .get(&name)
                .cloned()
                .ok_or_else(|| BrokerError::not_found(format!("schema {name} not found")))
        })
    }

    fn create_schema(
        &self,
        id: &str,
        config: SchemaConfig,
    ) -> BoxFuture<'_, Result<SchemaConfig, BrokerError>> {
        let name = schema_name(&self.shared.project_id, id);
        Box::pin(async move {
            self.shared.intercept(&Request::CreateSchema { schema: name.clone() })?;
            let mut state = self.shared.lock();
            if state.schemas.contains_key(&name) {
                return Err(BrokerError::already_exists(format!("schema {name} already exists")));
            }
            let created = SchemaConfig { name: name.clone(), ..config };
            state.schemas.insert(name, created.clone());
            Ok(created)
        })
    }
}

// ════════════════════════════════════════════════════════════════
//  Shared operations (used by the client handles)
// ════════════════════════════════════════════════════════════════

impl Shared {
    pub(crate) fn project_id(&self) -> &str {
        &self.project_id
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("emulator state lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Offer `request` to its reactors. A reaction that is handled with
    /// an error fails the request; a handled reaction without one only
    /// stops later reactors from seeing it.
    pub(crate) fn intercept(&self, request: &Request) -> Result<(), BrokerError> {
        let reactors = match self.reactors.read() {
            Ok(guard) => guard.get(request.method()).cloned().unwrap_or_default(),
            Err(poisoned) => {
                tracing::warn!("emulator reactors lock was poisoned, recovering");
                poisoned.into_inner().get(request.method()).cloned().unwrap_or_default()
            }
        };

        for reactor in reactors {
            let reaction = reactor.react(request);
            if reaction.handled {
                return match reaction.error {
                    Some(e) => Err(e),
                    None => Ok(()),
                };
            }
        }
        Ok(())
    }

    pub(crate) fn topic_config(&self, topic_id: &str) -> Result<Option<TopicConfig>, BrokerError> {
        let name = topic_name(&self.project_id, topic_id);
        self.intercept(&Request::GetTopic { topic: name.clone() })?;
        Ok(self.lock().topics.get(&name).cloned())
    }

    pub(crate) fn create_topic(&self, topic_id: &str, config: TopicConfig) -> Result<(), BrokerError> {
        let name = topic_name(&self.project_id, topic_id);
        self.intercept(&Request::CreateTopic { topic: name.clone() })?;

        let mut state = self.lock();
        if state.topics.contains_key(&name) {
            return Err(BrokerError::already_exists(format!("topic {name} already exists")));
        }
        state.topics.insert(name.clone(), TopicConfig { name, ..config });
        Ok(())
    }

    pub(crate) fn subscription_config(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionConfig>, BrokerError> {
        let name = normalize_subscription_name(&self.project_id, subscription_id);
        self.intercept(&Request::GetSubscription { subscription: name.clone() })?;
        Ok(self.lock().subscriptions.get(&name).map(|s| s.config.clone()))
    }

    pub(crate) fn create_subscription(
        &self,
        subscription_id: &str,
        config: SubscriptionConfig,
    ) -> Result<(), BrokerError> {
        let name = normalize_subscription_name(&self.project_id, subscription_id);
        let topic = topic_name(&self.project_id, &config.topic);
        self.intercept(&Request::CreateSubscription {
            subscription: name.clone(),
            topic: topic.clone(),
        })?;

        let mut state = self.lock();
        if !state.topics.contains_key(&topic) {
            return Err(BrokerError::not_found(format!("topic {topic} not found")));
        }
        if state.subscriptions.contains_key(&name) {
            return Err(BrokerError::already_exists(format!(
                "subscription {name} already exists"
            )));
        }
        state.subscriptions.insert(
            name.clone(),
            SubscriptionState {
                config: SubscriptionConfig { name, ..config },
                pending: VecDeque::new(),
                outstanding: HashMap::new(),
                notify: Arc::new(Notify::new()),
            },
        );
        Ok(())
    }

    /// Store the message for every subscription bound to the topic and
    /// return its id.
    pub(crate) fn publish(&self, topic_id: &str, message: OutgoingMessage) -> Result<String, BrokerError> {
        let name = topic_name(&self.project_id, topic_id);
        let id = self.next_message_id.fetch_add(1, Ordering::Relaxed).to_string();
        self.intercept(&Request::Publish {
            topic: name.clone(),
            message_ids: vec![id.clone()],
        })?;

        let mut state = self.lock();
        if !state.topics.contains_key(&name) {
            return Err(BrokerError::not_found(format!("topic {name} not found")));
        }

        let stored = StoredMessage {
            id: id.clone(),
            data: message.data,
            attributes: message.attributes,
            ordering_key: message.ordering_key,
            publish_time: SystemTime::now(),
            delivery_attempt: 1,
        };

        let mut delivered = 0;
        for subscription in state.subscriptions.values_mut() {
            if subscription.config.topic != topic_id {
                continue;
            }
            subscription.pending.push_back(stored.clone());
            subscription.notify.notify_one();
            delivered += 1;
        }

        tracing::trace!(topic = %name, message_id = %id, subscriptions = delivered, "message published");
        Ok(id)
    }

    /// Signal a receive loop starting on the subscription.
    pub(crate) fn pull(&self, subscription_name: &str) -> Result<Arc<Notify>, BrokerError> {
        self.intercept(&Request::Pull { subscription: subscription_name.to_string() })?;
        self.lock()
            .subscriptions
            .get(subscription_name)
            .map(|s| Arc::clone(&s.notify))
            .ok_or_else(|| {
                BrokerError::not_found(format!("subscription {subscription_name} not found"))
            })
    }

    /// Move the next pending message to the outstanding set under a
    /// fresh ack id.
    pub(crate) fn lease(&self, subscription_name: &str) -> Option<(String, StoredMessage)> {
        let mut state = self.lock();
        let subscription = state.subscriptions.get_mut(subscription_name)?;
        let message = subscription.pending.pop_front()?;

        let ack_id = format!(
            "{}-{}",
            message.id,
            self.next_ack_id.fetch_add(1, Ordering::Relaxed)
        );
        subscription.outstanding.insert(ack_id.clone(), message.clone());
        Some((ack_id, message))
    }

    pub(crate) fn acknowledge(&self, subscription_name: &str, ack_id: &str) {
        let request = Request::Acknowledge {
            subscription: subscription_name.to_string(),
            ack_ids: vec![ack_id.to_string()],
        };
        if let Err(e) = self.intercept(&request) {
            tracing::warn!(subscription = %subscription_name, ack_id, error = %e, "acknowledge rejected");
            return;
        }

        let mut state = self.lock();
        if let Some(subscription) = state.subscriptions.get_mut(subscription_name) {
            subscription.outstanding.remove(ack_id);
        }
    }

    /// Zero deadline: redeliver the message with its attempt count bumped.
    pub(crate) fn modify_ack_deadline(&self, subscription_name: &str, ack_id: &str, seconds: i32) {
        let request = Request::ModifyAckDeadline {
            subscription: subscription_name.to_string(),
            ack_ids: vec![ack_id.to_string()],
            ack_deadline_seconds: seconds,
        };
        if let Err(e) = self.intercept(&request) {
            tracing::warn!(subscription = %subscription_name, ack_id, error = %e, "modify ack deadline rejected");
            return;
        }
        if seconds != 0 {
            return;
        }

        let mut state = self.lock();
        let Some(subscription) = state.subscriptions.get_mut(subscription_name) else {
            return;
        };
        if let Some(mut message) = subscription.outstanding.remove(ack_id) {
            message.delivery_attempt += 1;
            subscription.pending.push_back(message);
            subscription.notify.notify_one();
        }
    }
}
