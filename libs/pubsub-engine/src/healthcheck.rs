use std::sync::Arc;

use pubsub_api::{BoxFuture, BrokerClient, BrokerError};

pub const TOPICS_PROBE_NAME: &str = "gcppubsub-topics";
pub const SUBSCRIPTIONS_PROBE_NAME: &str = "gcppubsub-subscriptions";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub success: bool,
    pub message: String,
}

/// A named readiness check.
pub trait Probe: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self) -> BoxFuture<'_, ProbeResult>;
}

/// One line per resource, joined with `", "`; fails if any resource is
/// missing or cannot be checked.
fn summarize(kind: &str, results: Vec<(&str, Result<bool, BrokerError>)>) -> ProbeResult {
    let mut success = true;
    let mut messages = Vec::with_capacity(results.len());

    for (name, result) in results {
        match result {
            Ok(true) => messages.push(format!("{kind} {name} exists")),
            Ok(false) => {
                success = false;
                messages.push(format!("{kind} {name} does not exist"));
            }
            Err(e) => {
                success = false;
                messages.push(format!("{kind} {name} error: {e}"));
            }
        }
    }

    ProbeResult {
        success,
        message: messages.join(", "),
    }
}

/// Checks that every configured topic exists.
pub struct TopicsProbe {
    client: Arc<dyn BrokerClient>,
    topics: Vec<String>,
}

impl TopicsProbe {
    pub fn new(client: Arc<dyn BrokerClient>, topics: Vec<String>) -> Self {
        Self { client, topics }
    }
}

impl Probe for TopicsProbe {
    fn name(&self) -> &str {
        TOPICS_PROBE_NAME
    }

    fn check(&self) -> BoxFuture<'_, ProbeResult> {
        Box::pin(async move {
            let mut results = Vec::with_capacity(self.topics.len());
            for topic in &self.topics {
                let exists = self.client.topic(topic).exists().await;
                results.push((topic.as_str(), exists));
            }
            summarize("topic", results)
        })
    }
}

/// Checks that every configured subscription exists.
pub struct SubscriptionsProbe {
    client: Arc<dyn BrokerClient>,
    subscriptions: Vec<String>,
}

impl SubscriptionsProbe {
    pub fn new(client: Arc<dyn BrokerClient>, subscriptions: Vec<String>) -> Self {
        Self { client, subscriptions }
    }
}

impl Probe for SubscriptionsProbe {
    fn name(&self) -> &str {
        SUBSCRIPTIONS_PROBE_NAME
    }

    fn check(&self) -> BoxFuture<'_, ProbeResult> {
        Box::pin(async move {
            let mut results = Vec::with_capacity(self.subscriptions.len());
            for subscription in &self.subscriptions {
                let exists = self.client.subscription(subscription).exists().await;
                results.push((subscription.as_str(), exists));
            }
            summarize("subscription", results)
        })
    }
}
