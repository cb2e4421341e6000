use std::sync::Arc;

use pubsub_emulator::{Reaction, Reactor, Request};

use crate::supervisor::AckSupervisor;

/// Resolves ack and nack waiters from the acknowledgement traffic the
/// emulator intercepts. Never handles a request itself.
///
/// Every `ModifyAckDeadline` counts as a nack, whatever the deadline.
#[derive(Debug, Clone)]
pub struct AckReactor {
    supervisor: Arc<AckSupervisor>,
}

impl AckReactor {
    pub fn new(supervisor: Arc<AckSupervisor>) -> Self {
        Self { supervisor }
    }

    pub fn supervisor(&self) -> &Arc<AckSupervisor> {
        &self.supervisor
    }
}

impl Reactor for AckReactor {
    fn func_names(&self) -> Vec<&'static str> {
        vec!["Acknowledge", "ModifyAckDeadline"]
    }

    fn react(&self, request: &Request) -> Reaction {
        match request {
            Request::Acknowledge { subscription, ack_ids } => {
                tracing::debug!(subscription = %subscription, ?ack_ids, "acknowledge intercepted");
                self.supervisor
                    .stop_ack_waiter(subscription, ack_ids.clone(), None);
            }
            Request::ModifyAckDeadline { subscription, ack_ids, .. } => {
                tracing::debug!(subscription = %subscription, ?ack_ids, "nack intercepted");
                self.supervisor
                    .stop_nack_waiter(subscription, ack_ids.clone(), None);
            }
            _ => {}
        }
        Reaction::ignore()
    }
}
