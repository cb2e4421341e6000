use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use pubsub_api::normalize_subscription_name;

use crate::waiter::{SharedError, Waiter};

// ════════════════════════════════════════════════════════════════
//  WaiterSupervisor
// ════════════════════════════════════════════════════════════════

/// Waiters keyed by a string target.
///
/// Starting a waiter on a target that already has one replaces it; the
/// old waiter can then only be resolved through the handle returned when
/// it was started. Stopping resolves the current waiter and forgets it.
pub struct WaiterSupervisor<T> {
    waiters: Mutex<HashMap<String, Arc<Waiter<T>>>>,
}

impl<T> Default for WaiterSupervisor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for WaiterSupervisor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let targets: Vec<String> = self.lock().keys().cloned().collect();
        f.debug_struct("WaiterSupervisor")
            .field("targets", &targets)
            .finish()
    }
}

impl<T> WaiterSupervisor<T> {
    pub fn new() -> Self {
        Self {
            waiters: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Waiter<T>>>> {
        match self.waiters.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("waiter supervisor lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn start_waiter(&self, target: &str) -> Arc<Waiter<T>> {
        let waiter = Arc::new(Waiter::new());
        if self.lock().insert(target.to_string(), Arc::clone(&waiter)).is_some() {
            tracing::debug!(target, "replaced pending waiter");
        }
        waiter
    }

    /// No-op when nothing waits on `target`.
    pub fn stop_waiter(&self, target: &str, data: T, error: Option<SharedError>) {
        let Some(waiter) = self.lock().remove(target) else {
            tracing::trace!(target, "no waiter to stop");
            return;
        };
        // a replaced waiter may have been stopped through its own handle
        let _ = waiter.stop(data, error);
    }

    pub fn has_waiter(&self, target: &str) -> bool {
        self.lock().contains_key(target)
    }
}

// ════════════════════════════════════════════════════════════════
//  AckSupervisor
// ════════════════════════════════════════════════════════════════

/// Waiters for acks and nacks on subscriptions of one project.
///
/// Waiters are started by subscription id and stopped by fully
/// qualified subscription name, the form the broker reports.
#[derive(Debug)]
pub struct AckSupervisor {
    project_id: String,
    supervisor: WaiterSupervisor<Vec<String>>,
}

fn ack_target(subscription_name: &str) -> String {
    format!("ack::{subscription_name}")
}

fn nack_target(subscription_name: &str) -> String {
    format!("nack::{subscription_name}")
}

impl AckSupervisor {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            supervisor: WaiterSupervisor::new(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn subscription_name(&self, subscription_id: &str) -> String {
        normalize_subscription_name(&self.project_id, subscription_id)
    }

    pub fn start_ack_waiter(&self, subscription_id: &str) -> Arc<Waiter<Vec<String>>> {
        let target = ack_target(&self.subscription_name(subscription_id));
        self.supervisor.start_waiter(&target)
    }

    pub fn stop_ack_waiter(
        &self,
        subscription_name: &str,
        ack_ids: Vec<String>,
        error: Option<SharedError>,
    ) {
        self.supervisor
            .stop_waiter(&ack_target(subscription_name), ack_ids, error);
    }

    pub fn start_nack_waiter(&self, subscription_id: &str) -> Arc<Waiter<Vec<String>>> {
        let target = nack_target(&self.subscription_name(subscription_id));
        self.supervisor.start_waiter(&target)
    }

    pub fn stop_nack_waiter(
        &self,
        subscription_name: &str,
        ack_ids: Vec<String>,
        error: Option<SharedError>,
    ) {
        self.supervisor
            .stop_waiter(&nack_target(subscription_name), ack_ids, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn stop_without_waiter_is_noop() {
        let supervisor = WaiterSupervisor::<u32>::new();
        supervisor.stop_waiter("nobody", 1, None);
        assert!(!supervisor.has_waiter("nobody"));
    }

    #[tokio::test]
    async fn restart_leaves_only_second_waiter_reachable() {
        let supervisor = WaiterSupervisor::new();
        let first = supervisor.start_waiter("target");
        let second = supervisor.start_waiter("target");

        supervisor.stop_waiter("target", 42, None);

        assert!(!first.is_stopped());
        let outcome = second.wait(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.data, 42);
        assert!(!supervisor.has_waiter("target"));
    }

    #[tokio::test]
    async fn ack_and_nack_targets_are_separate() {
        let supervisor = AckSupervisor::new("test-project");
        let ack = supervisor.start_ack_waiter("test-subscription");
        let nack = supervisor.start_nack_waiter("test-subscription");

        supervisor.stop_nack_waiter(
            "projects/test-project/subscriptions/test-subscription",
            vec!["n1".to_string()],
            None,
        );

        assert!(!ack.is_stopped());
        let outcome = nack
            .wait_max_duration(&CancellationToken::new(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(outcome.data, vec!["n1".to_string()]);
    }

    #[test]
    fn stop_by_plain_id_misses() {
        let supervisor = AckSupervisor::new("test-project");
        let ack = supervisor.start_ack_waiter("test-subscription");
        supervisor.stop_ack_waiter("test-subscription", Vec::new(), None);
        assert!(!ack.is_stopped());
    }
}
