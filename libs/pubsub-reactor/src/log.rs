use pubsub_emulator::{Reaction, Reactor, Request};

/// RPC methods traced by [`LogReactor`].
pub const LOGGED_METHODS: [&str; 25] = [
    "GetTopic",
    "UpdateTopic",
    "ListTopics",
    "ListTopicSubscriptions",
    "DeleteTopic",
    "GetSubscription",
    "UpdateSubscription",
    "ListSubscriptions",
    "DeleteSubscription",
    "DetachSubscription",
    "CreateSchema",
    "GetSchema",
    "ListSchemas",
    "ListSchemaRevisions",
    "CommitSchema",
    "RollbackSchema",
    "DeleteSchemaRevision",
    "DeleteSchema",
    "ValidateSchema",
    "Publish",
    "Acknowledge",
    "ModifyAckDeadline",
    "Pull",
    "Seek",
    "ValidateMessage",
];

/// Traces every intercepted request at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReactor;

impl Reactor for LogReactor {
    fn func_names(&self) -> Vec<&'static str> {
        LOGGED_METHODS.to_vec()
    }

    fn react(&self, request: &Request) -> Reaction {
        tracing::debug!(method = request.method(), ?request, "request intercepted");
        Reaction::ignore()
    }
}
