use pubsub_api::BrokerError;

/// An RPC received by the emulator, offered to reactors before it is
/// served. Resource names are fully qualified (`projects/{p}/...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    CreateTopic { topic: String },
    GetTopic { topic: String },
    CreateSubscription { subscription: String, topic: String },
    GetSubscription { subscription: String },
    CreateSchema { schema: String },
    GetSchema { schema: String },
    Publish { topic: String, message_ids: Vec<String> },
    Pull { subscription: String },
    Acknowledge { subscription: String, ack_ids: Vec<String> },
    /// A zero deadline is how clients nack.
    ModifyAckDeadline {
        subscription: String,
        ack_ids: Vec<String>,
        ack_deadline_seconds: i32,
    },
}

impl Request {
    /// RPC method name, as used for reactor registration.
    pub fn method(&self) -> &'static str {
        match self {
            Request::CreateTopic { .. } => "CreateTopic",
            Request::GetTopic { .. } => "GetTopic",
            Request::CreateSubscription { .. } => "CreateSubscription",
            Request::GetSubscription { .. } => "GetSubscription",
            Request::CreateSchema { .. } => "CreateSchema",
            Request::GetSchema { .. } => "GetSchema",
            Request::Publish { .. } => "Publish",
            Request::Pull { .. } => "Pull",
            Request::Acknowledge { .. } => "Acknowledge",
            Request::ModifyAckDeadline { .. } => "ModifyAckDeadline",
        }
    }
}

/// Outcome of offering a request to a reactor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    /// Stop offering the request to further reactors.
    pub handled: bool,
    /// With `handled`, fail the request with this error.
    pub error: Option<BrokerError>,
}

impl Reaction {
    /// Observe only; the request proceeds normally.
    pub fn ignore() -> Self {
        Self::default()
    }

    /// Fail the request.
    pub fn fail(error: BrokerError) -> Self {
        Self {
            handled: true,
            error: Some(error),
        }
    }
}

/// Observer of emulator RPCs, registered for the method names it
/// returns from `func_names`.
pub trait Reactor: Send + Sync {
    fn func_names(&self) -> Vec<&'static str>;
    fn react(&self, request: &Request) -> Reaction;
}
