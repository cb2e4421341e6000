use pubsub_api::{BrokerError, CodecError};

/// Kind of broker resource named in an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Topic,
    Subscription,
    Schema,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Topic => f.write_str("topic"),
            Resource::Subscription => f.write_str("subscription"),
            Resource::Schema => f.write_str("schema"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PubSubError {
    #[error("config error: {0}")]
    Config(String),

    #[error("cannot get schema configuration: {0}")]
    SchemaConfig(#[source] BrokerError),

    #[error("cannot get {resource} {id} configuration: {source}")]
    ResourceConfig {
        resource: Resource,
        id: String,
        #[source]
        source: BrokerError,
    },

    #[error("cannot get subscription {id} topic configuration: {source}")]
    TopicConfig {
        id: String,
        #[source]
        source: BrokerError,
    },

    #[error("cannot get {resource} {id} schema configuration: {source}")]
    ResourceSchema {
        resource: Resource,
        id: String,
        #[source]
        source: Box<PubSubError>,
    },

    #[error("cannot create {resource} {id} codec: {source}")]
    ResourceCodec {
        resource: Resource,
        id: String,
        #[source]
        source: CodecError,
    },

    #[error("cannot find {resource} {id}")]
    NotFound { resource: Resource, id: String },

    #[error("cannot create {resource}: {source}")]
    Create {
        resource: Resource,
        #[source]
        source: Box<PubSubError>,
    },

    #[error("cannot get {resource}: {source}")]
    Get {
        resource: Resource,
        #[source]
        source: Box<PubSubError>,
    },

    #[error("cannot encode data: {0}")]
    Encode(#[source] CodecError),

    #[error("cannot receive from subscription {id}: {source}")]
    Receive {
        id: String,
        #[source]
        source: BrokerError,
    },

    #[error("failed to prepare {resource} \"{id}\": {source}")]
    Prepare {
        resource: Resource,
        id: String,
        #[source]
        source: BrokerError,
    },

    #[error("pubsub client creation error after {0} attempts")]
    ClientCreation(u32),

    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),
}

impl PubSubError {
    /// True for a registry miss, at any wrapping depth.
    pub fn is_not_found(&self) -> bool {
        match self {
            PubSubError::NotFound { .. } => true,
            PubSubError::Create { source, .. } | PubSubError::Get { source, .. } => {
                source.is_not_found()
            }
            _ => false,
        }
    }

    /// Add context to the error.
    ///
    /// Only `Config` carries free text; other variants already name their
    /// resource and are returned as-is.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            PubSubError::Config(msg) => PubSubError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wrapped_errors_name_resource_and_cause() {
        let err = PubSubError::Create {
            resource: Resource::Topic,
            source: Box::new(PubSubError::ResourceConfig {
                resource: Resource::Topic,
                id: "events".to_string(),
                source: BrokerError::not_found("topic does not exist"),
            }),
        };
        assert_eq!(
            err.to_string(),
            "cannot create topic: cannot get topic events configuration: topic does not exist"
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn not_found_is_recognizable_through_wrapping() {
        let err = PubSubError::Get {
            resource: Resource::Subscription,
            source: Box::new(PubSubError::NotFound {
                resource: Resource::Subscription,
                id: "events-sub".to_string(),
            }),
        };
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "cannot get subscription: cannot find subscription events-sub"
        );
    }
}
