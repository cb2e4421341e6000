//! Contracts shared by the message layer: payloads, schema and resource
//! configurations, the codec trait and the broker collaborator traits.

pub mod broker;
pub mod codec;
pub mod error;
pub mod name;
pub mod payload;
pub mod schema;
pub mod settings;

pub use broker::{
    BoxFuture, BrokerClient, ClientFactory, MessageHandler, OutgoingMessage, PublishResult,
    ReceivedMessage, SchemaClient, SubscriptionHandle, TopicHandle,
};
pub use codec::Codec;
pub use error::{BoxError, BrokerError, CodecError, ErrorKind};
pub use name::{normalize_schema_id, normalize_subscription_name, schema_name, topic_name};
pub use payload::Payload;
pub use schema::{
    SchemaConfig, SchemaEncoding, SchemaSettings, SchemaType, SubscriptionConfig, TopicConfig,
};
pub use settings::{
    FlowControlSettings, LimitExceededBehavior, MessageSettings, PublishOptions, PublishSettings,
    ReceiveOptions, ReceiveSettings,
};

pub use prost_reflect;
pub use tokio_util::sync::CancellationToken;
