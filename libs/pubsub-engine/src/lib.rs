//! Schema-aware message layer over a publish/subscribe broker client.
//!
//! Topics and subscriptions are resolved lazily: the first publish to (or
//! subscribe on) an id fetches its configuration, resolves its schema
//! through a caching registry, builds the matching codec and caches the
//! resulting entity for the life of the process.

pub mod bootstrap;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod factory;
pub mod healthcheck;
pub mod message;
pub mod prepare;
pub mod publisher;
pub mod registry;
pub mod schema;
pub mod subscriber;
pub mod subscription;
pub mod topic;

pub use bootstrap::PubSub;
pub use client::connect_with_retry;
pub use codec::{CodecFactory, RawCodec, SchemaCodec};
pub use config::PubSubConfig;
pub use error::{PubSubError, Resource};
pub use factory::{SubscriptionFactory, TopicFactory};
pub use healthcheck::{Probe, ProbeResult, SubscriptionsProbe, TopicsProbe};
pub use message::Message;
pub use publisher::Publisher;
pub use registry::{Registered, Registry};
pub use schema::SchemaConfigRegistry;
pub use subscriber::Subscriber;
pub use subscription::{Subscription, SubscriptionRegistry};
pub use topic::{Topic, TopicOptions, TopicRegistry};
