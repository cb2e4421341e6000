use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════
//  Schema Type / Encoding
// ════════════════════════════════════════════════════════════════

/// Structural contract family of a schema.
///
/// `Unrecognized` carries a raw value reported by the schema service that
/// this crate does not know about; the codec factory rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaType {
    #[default]
    Unspecified,
    Avro,
    ProtocolBuffer,
    #[serde(skip)]
    Unrecognized(i32),
}

impl std::fmt::Display for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaType::Unspecified => write!(f, "unspecified"),
            SchemaType::Avro => write!(f, "avro"),
            SchemaType::ProtocolBuffer => write!(f, "protocol-buffer"),
            SchemaType::Unrecognized(v) => write!(f, "unrecognized({v})"),
        }
    }
}

/// Wire encoding of messages validated against a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaEncoding {
    #[default]
    Unspecified,
    Binary,
    Json,
    #[serde(skip)]
    Unrecognized(i32),
}

impl std::fmt::Display for SchemaEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaEncoding::Unspecified => write!(f, "unspecified"),
            SchemaEncoding::Binary => write!(f, "binary"),
            SchemaEncoding::Json => write!(f, "json"),
            SchemaEncoding::Unrecognized(v) => write!(f, "unrecognized({v})"),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Resource Configurations
// ════════════════════════════════════════════════════════════════

/// Schema as stored by the schema service.
///
/// `name` is fully qualified (`projects/{p}/schemas/{id}`) once the
/// schema has been created; it may be empty on a create request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    pub definition: String,
}

impl SchemaConfig {
    pub fn new(schema_type: SchemaType, definition: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            schema_type,
            definition: definition.into(),
        }
    }
}

/// Schema reference attached to a topic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaSettings {
    /// Schema name, plain or fully qualified.
    pub schema: String,
    pub encoding: SchemaEncoding,
}

/// Broker-side topic configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopicConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub schema_settings: Option<SchemaSettings>,
}

impl TopicConfig {
    pub fn with_schema(schema: impl Into<String>, encoding: SchemaEncoding) -> Self {
        Self {
            schema_settings: Some(SchemaSettings { schema: schema.into(), encoding }),
            ..Self::default()
        }
    }
}

/// Broker-side subscription configuration.
///
/// `topic` is the id of the topic the subscription is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(default)]
    pub name: String,
    pub topic: String,
    #[serde(default = "default_ack_deadline", with = "duration_secs")]
    pub ack_deadline: Duration,
    #[serde(default)]
    pub enable_message_ordering: bool,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl SubscriptionConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            topic: topic.into(),
            ack_deadline: default_ack_deadline(),
            enable_message_ordering: false,
            labels: HashMap::new(),
        }
    }
}

fn default_ack_deadline() -> Duration {
    Duration::from_secs(10)
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
