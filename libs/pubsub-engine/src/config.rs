use std::path::PathBuf;
use std::time::Duration;

use pubsub_api::{SchemaConfig, SchemaEncoding, SchemaType, SubscriptionConfig, TopicConfig};
use serde::Deserialize;

use crate::error::PubSubError;

/// Root configuration, parsed from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct PubSubConfig {
    pub project: ProjectConfig,

    #[serde(default)]
    pub factory: FactoryConfig,

    #[serde(default)]
    pub healthcheck: HealthcheckConfig,

    /// Schemas to create on prepare.
    #[serde(default)]
    pub schemas: Vec<SchemaEntry>,

    /// Topics to create on prepare.
    #[serde(default)]
    pub topics: Vec<TopicEntry>,

    /// Subscriptions to create on prepare.
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    pub id: String,
}

/// Client creation retry policy.
#[derive(Debug, Clone, Deserialize)]
pub struct FactoryConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl FactoryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_attempts() -> u32 {
    3
}

fn default_interval_secs() -> u64 {
    1
}

/// Resources checked by the health probes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthcheckConfig {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub subscriptions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    /// Inline definition.
    #[serde(default)]
    pub definition: Option<String>,
    /// Path to a definition file (`.avsc`, `.proto`).
    #[serde(default)]
    pub definition_path: Option<PathBuf>,
}

impl SchemaEntry {
    /// Schema config to create, reading the definition file if needed.
    pub fn to_schema_config(&self) -> Result<SchemaConfig, PubSubError> {
        let definition = match (&self.definition, &self.definition_path) {
            (Some(definition), _) => definition.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                PubSubError::Config(format!("schema '{}': {}: {e}", self.id, path.display()))
            })?,
            (None, None) => {
                return Err(PubSubError::Config(format!(
                    "schema '{}' has no definition",
                    self.id
                )));
            }
        };
        Ok(SchemaConfig::new(self.schema_type, definition))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicEntry {
    pub id: String,
    /// Id of a schema declared in `[[schemas]]`.
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub encoding: Option<SchemaEncoding>,
}

impl TopicEntry {
    /// Topic config to create. Schema settings reference `schema_name`,
    /// the qualified name returned when the schema was created.
    pub fn to_topic_config(&self, schema_name: Option<&str>) -> TopicConfig {
        match (schema_name, self.encoding) {
            (Some(name), Some(encoding)) => TopicConfig::with_schema(name, encoding),
            _ => TopicConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionEntry {
    pub id: String,
    pub topic: String,
    #[serde(default = "default_ack_deadline_secs")]
    pub ack_deadline_secs: u64,
}

fn default_ack_deadline_secs() -> u64 {
    10
}

impl SubscriptionEntry {
    pub fn to_subscription_config(&self) -> SubscriptionConfig {
        SubscriptionConfig {
            ack_deadline: Duration::from_secs(self.ack_deadline_secs),
            ..SubscriptionConfig::new(&self.topic)
        }
    }
}

impl PubSubConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, PubSubError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PubSubError::Config(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, PubSubError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| PubSubError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), PubSubError> {
        if self.project.id.is_empty() {
            return Err(PubSubError::Config("project.id must not be empty".to_string()));
        }

        for schema in &self.schemas {
            if schema.definition.is_some() == schema.definition_path.is_some() {
                return Err(PubSubError::Config(format!(
                    "schema '{}' needs exactly one of definition, definition_path",
                    schema.id
                )));
            }
        }

        for topic in &self.topics {
            let Some(schema) = &topic.schema else { continue };
            if !self.schemas.iter().any(|s| &s.id == schema) {
                return Err(PubSubError::Config(format!(
                    "topic '{}' references unknown schema '{schema}'",
                    topic.id
                )));
            }
            if topic.encoding.is_none() {
                return Err(PubSubError::Config(format!(
                    "topic '{}' has a schema but no encoding",
                    topic.id
                )));
            }
        }

        for subscription in &self.subscriptions {
            if !self.topics.iter().any(|t| t.id == subscription.topic) {
                return Err(PubSubError::Config(format!(
                    "subscription '{}' references unknown topic '{}'",
                    subscription.id, subscription.topic
                )));
            }
        }

        Ok(())
    }
}
