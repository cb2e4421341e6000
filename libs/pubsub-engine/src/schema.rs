use std::collections::HashMap;
use std::sync::Arc;

use pubsub_api::{SchemaClient, SchemaConfig, normalize_schema_id};
use tokio::sync::Mutex;

use crate::error::PubSubError;

/// Caching lookup of schema configurations, keyed by normalized id.
///
/// Entries are never invalidated: a schema changed or deleted on the
/// schema service stays visible here until the process restarts.
///
/// The lock is held across the remote fetch on a miss, so concurrent
/// lookups (even for different ids) queue behind it.
pub struct SchemaConfigRegistry {
    client: Arc<dyn SchemaClient>,
    configs: Mutex<HashMap<String, Arc<SchemaConfig>>>,
}

impl SchemaConfigRegistry {
    pub fn new(client: Arc<dyn SchemaClient>) -> Self {
        Self {
            client,
            configs: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, schema_id: &str) -> Result<Arc<SchemaConfig>, PubSubError> {
        let id = normalize_schema_id(schema_id);
        let mut configs = self.configs.lock().await;

        if let Some(config) = configs.get(id) {
            return Ok(Arc::clone(config));
        }

        let config = self.client.schema(id).await.map_err(PubSubError::SchemaConfig)?;
        let config = Arc::new(config);
        configs.insert(id.to_string(), Arc::clone(&config));
        tracing::debug!(schema = %id, schema_type = %config.schema_type, "cached schema configuration");

        Ok(config)
    }
}

impl std::fmt::Debug for SchemaConfigRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaConfigRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;
    use pubsub_api::{BoxFuture, BrokerError, SchemaType};

    #[derive(Default)]
    struct CountingSchemaClient {
        calls: AtomicUsize,
    }

    impl SchemaClient for CountingSchemaClient {
        fn schema(&self, id: &str) -> BoxFuture<'_, Result<SchemaConfig, BrokerError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let id = id.to_string();
            Box::pin(async move {
                if id == "missing" {
                    return Err(BrokerError::not_found(format!("schema {id} not found")));
                }
                Ok(SchemaConfig {
                    name: format!("projects/p/schemas/{id}"),
                    schema_type: SchemaType::Avro,
                    definition: "{}".to_string(),
                })
            })
        }

        fn create_schema(
            &self,
            _id: &str,
            config: SchemaConfig,
        ) -> BoxFuture<'_, Result<SchemaConfig, BrokerError>> {
            Box::pin(async move { Ok(config) })
        }
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let client = Arc::new(CountingSchemaClient::default());
        let registry = SchemaConfigRegistry::new(client.clone());

        let first = registry.get("foo").await.unwrap();
        let second = registry.get("foo").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn qualified_and_plain_ids_share_an_entry() {
        let client = Arc::new(CountingSchemaClient::default());
        let registry = SchemaConfigRegistry::new(client.clone());

        let qualified = registry.get("projects/p/schemas/foo").await.unwrap();
        let plain = registry.get("foo").await.unwrap();

        assert!(Arc::ptr_eq(&qualified, &plain));
        assert_eq!(plain.name, "projects/p/schemas/foo");
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_failure_is_wrapped_and_not_cached() {
        let client = Arc::new(CountingSchemaClient::default());
        let registry = SchemaConfigRegistry::new(client.clone());

        let err = registry.get("missing").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot get schema configuration: schema missing not found"
        );

        registry.get("missing").await.unwrap_err();
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }
}
