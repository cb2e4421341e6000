use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{PubSubError, Resource};

/// An entity that can be held by a [`Registry`].
pub trait Registered: Send + Sync {
    const RESOURCE: Resource;

    /// Id of the wrapped broker handle; the registry key.
    fn resource_id(&self) -> &str;
}

/// Thread-safe id → entity map, populated on first use.
///
/// `has` + `add` sequences are not atomic: two callers racing on the same
/// new id may both create the entity, and the second `add` wins. Entity
/// creation has no broker-side effects, so the loser is simply dropped.
pub struct Registry<T> {
    entries: Mutex<HashMap<String, Arc<T>>>,
}

impl<T: Registered> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Registered> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<T>>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!(resource = %T::RESOURCE, "registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn has(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn get(&self, id: &str) -> Result<Arc<T>, PubSubError> {
        self.lock().get(id).cloned().ok_or_else(|| PubSubError::NotFound {
            resource: T::RESOURCE,
            id: id.to_string(),
        })
    }

    /// Insert `entity` under its own resource id, replacing any previous entry.
    pub fn add(&self, entity: Arc<T>) {
        let id = entity.resource_id().to_string();
        tracing::info!(resource = %T::RESOURCE, id = %id, "registered");
        self.lock().insert(id, entity);
    }

    /// Snapshot of every registered entity.
    pub fn all(&self) -> HashMap<String, Arc<T>> {
        self.lock().clone()
    }
}

impl<T: Registered> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        f.debug_struct("Registry")
            .field("resource", &T::RESOURCE)
            .field("ids", &ids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Entity {
        id: String,
    }

    impl Registered for Entity {
        const RESOURCE: Resource = Resource::Topic;

        fn resource_id(&self) -> &str {
            &self.id
        }
    }

    fn entity(id: &str) -> Arc<Entity> {
        Arc::new(Entity { id: id.to_string() })
    }

    #[test]
    fn get_before_add_is_not_found() {
        let registry = Registry::<Entity>::new();
        assert!(!registry.has("events"));

        let err = registry.get("events").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "cannot find topic events");
    }

    #[test]
    fn get_after_add_returns_same_instance() {
        let registry = Registry::<Entity>::new();
        let added = entity("events");
        registry.add(Arc::clone(&added));

        assert!(registry.has("events"));
        assert!(Arc::ptr_eq(&registry.get("events").unwrap(), &added));
    }

    #[test]
    fn all_lists_every_entity() {
        let registry = Registry::<Entity>::new();
        registry.add(entity("a"));
        registry.add(entity("b"));

        let mut ids: Vec<String> = registry.all().into_keys().collect();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn second_add_replaces_first() {
        let registry = Registry::<Entity>::new();
        registry.add(entity("a"));
        let second = entity("a");
        registry.add(Arc::clone(&second));

        assert_eq!(registry.all().len(), 1);
        assert!(Arc::ptr_eq(&registry.get("a").unwrap(), &second));
    }
}
