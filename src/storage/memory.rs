//! In-memory key-value store, used by tests and embedded callers.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error_handling::CoreResult;

use super::KeyValueStore;

/// A [`KeyValueStore`] kept entirely in memory.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<(String, String), String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get_raw(&self, namespace: &str, key: &str) -> CoreResult<Option<String>> {
        Ok(self
            .entries
            .read()
            .await
            .get(&(namespace.to_string(), key.to_string()))
            .cloned())
    }

    async fn set_raw(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        _encrypt: bool,
    ) -> CoreResult<()> {
        self.entries
            .write()
            .await
            .insert((namespace.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    async fn delete_item(&self, namespace: &str, key: &str) -> CoreResult<()> {
        self.entries
            .write()
            .await
            .remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }

    async fn get_all_keys(&self, namespace: &str) -> CoreResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .await
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
