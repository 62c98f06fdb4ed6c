//! Persistent configuration/result store.
//!
//! The orchestration core treats persistence as an opaque namespaced
//! key-value dictionary. The SQLite implementation is the production
//! default; an in-memory implementation backs tests.

mod memory;
mod sqlite;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error_handling::{CoreError, CoreResult};

pub use memory::MemoryKeyValueStore;
pub use sqlite::{
    init_db_pool, insert_run_record, query_run_history, run_migrations, RunRecord,
    SqliteKeyValueStore,
};

/// Namespace holding persisted tracking configurations.
pub const NS_CONFIGURATIONS: &str = "configurations";
/// Namespace holding execution summaries.
pub const NS_EXECUTIONS: &str = "executions";

/// Namespaced async key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the raw value for a key, when present.
    async fn get_raw(&self, namespace: &str, key: &str) -> CoreResult<Option<String>>;

    /// Writes a raw value; `encrypt` obfuscates the value at rest.
    async fn set_raw(&self, namespace: &str, key: &str, value: &str, encrypt: bool)
        -> CoreResult<()>;

    /// Deletes a key; deleting an absent key is not an error.
    async fn delete_item(&self, namespace: &str, key: &str) -> CoreResult<()>;

    /// Lists every key in a namespace.
    async fn get_all_keys(&self, namespace: &str) -> CoreResult<Vec<String>>;
}

/// Reads and deserializes a value, falling back to `default` when absent.
pub async fn get_item<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    namespace: &str,
    key: &str,
    default: T,
) -> CoreResult<T> {
    match store.get_raw(namespace, key).await? {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| {
            CoreError::validation(format!("stored value for {namespace}/{key} is malformed: {e}"))
        }),
        None => Ok(default),
    }
}

/// Serializes and writes a value.
pub async fn set_item<T: Serialize>(
    store: &dyn KeyValueStore,
    namespace: &str,
    key: &str,
    value: &T,
    encrypt: bool,
) -> CoreResult<()> {
    let raw = serde_json::to_string(value)
        .map_err(|e| CoreError::validation(format!("unserializable value for {namespace}/{key}: {e}")))?;
    store.set_raw(namespace, key, &raw, encrypt).await
}
