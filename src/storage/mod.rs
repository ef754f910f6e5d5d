pub mod json_file;
pub mod kv;
pub mod memory;

pub use json_file::JsonFileStore;
pub use kv::{KeyValueStore, StorageError};
pub use memory::MemoryStore;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Read and decode a typed value from a store key.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key).await? {
        Some(value) => {
            let decoded = serde_json::from_value(value).map_err(|e| StorageError::Decode {
                key: key.to_string(),
                source: e,
            })?;
            Ok(Some(decoded))
        }
        None => Ok(None),
    }
}

/// Encode and write a typed value under a store key.
pub async fn set_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let encoded = serde_json::to_value(value).map_err(|e| StorageError::Encode {
        key: key.to_string(),
        source: e,
    })?;
    store.set(key, encoded).await
}
