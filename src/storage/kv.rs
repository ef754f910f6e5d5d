use async_trait::async_trait;
use serde_json::Value;

/// Error type for key-value persistence operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("could not read key '{key}': {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write key '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not decode value for key '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not encode value for key '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Read-side failures (including decode) degrade to defaults at load;
    /// write-side failures propagate to the mutating caller.
    pub fn is_read(&self) -> bool {
        matches!(self, StorageError::Read { .. } | StorageError::Decode { .. })
    }
}

/// An opaque durable map of string keys to JSON-serializable values.
///
/// The stores treat this as their only persistence boundary. No atomicity
/// is promised across keys; each key is written independently and the last
/// write to settle wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value under `key`, or `None` if the key has never been set.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Replace the value under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Remove the value under `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every key.
    async fn clear(&self) -> Result<(), StorageError>;
}
