use std::collections::HashMap;
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use super::kv::{KeyValueStore, StorageError};

/// In-memory key-value store for tests and ephemeral runs.
///
/// Reads and writes can be made to fail on demand so callers can exercise
/// the degraded-load and failed-persist paths.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, Value>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `get` fail with a read error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `set` fail with a write error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of the raw stored value, bypassing failure injection.
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.map.lock().unwrap().get(key).cloned()
    }

    fn injected(key: &str, write: bool) -> StorageError {
        let source = io::Error::other("injected failure");
        if write {
            StorageError::Write {
                key: key.to_string(),
                source,
            }
        } else {
            StorageError::Read {
                key: key.to_string(),
                source,
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::injected(key, false));
        }
        Ok(self.map.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::injected(key, true));
        }
        self.map.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::injected(key, true));
        }
        self.map.lock().unwrap().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::injected("*", true));
        }
        self.map.lock().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_get_remove() {
        let store = MemoryStore::new();
        store.set("k", json!({"a": 1})).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({"a": 1})));
        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn injected_write_failure_leaves_value_untouched() {
        let store = MemoryStore::new();
        store.set("k", json!(1)).await.unwrap();

        store.fail_writes(true);
        let err = store.set("k", json!(2)).await.unwrap_err();
        assert!(!err.is_read());
        assert_eq!(store.raw("k"), Some(json!(1)));
    }

    #[tokio::test]
    async fn injected_read_failure_reports_read_error() {
        let store = MemoryStore::new();
        store.fail_reads(true);
        assert!(store.get("k").await.unwrap_err().is_read());
    }
}
