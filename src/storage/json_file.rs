use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;

use super::kv::{KeyValueStore, StorageError};

/// Durable key-value store keeping one pretty-printed `<key>.json` file
/// per key under a data directory.
///
/// Writes go through a sibling temp file and a rename, so readers never
/// observe a half-written value.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(JsonFileStore {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read_err(key: &str, source: io::Error) -> StorageError {
        StorageError::Read {
            key: key.to_string(),
            source,
        }
    }

    fn write_err(key: &str, source: io::Error) -> StorageError {
        StorageError::Write {
            key: key.to_string(),
            source,
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::read_err(key, e)),
        };
        let value = serde_json::from_str(&content).map_err(|e| StorageError::Decode {
            key: key.to_string(),
            source: e,
        })?;
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(&value).map_err(|e| StorageError::Encode {
            key: key.to_string(),
            source: e,
        })?;
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, content)
            .await
            .map_err(|e| Self::write_err(key, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| Self::write_err(key, e))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::write_err(key, e)),
        }
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| Self::write_err("*", e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Self::write_err("*", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path)
                    .await
                    .map_err(|e| Self::write_err("*", e))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn get_on_missing_key_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::open(tmp.path()).unwrap();
        assert!(store.get("tasks-store").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::open(tmp.path()).unwrap();
        let value = json!([{"id": "task_1", "title": "Buy milk"}]);

        store.set("tasks-store", value.clone()).await.unwrap();
        assert_eq!(store.get("tasks-store").await.unwrap(), Some(value));
        assert!(tmp.path().join("tasks-store.json").exists());
    }

    #[tokio::test]
    async fn set_overwrites_previous_value() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::open(tmp.path()).unwrap();

        store.set("k", json!(1)).await.unwrap();
        store.set("k", json!(2)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn corrupted_file_is_a_decode_error() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::open(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("tasks-store.json"), "{not json").unwrap();

        let err = store.get("tasks-store").await.unwrap_err();
        assert!(err.is_read());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::open(tmp.path()).unwrap();

        store.set("k", json!("v")).await.unwrap();
        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_removes_every_key() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::open(tmp.path()).unwrap();

        store.set("a", json!(1)).await.unwrap();
        store.set("b", json!(2)).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
        assert!(store.get("b").await.unwrap().is_none());
    }
}
