//! In-memory object store used by the test suite and local dry runs.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use super::{RemoteObject, RemoteStore, StoredObject};
use crate::utils::errors::{BackupError, Result};

#[derive(Debug, Clone)]
struct StoredEntry {
    name: String,
    id: String,
    created_at: DateTime<Utc>,
    data: Vec<u8>,
}

/// Thread-safe in-memory `RemoteStore`.
///
/// Creation timestamps are strictly increasing even for same-instant
/// uploads, so retention ordering stays deterministic in tests.
#[derive(Debug)]
pub struct MemoryStore {
    objects: Mutex<Vec<StoredEntry>>,
    counter: AtomicU64,
    epoch: DateTime<Utc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
            epoch: Utc::now(),
        }
    }

    /// Names currently stored, in upload order.
    pub async fn object_names(&self) -> Vec<String> {
        self.objects
            .lock()
            .await
            .iter()
            .map(|o| o.name.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn put(&self, data: &[u8], name: &str) -> Result<StoredObject> {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let id = format!("obj-{seq}");
        let entry = StoredEntry {
            name: name.to_string(),
            id: id.clone(),
            created_at: self.epoch + Duration::milliseconds(seq as i64),
            data: data.to_vec(),
        };
        self.objects.lock().await.push(entry);
        Ok(StoredObject {
            link: format!("memory://{id}"),
            id,
        })
    }

    async fn list(&self, name_contains: &str) -> Result<Vec<RemoteObject>> {
        Ok(self
            .objects
            .lock()
            .await
            .iter()
            .filter(|o| o.name.contains(name_contains))
            .map(|o| RemoteObject {
                name: o.name.clone(),
                id: o.id.clone(),
                created_at: o.created_at,
            })
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .await
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.data.clone())
            .ok_or_else(|| BackupError::Remote(format!("object {id} not found")))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut objects = self.objects.lock().await;
        let before = objects.len();
        objects.retain(|o| o.id != id);
        if objects.len() == before {
            return Err(BackupError::Remote(format!("object {id} not found")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let store = MemoryStore::new();
        let stored = store.put(b"payload", "backup_x.enc").await.unwrap();
        assert_eq!(store.get(&stored.id).await.unwrap(), b"payload");
        assert!(stored.link.starts_with("memory://"));
    }

    #[tokio::test]
    async fn test_list_filters_by_substring() {
        let store = MemoryStore::new();
        store.put(b"1", "backup_a.enc").await.unwrap();
        store.put(b"2", "unrelated.bin").await.unwrap();

        let listed = store.list("backup_").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "backup_a.enc");
    }

    #[tokio::test]
    async fn test_created_at_is_strictly_increasing() {
        let store = MemoryStore::new();
        let a = store.put(b"1", "backup_a.enc").await.unwrap();
        let b = store.put(b"2", "backup_b.enc").await.unwrap();

        let listed = store.list("backup_").await.unwrap();
        let ta = listed.iter().find(|o| o.id == a.id).unwrap().created_at;
        let tb = listed.iter().find(|o| o.id == b.id).unwrap().created_at;
        assert!(tb > ta);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_remote_error() {
        let store = MemoryStore::new();
        let result = store.delete("obj-404").await;
        assert!(matches!(result, Err(BackupError::Remote(_))));
    }
}
