//! Remote object-store contract.
//!
//! The pipelines depend only on the `RemoteStore` trait; concrete backends
//! live in submodules (`http` for a real service, `memory` for tests and
//! dry runs). Calls are never retried here; retry policy belongs to the
//! caller.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::errors::Result;

pub use http::HttpStoreClient;
pub use memory::MemoryStore;

/// Object-name prefix shared by every uploaded backup; doubles as the
/// list filter for restore selection and retention.
pub const BACKUP_PREFIX: &str = "backup_";

/// Compose the remote object name for a backup taken at `at`.
///
/// Second-level resolution: two runs within the same second produce the
/// same name. Accepted limitation.
pub fn backup_object_name(at: DateTime<Local>) -> String {
    format!("{BACKUP_PREFIX}{}.enc", at.format("%Y%m%d_%H%M%S"))
}

/// Handle returned by a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    pub id: String,
    pub link: String,
}

/// Listing entry for a stored object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteObject {
    pub name: String,
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Abstract object-storage collaborator.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Upload `data` under `name`, returning its id and shareable link.
    async fn put(&self, data: &[u8], name: &str) -> Result<StoredObject>;

    /// List stored objects whose name contains `name_contains`.
    async fn list(&self, name_contains: &str) -> Result<Vec<RemoteObject>>;

    /// Download an object by id.
    async fn get(&self, id: &str) -> Result<Vec<u8>>;

    /// Delete an object by id.
    async fn delete(&self, id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_backup_object_name_format() {
        let at = Local.with_ymd_and_hms(2026, 8, 4, 22, 0, 7).unwrap();
        let name = backup_object_name(at);
        assert_eq!(name, "backup_20260804_220007.enc");
        assert!(name.contains(BACKUP_PREFIX));
    }
}
