//! The restore pipeline: fetch, decrypt, extract.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use super::{spawn_blocking_stage, EventSink, Stage};
use crate::archive;
use crate::crypto::{self, EncryptionKey};
use crate::remote::{RemoteObject, RemoteStore, BACKUP_PREFIX};
use crate::utils::errors::Result;

/// Restores a previously uploaded backup under a destination folder.
pub struct RestorePipeline<S> {
    store: Arc<S>,
    key: EncryptionKey,
    events: EventSink,
}

impl<S: RemoteStore> RestorePipeline<S> {
    pub fn new(store: Arc<S>, key: EncryptionKey, events: EventSink) -> Self {
        Self { store, key, events }
    }

    /// Backups available for restore, straight from the remote store. The
    /// local ledger is not consulted: it may be stale after retention
    /// deletions.
    pub async fn list_available(&self) -> Result<Vec<RemoteObject>> {
        self.store.list(BACKUP_PREFIX).await
    }

    /// Fetch, decrypt and extract the backup with the given remote id.
    ///
    /// Fetch and decrypt failures leave `dest` untouched. A failure during
    /// extraction can leave a partial tree; extraction is not transactional.
    pub async fn run(&self, remote_id: &str, dest: &Path) -> Result<()> {
        let run_id = Uuid::new_v4();
        info!(%run_id, remote_id, dest = %dest.display(), "starting restore run");
        self.events.progress(Stage::Fetch, 0);
        self.events.log("Starting restore process...");

        let result = self.stages(remote_id, dest).await;
        match &result {
            Ok(()) => {
                info!(%run_id, "restore run complete");
                self.events.log("Backup restored successfully");
            }
            Err(e) => {
                error!(%run_id, error = %e, "restore run failed");
                self.events.log(format!("Restore failed: {e}"));
            }
        }
        result
    }

    async fn stages(&self, remote_id: &str, dest: &Path) -> Result<()> {
        let blob = self.store.get(remote_id).await?;
        self.events.progress(Stage::Fetch, 50);

        let key = self.key.clone();
        let plaintext = spawn_blocking_stage(move || crypto::decrypt(&blob, &key)).await?;
        self.events.progress(Stage::Decrypt, 75);

        let dest = dest.to_path_buf();
        spawn_blocking_stage(move || archive::extract(&plaintext, &dest)).await?;
        self.events.progress(Stage::Extract, 100);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::BackupLedger;
    use crate::pipeline::BackupPipeline;
    use crate::remote::MemoryStore;
    use crate::utils::errors::BackupError;
    use tempfile::TempDir;

    fn source_folder() -> TempDir {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("data");
        std::fs::create_dir(&folder).unwrap();
        std::fs::write(folder.join("a.txt"), b"12345").unwrap();
        std::fs::create_dir(folder.join("sub")).unwrap();
        std::fs::write(folder.join("sub/b.txt"), b"").unwrap();
        temp
    }

    async fn backed_up_store(key: &EncryptionKey) -> (Arc<MemoryStore>, String) {
        let source = source_folder();
        let ledger_dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let pipeline = BackupPipeline::new(
            Arc::clone(&store),
            key.clone(),
            BackupLedger::new(ledger_dir.path().join("backup_log.json")),
            EventSink::disabled(),
        );
        let record = pipeline.run(&source.path().join("data")).await.unwrap();
        (store, record.remote_id)
    }

    #[tokio::test]
    async fn test_backup_then_restore_round_trip() {
        let key = EncryptionKey::generate();
        let (store, remote_id) = backed_up_store(&key).await;

        let dest = TempDir::new().unwrap();
        let restore = RestorePipeline::new(store, key, EventSink::disabled());
        restore.run(&remote_id, dest.path()).await.unwrap();

        assert_eq!(
            std::fs::read(dest.path().join("data/a.txt")).unwrap(),
            b"12345"
        );
        assert_eq!(
            std::fs::read(dest.path().join("data/sub/b.txt")).unwrap(),
            b""
        );
    }

    #[tokio::test]
    async fn test_wrong_key_leaves_destination_untouched() {
        let key = EncryptionKey::generate();
        let (store, remote_id) = backed_up_store(&key).await;

        let dest = TempDir::new().unwrap();
        let restore = RestorePipeline::new(store, EncryptionKey::generate(), EventSink::disabled());
        let result = restore.run(&remote_id, dest.path()).await;

        assert!(matches!(result, Err(BackupError::Authentication(_))));
        assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_id_leaves_destination_untouched() {
        let key = EncryptionKey::generate();
        let (store, _) = backed_up_store(&key).await;

        let dest = TempDir::new().unwrap();
        let restore = RestorePipeline::new(store, key, EventSink::disabled());
        let result = restore.run("obj-404", dest.path()).await;

        assert!(matches!(result, Err(BackupError::Remote(_))));
        assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_list_available_only_returns_backups() {
        let key = EncryptionKey::generate();
        let (store, _) = backed_up_store(&key).await;
        store.put(b"noise", "notes.txt").await.unwrap();

        let restore = RestorePipeline::new(store, key, EventSink::disabled());
        let available = restore.list_available().await.unwrap();
        assert_eq!(available.len(), 1);
        assert!(available[0].name.starts_with(BACKUP_PREFIX));
    }
}
