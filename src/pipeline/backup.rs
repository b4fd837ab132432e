//! The backup pipeline: pack, encrypt, upload, retention, ledger.

use std::path::Path;
use std::sync::Arc;

use chrono::{Local, Utc};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{spawn_blocking_stage, EventSink, Stage};
use crate::archive::{self, PackOptions};
use crate::crypto::{self, EncryptionKey};
use crate::ledger::{BackupLedger, BackupRecord};
use crate::remote::{backup_object_name, RemoteStore};
use crate::retention::RetentionPolicy;
use crate::utils::errors::Result;

/// Drives one folder through pack → encrypt → upload → retention → ledger.
///
/// At most one run is active per pipeline instance: `run` queues behind an
/// in-flight run, `try_run` skips instead (the scheduler path).
pub struct BackupPipeline<S> {
    store: Arc<S>,
    key: EncryptionKey,
    ledger: BackupLedger,
    retention: RetentionPolicy,
    pack_options: PackOptions,
    events: EventSink,
    run_lock: Mutex<()>,
}

impl<S: RemoteStore> BackupPipeline<S> {
    pub fn new(store: Arc<S>, key: EncryptionKey, ledger: BackupLedger, events: EventSink) -> Self {
        Self {
            store,
            key,
            ledger,
            retention: RetentionPolicy::default(),
            pack_options: PackOptions::default(),
            events,
            run_lock: Mutex::new(()),
        }
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_pack_options(mut self, options: PackOptions) -> Self {
        self.pack_options = options;
        self
    }

    /// Back up `folder`. Concurrent callers are serialized.
    pub async fn run(&self, folder: &Path) -> Result<BackupRecord> {
        let _guard = self.run_lock.lock().await;
        self.execute(folder).await
    }

    /// Back up `folder` unless a run is already in flight, in which case
    /// the trigger is skipped and `None` returned.
    pub async fn try_run(&self, folder: &Path) -> Result<Option<BackupRecord>> {
        match self.run_lock.try_lock() {
            Ok(_guard) => self.execute(folder).await.map(Some),
            Err(_) => {
                warn!(folder = %folder.display(), "skipping trigger: a backup run is already in flight");
                self.events.log("Backup already running, trigger skipped");
                Ok(None)
            }
        }
    }

    async fn execute(&self, folder: &Path) -> Result<BackupRecord> {
        let run_id = Uuid::new_v4();
        info!(%run_id, folder = %folder.display(), "starting backup run");
        self.events.progress(Stage::Pack, 0);
        self.events.log(format!("Running backup of {}", folder.display()));

        let result = self.stages(folder).await;
        match &result {
            Ok(record) => info!(%run_id, filename = %record.filename, "backup run complete"),
            Err(e) => {
                error!(%run_id, error = %e, "backup run failed");
                self.events.log(format!("Backup failed: {e}"));
            }
        }
        result
    }

    async fn stages(&self, folder: &Path) -> Result<BackupRecord> {
        // Pack on a blocking worker; an unreadable folder aborts before
        // anything touches the remote store.
        let pack_folder = folder.to_path_buf();
        let pack_options = self.pack_options.clone();
        let archive_bytes =
            spawn_blocking_stage(move || archive::pack(&pack_folder, &pack_options)).await?;
        self.events.progress(Stage::Pack, 40);
        self.events.log(format!("Packed {} bytes", archive_bytes.len()));

        let key = self.key.clone();
        let blob = spawn_blocking_stage(move || crypto::encrypt(&archive_bytes, &key)).await?;
        self.events.progress(Stage::Encrypt, 50);

        // Second-resolution timestamp name; collisions within one second
        // are an accepted limitation.
        let filename = backup_object_name(Local::now());

        // The durability boundary: failure here leaves no trace anywhere.
        let stored = self.store.put(&blob, &filename).await?;
        self.events.progress(Stage::Upload, 75);
        self.events.log(format!("Uploaded. Link: {}", stored.link));

        // Retention failures must not undo a durable upload.
        match self.retention.enforce(self.store.as_ref()).await {
            Ok(0) => {}
            Ok(deleted) => self
                .events
                .log(format!("Retention removed {deleted} old backup(s)")),
            Err(e) => {
                warn!(error = %e, "retention enforcement failed after successful upload");
                self.events.log(format!("Retention check failed: {e}"));
            }
        }
        self.events.progress(Stage::Retention, 90);

        let record = BackupRecord {
            filename,
            remote_id: stored.id,
            remote_link: stored.link,
            created_at: Utc::now(),
        };
        self.ledger.append(&record)?;
        self.events.progress(Stage::Ledger, 100);
        self.events.log("Backup logged");
        Ok(record)
    }
}
