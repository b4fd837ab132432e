//! Remote backup-count cap.

use tracing::{info, warn};

use crate::remote::{RemoteStore, BACKUP_PREFIX};
use crate::utils::errors::Result;

/// Default number of remote backups to keep.
pub const DEFAULT_MAX_BACKUPS: usize = 5;

/// Deletes oldest backups once the remote count exceeds the cap.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    max_backups: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }
}

impl RetentionPolicy {
    pub fn new(max_backups: usize) -> Self {
        Self { max_backups }
    }

    /// Enforce the cap after a successful upload; returns how many objects
    /// were deleted. Individual delete failures are warned and skipped —
    /// the upload this run protects is already durable.
    pub async fn enforce<S: RemoteStore + ?Sized>(&self, store: &S) -> Result<usize> {
        let mut backups = store.list(BACKUP_PREFIX).await?;
        if backups.len() <= self.max_backups {
            return Ok(0);
        }

        backups.sort_by_key(|b| b.created_at);
        let excess = backups.len() - self.max_backups;

        let mut deleted = 0;
        for backup in &backups[..excess] {
            match store.delete(&backup.id).await {
                Ok(()) => {
                    info!(name = %backup.name, id = %backup.id, "retention deleted old backup");
                    deleted += 1;
                }
                Err(e) => {
                    warn!(
                        name = %backup.name,
                        id = %backup.id,
                        error = %e,
                        "retention failed to delete old backup"
                    );
                }
            }
        }
        Ok(deleted)
    }
}
