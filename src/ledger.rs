//! Append-only local record of completed backups.
//!
//! The ledger is an audit trail, not a source of truth: retention may
//! delete remote objects after they were logged here, so restore listings
//! always go through the remote store.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::utils::errors::Result;

/// The durable record of one completed backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub filename: String,
    pub remote_id: String,
    pub remote_link: String,
    pub created_at: DateTime<Utc>,
}

/// One persisted ledger line. The on-disk field names are a compatibility
/// surface for external tooling; do not rename them.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerEntry {
    file: String,
    timestamp: DateTime<Utc>,
    cloud_link: String,
}

/// JSON-array ledger at a fixed local path.
#[derive(Debug, Clone)]
pub struct BackupLedger {
    path: PathBuf,
}

impl BackupLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one record, tolerating a missing, empty or corrupt backing
    /// file (all treated as empty history).
    pub fn append(&self, record: &BackupRecord) -> Result<()> {
        let mut entries = self.read_entries();
        entries.push(LedgerEntry {
            file: record.filename.clone(),
            timestamp: record.created_at,
            cloud_link: record.remote_link.clone(),
        });

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }

    fn read_entries(&self) -> Vec<LedgerEntry> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };
        if content.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "ledger file is corrupt, starting a fresh history"
                );
                Vec::new()
            }
        }
    }
}
