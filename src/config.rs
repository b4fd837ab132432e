//! Configuration loading.
//!
//! Settings come from a TOML file with serde defaults. The encryption key
//! is deliberately kept out of that file: it is read from the environment
//! (`ENCRYPTION_KEY`), optionally seeded from a local `backup.env`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::EncryptionKey;
use crate::utils::errors::{BackupError, Result};

/// Environment variable holding the base64 backup key.
pub const KEY_ENV_VAR: &str = "ENCRYPTION_KEY";

/// Env file consulted before reading the key.
const ENV_FILE: &str = "backup.env";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Object-store base URL
    #[serde(default = "default_storage_url")]
    pub url: String,

    /// Bearer token, if the store requires one
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Ledger file location
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    /// Remote backup-count cap
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    /// zstd level used when packing (1-22)
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_storage_url() -> String {
    "http://localhost:9990".to_string()
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("backup_log.json")
}

fn default_max_backups() -> usize {
    5
}

fn default_compression_level() -> i32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: default_storage_url(),
            token: None,
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            ledger_path: default_ledger_path(),
            max_backups: default_max_backups(),
            compression_level: default_compression_level(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Read the symmetric key from the environment, consulting `backup.env`
/// first. The core never writes or rotates key material.
pub fn load_key() -> Result<EncryptionKey> {
    let _ = dotenvy::from_filename(ENV_FILE);
    let encoded = std::env::var(KEY_ENV_VAR)
        .map_err(|_| BackupError::Config(format!("{KEY_ENV_VAR} is not set")))?;
    EncryptionKey::from_base64(&encoded)
}
