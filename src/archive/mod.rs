//! Folder archiver: a tar container compressed with zstd.
//!
//! Entries are rooted one level above the source folder, so extracting
//! `pack("/home/me/photos")` recreates `photos/...` under the destination.

pub mod walker;

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::utils::errors::{BackupError, Result};
use walker::{walk_folder, WalkOptions};

/// Knobs for `pack`.
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// zstd compression level (1-22)
    pub compression_level: i32,

    /// Traversal options
    pub walk: WalkOptions,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            compression_level: 3,
            walk: WalkOptions::default(),
        }
    }
}

/// Pack a folder into a compressed in-memory archive.
pub fn pack(folder: &Path, options: &PackOptions) -> Result<Vec<u8>> {
    let folder = folder.canonicalize()?;
    if !folder.is_dir() {
        return Err(BackupError::Io(std::io::Error::new(
            ErrorKind::InvalidInput,
            format!("{} is not a directory", folder.display()),
        )));
    }

    // Entry names start with the folder name itself so extraction can
    // rebuild the tree without knowing the original source path.
    let root_name = folder
        .file_name()
        .map(Path::new)
        .unwrap_or_else(|| Path::new("root"))
        .to_path_buf();

    let entries = walk_folder(&folder, &options.walk)?;
    debug!(
        files = entries.len(),
        folder = %folder.display(),
        "packing folder"
    );

    let mut builder = tar::Builder::new(Vec::new());
    for entry in &entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(entry.size);
        header.set_mode(0o644);
        header.set_mtime(0);

        let mut file = File::open(&entry.path)?;
        builder.append_data(&mut header, root_name.join(&entry.relative_path), &mut file)?;
    }

    let tar_bytes = builder.into_inner()?;
    let compressed = zstd::encode_all(tar_bytes.as_slice(), options.compression_level)?;
    Ok(compressed)
}

/// Extract an archive produced by `pack` under `dest`, creating intermediate
/// directories as needed. Existing files are overwritten.
pub fn extract(archive: &[u8], dest: &Path) -> Result<()> {
    let tar_bytes = zstd::decode_all(archive)
        .map_err(|e| BackupError::Format(format!("zstd decode failed: {e}")))?;

    std::fs::create_dir_all(dest)?;

    let mut container = tar::Archive::new(tar_bytes.as_slice());
    for entry in container.entries().map_err(container_err)? {
        let mut entry = entry.map_err(container_err)?;
        // unpack_in refuses entries that would escape dest
        entry.unpack_in(dest)?;
    }
    Ok(())
}

fn container_err(e: std::io::Error) -> BackupError {
    BackupError::Format(format!("invalid tar container: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sample_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("data");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("a.txt"), b"12345").unwrap();
        fs::create_dir(source.join("sub")).unwrap();
        fs::write(source.join("sub/b.txt"), b"").unwrap();
        temp
    }

    #[test]
    fn test_pack_extract_round_trip() {
        let temp = sample_tree();
        let archive = pack(&temp.path().join("data"), &PackOptions::default()).unwrap();

        let dest = TempDir::new().unwrap();
        extract(&archive, dest.path()).unwrap();

        assert_eq!(
            fs::read(dest.path().join("data/a.txt")).unwrap(),
            b"12345"
        );
        assert_eq!(fs::read(dest.path().join("data/sub/b.txt")).unwrap(), b"");
    }

    #[test]
    fn test_pack_missing_folder_is_io_error() {
        let temp = TempDir::new().unwrap();
        let result = pack(&temp.path().join("missing"), &PackOptions::default());
        assert!(matches!(result, Err(BackupError::Io(_))));
    }

    #[test]
    fn test_pack_file_path_is_io_error() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();
        let result = pack(&file, &PackOptions::default());
        assert!(matches!(result, Err(BackupError::Io(_))));
    }

    #[test]
    fn test_extract_rejects_garbage() {
        let dest = TempDir::new().unwrap();
        let result = extract(b"definitely not an archive", dest.path());
        assert!(matches!(result, Err(BackupError::Format(_))));
    }

    #[test]
    fn test_extract_overwrites_existing_files() {
        let temp = sample_tree();
        let archive = pack(&temp.path().join("data"), &PackOptions::default()).unwrap();

        let dest = TempDir::new().unwrap();
        fs::create_dir_all(dest.path().join("data")).unwrap();
        fs::write(dest.path().join("data/a.txt"), b"stale content").unwrap();

        extract(&archive, dest.path()).unwrap();
        assert_eq!(
            fs::read(dest.path().join("data/a.txt")).unwrap(),
            b"12345"
        );
    }

    #[test]
    fn test_empty_folder_round_trips() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("empty");
        fs::create_dir(&source).unwrap();

        let archive = pack(&source, &PackOptions::default()).unwrap();
        let dest = TempDir::new().unwrap();
        extract(&archive, dest.path()).unwrap();
    }
}
