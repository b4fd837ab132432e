//! Directory traversal for the archiver.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Follow symbolic links
    pub follow_links: bool,

    /// File-name substrings to skip; empty by default so a backup captures
    /// every regular file
    pub exclude_patterns: Vec<String>,
}

/// A regular file discovered during walking
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Full path to the file
    pub path: PathBuf,

    /// Path relative to the walk root
    pub relative_path: PathBuf,

    /// File size in bytes
    pub size: u64,
}

impl FileEntry {
    /// Create a FileEntry from a DirEntry.
    /// Symlinks are resolved to their target; symlinks pointing at
    /// directories or nowhere are skipped.
    fn from_entry(entry: &DirEntry, root: &Path) -> std::io::Result<Option<Self>> {
        let raw_metadata = entry.metadata()?;
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

        let size = if raw_metadata.is_symlink() {
            match std::fs::metadata(&path) {
                Ok(resolved) if resolved.is_dir() => return Ok(None),
                Ok(resolved) => resolved.len(),
                Err(_) => return Ok(None),
            }
        } else {
            raw_metadata.len()
        };

        Ok(Some(Self {
            path,
            relative_path,
            size,
        }))
    }
}

/// Walk a folder tree and collect every regular file under it.
pub fn walk_folder(root: &Path, options: &WalkOptions) -> std::io::Result<Vec<FileEntry>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(options.follow_links) {
        let entry = entry?;

        if should_exclude(&entry, &options.exclude_patterns) {
            continue;
        }

        if entry.file_type().is_dir() {
            continue;
        }

        if let Some(file) = FileEntry::from_entry(&entry, root)? {
            files.push(file);
        }
    }

    Ok(files)
}

fn should_exclude(entry: &DirEntry, patterns: &[String]) -> bool {
    let file_name = entry.file_name().to_string_lossy();
    patterns.iter().any(|p| file_name.contains(p.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_walk_empty_folder() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let files = walk_folder(temp_dir.path(), &WalkOptions::default())?;
        assert!(files.is_empty());
        Ok(())
    }

    #[test]
    fn test_walk_collects_nested_files() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join("a.txt"), b"12345")?;
        fs::create_dir(temp_dir.path().join("sub"))?;
        fs::write(temp_dir.path().join("sub/b.txt"), b"")?;

        let mut files = walk_folder(temp_dir.path(), &WalkOptions::default())?;
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].relative_path, Path::new("a.txt"));
        assert_eq!(files[0].size, 5);
        assert_eq!(files[1].relative_path, Path::new("sub/b.txt"));
        assert_eq!(files[1].size, 0);
        Ok(())
    }

    #[test]
    fn test_walk_missing_folder_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert!(walk_folder(&missing, &WalkOptions::default()).is_err());
    }

    #[test]
    fn test_exclude_patterns() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join("keep.txt"), b"keep")?;
        fs::write(temp_dir.path().join(".DS_Store"), b"skip")?;

        let options = WalkOptions {
            exclude_patterns: vec![".DS_Store".to_string()],
            ..WalkOptions::default()
        };
        let files = walk_folder(temp_dir.path(), &options)?;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path, Path::new("keep.txt"));
        Ok(())
    }
}
