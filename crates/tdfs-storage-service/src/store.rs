//! Disk-backed whole-file storage.
//!
//! Files are stored under a local root directory using their canonical
//! namespace path as the relative file name. A file lives entirely on one
//! node; there is no chunking or striping.

use std::path::{Component, Path, PathBuf};

use tdfs_types::status_code::StorageCode;
use tdfs_types::{make_error_msg, Result};

/// Whole-file store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`. The directory is created on first
    /// write, not here.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Return the root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a client-supplied name to a path inside the root.
    ///
    /// Only plain relative components are allowed; absolute paths and `..`
    /// would escape the store.
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let rel = Path::new(name);
        if rel.components().any(|c| !matches!(c, Component::Normal(_))) || name.is_empty() {
            return make_error_msg(
                StorageCode::INVALID_NAME,
                format!("invalid file name: {:?}", name),
            );
        }
        Ok(self.root.join(rel))
    }

    /// Write a whole file, creating parent directories as needed.
    /// Returns the number of bytes written.
    pub async fn create_file(&self, name: &str, data: &[u8]) -> Result<u64> {
        let path = self.resolve(name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                tdfs_types::Status::with_message(
                    StorageCode::WRITE_FAILED,
                    format!("mkdir {}: {}", parent.display(), e),
                )
            })?;
        }

        tokio::fs::write(&path, data).await.map_err(|e| {
            tdfs_types::Status::with_message(
                StorageCode::WRITE_FAILED,
                format!("write {}: {}", path.display(), e),
            )
        })?;

        tracing::debug!(name, bytes = data.len(), "file stored");
        Ok(data.len() as u64)
    }

    /// Read a whole file back.
    pub async fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => make_error_msg(
                StorageCode::FILE_NOT_FOUND,
                format!("no such file: {}", name),
            ),
            Err(e) => make_error_msg(
                StorageCode::READ_FAILED,
                format!("read {}: {}", path.display(), e),
            ),
        }
    }

    /// Count occurrences of a whitespace-delimited word in a stored file.
    ///
    /// Matching is exact per token (no substring matches), mirroring a
    /// plain word-count grep run next to the data.
    pub async fn grep(&self, name: &str, word: &str) -> Result<u64> {
        let data = self.read_file(name).await?;
        let needle = word.as_bytes();
        let count = data
            .split(|b| b.is_ascii_whitespace())
            .filter(|token| !token.is_empty() && *token == needle)
            .count();
        Ok(count as u64)
    }
}
