//! Asynchronous filesystem operations used by sync and cleanup.
//!
//! Like git, the filesystem sits behind a trait so tests can observe or fail
//! individual operations without touching the real disk.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Filesystem operations needed by the engine.
#[async_trait]
pub trait FileOperations: Send + Sync {
    /// Whether `path` exists and is a directory.
    async fn is_dir(&self, path: &Path) -> bool;

    /// Names of the entries directly inside `dir`, sorted.
    ///
    /// A missing directory has no entries.
    async fn list_entries(&self, dir: &Path) -> Result<Vec<String>>;

    /// Recursively and forcibly delete `path`, file or directory.
    async fn remove_all(&self, path: &Path) -> Result<()>;
}

/// [`FileOperations`] backed by `tokio::fs`.
#[derive(Debug, Default, Clone)]
pub struct DefaultFileOperations;

fn fs_error(path: &Path, e: std::io::Error) -> Error {
    Error::Filesystem {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl FileOperations for DefaultFileOperations {
    async fn is_dir(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn list_entries(&self, dir: &Path) -> Result<Vec<String>> {
        let mut reader = match tokio::fs::read_dir(dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(fs_error(dir, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| fs_error(dir, e))? {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(names)
    }

    async fn remove_all(&self, path: &Path) -> Result<()> {
        let metadata = match tokio::fs::symlink_metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(fs_error(path, e)),
        };

        let result = if metadata.is_dir() {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        };
        result.map_err(|e| fs_error(path, e))
    }
}
