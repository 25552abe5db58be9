// ABOUTME: FileStore trait that the file routes read and write through
// ABOUTME: In-memory store for tests and a local-directory store that refuses paths escaping its root

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// File contents, or `None` when nothing is stored at `path`.
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError>;

    async fn put(&self, path: &str, contents: Vec<u8>) -> Result<(), StorageError>;

    /// Returns false when nothing was stored at `path`.
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;
}

/// Reduce a request path to relative components below the store root.
///
/// Empty, absolute, and `..`-bearing paths are rejected.
fn normalize_path(path: &str) -> Result<PathBuf, StorageError> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(StorageError::InvalidPath(path.to_string()));
    }

    let mut normalized = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::InvalidPath(path.to_string()));
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(normalized)
}

#[derive(Default)]
pub struct MemoryFileStore {
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let key = normalize_path(path)?;
        Ok(self.files.read().await.get(&key).cloned())
    }

    async fn put(&self, path: &str, contents: Vec<u8>) -> Result<(), StorageError> {
        let key = normalize_path(path)?;
        self.files.write().await.insert(key, contents);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let key = normalize_path(path)?;
        Ok(self.files.write().await.remove(&key).is_some())
    }
}

/// Stores files under a root directory on the local filesystem.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(normalize_path(path)?))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            // Reading a directory is treated as a miss
            Err(_) if full.is_dir() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, path: &str, contents: Vec<u8>) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, contents).await?;
        tracing::debug!(path = %full.display(), "Stored file");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
