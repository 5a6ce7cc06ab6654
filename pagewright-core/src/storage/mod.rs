//! Draft persistence
//!
//! A [`DraftStore`] keeps one saved book file per draft, keyed by the
//! book's id. The text is whatever [`bookfile::save`] produced; stores do
//! not parse it.

use crate::bookfile;
use crate::error::StorageError;
use crate::types::Book;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use uuid::Uuid;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Where drafts live between server runs
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Ids of every stored draft, sorted
    async fn ids(&self) -> StorageResult<Vec<Uuid>>;

    /// Saved text of a draft
    async fn read(&self, id: Uuid) -> StorageResult<String>;

    /// Store a draft's text, replacing any previous version
    async fn write(&self, id: Uuid, text: String) -> StorageResult<()>;

    /// Forget a draft
    async fn remove(&self, id: Uuid) -> StorageResult<()>;

    /// Save `book` under its own id
    async fn save_book(&self, book: &Book) -> StorageResult<()> {
        self.write(book.id(), bookfile::save(book)).await
    }
}

/// Drafts as `<id>.book` files in one directory
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding draft `id`
    pub fn file_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.{}", id, bookfile::EXTENSION))
    }
}

fn backend(e: std::io::Error) -> StorageError {
    StorageError::BackendError(e.to_string())
}

/// Draft id from a file name like `<uuid>.book`
fn id_from_file_name(name: &str) -> Option<Uuid> {
    let stem = name.strip_suffix(bookfile::EXTENSION)?.strip_suffix('.')?;
    Uuid::parse_str(stem).ok()
}

#[async_trait]
impl DraftStore for DirectoryStore {
    async fn ids(&self) -> StorageResult<Vec<Uuid>> {
        let mut ids = Vec::new();
        let mut read_dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(backend(e)),
        };

        while let Some(entry) = read_dir.next_entry().await.map_err(backend)? {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            match entry.file_name().to_str().and_then(id_from_file_name) {
                Some(id) if is_file => ids.push(id),
                _ => tracing::trace!("ignoring {:?} in draft directory", entry.file_name()),
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn read(&self, id: Uuid) -> StorageResult<String> {
        let bytes = tokio::fs::read(self.file_for(id)).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(id.to_string())
            } else {
                backend(e)
            }
        })?;
        String::from_utf8(bytes)
            .map_err(|_| StorageError::BackendError(format!("draft {} is not UTF-8", id)))
    }

    async fn write(&self, id: Uuid, text: String) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(backend)?;

        // Rename within the same directory so readers never see half a file
        let path = self.file_for(id);
        let temp_path = path.with_extension(format!("{}.tmp", bookfile::EXTENSION));
        tokio::fs::write(&temp_path, text).await.map_err(backend)?;
        tokio::fs::rename(&temp_path, &path).await.map_err(backend)
    }

    async fn remove(&self, id: Uuid) -> StorageResult<()> {
        match tokio::fs::remove_file(self.file_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => Err(backend(e)),
        }
    }
}

/// Drafts held in memory, lost on drop
#[derive(Default)]
pub struct MemoryStore {
    drafts: RwLock<HashMap<Uuid, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<T>(_: T) -> StorageError {
        StorageError::BackendError("draft store lock poisoned".to_string())
    }
}

#[async_trait]
impl DraftStore for MemoryStore {
    async fn ids(&self) -> StorageResult<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self
            .drafts
            .read()
            .map_err(Self::poisoned)?
            .keys()
            .copied()
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn read(&self, id: Uuid) -> StorageResult<String> {
        self.drafts
            .read()
            .map_err(Self::poisoned)?
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn write(&self, id: Uuid, text: String) -> StorageResult<()> {
        self.drafts.write().map_err(Self::poisoned)?.insert(id, text);
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> StorageResult<()> {
        self.drafts
            .write()
            .map_err(Self::poisoned)?
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }
}
