//! Application state

use anyhow::Result;
use pagewright_core::bookfile;
use pagewright_core::settings::{JsonFileSettings, SettingsStore};
use pagewright_core::storage::{DirectoryStore, DraftStore, StorageResult};
use pagewright_core::{assemble, Book, Configuration, DocumentModel, PreviewSession};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

/// Directory under the storage root holding one flat file per draft
pub const DRAFTS_DIR: &str = "drafts";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Saved draft files
    pub storage: Arc<dyn DraftStore>,

    /// Open drafts, each with its latest preview
    pub drafts: Arc<RwLock<HashMap<Uuid, PreviewSession>>>,

    /// Serializes edits per draft while their files are written
    edit_locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,

    /// Persisted page configuration
    pub settings: Arc<RwLock<Box<dyn SettingsStore>>>,

    /// Channel for SSE events
    pub event_tx: broadcast::Sender<ServerEvent>,
}

/// Server-sent events
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A draft was created or changed
    DraftUpdated {
        id: Uuid,
        title: String,
        generation: u64,
    },

    /// A fresh preview was accepted for a draft
    PreviewReady {
        id: Uuid,
        generation: u64,
        pages: usize,
    },

    /// An export finished
    ExportComplete { id: Uuid, format: String },

    /// An error occurred
    Error { message: String },
}

impl AppState {
    /// Create application state from the environment and restore saved drafts
    pub async fn new() -> Result<Self> {
        // Default to local storage in current directory
        let storage_path = std::env::var("PAGEWRIGHT_STORAGE_PATH")
            .unwrap_or_else(|_| "./pagewright_data".to_string());
        let storage_path = PathBuf::from(storage_path);

        tokio::fs::create_dir_all(storage_path.join(DRAFTS_DIR)).await?;

        let settings = JsonFileSettings::open(storage_path.join("settings.json"))?;
        let storage = Arc::new(DirectoryStore::new(storage_path.join(DRAFTS_DIR)));

        let state = Self::with_parts(storage, Box::new(settings));
        let restored = state.restore_drafts().await?;
        tracing::info!("Restored {} drafts from {}", restored, storage_path.display());

        Ok(state)
    }

    /// Create state over the given storage and settings, with no drafts open
    pub fn with_parts(storage: Arc<dyn DraftStore>, settings: Box<dyn SettingsStore>) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            storage,
            drafts: Arc::new(RwLock::new(HashMap::new())),
            edit_locks: Arc::new(Mutex::new(HashMap::new())),
            settings: Arc::new(RwLock::new(settings)),
            event_tx,
        }
    }

    /// Open every saved draft file. Files that fail to load are skipped.
    pub async fn restore_drafts(&self) -> Result<usize> {
        let config = self.configuration().await;
        let mut restored = 0;

        for id in self.storage.ids().await? {
            let text = match self.storage.read(id).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Skipping draft {}: {}", id, e);
                    continue;
                }
            };
            let book = match bookfile::load(&text) {
                Ok(book) if book.id() == id => book,
                Ok(book) => {
                    tracing::warn!("Skipping draft {}: file holds book {}", id, book.id());
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Skipping draft {}: {}", id, e);
                    continue;
                }
            };

            let session = PreviewSession::new(book.with_config(config.clone()));
            self.drafts.write().await.insert(id, session);
            restored += 1;
        }

        Ok(restored)
    }

    /// Current persisted configuration
    pub async fn configuration(&self) -> Configuration {
        let settings = self.settings.read().await;
        Configuration::load(&**settings)
    }

    /// Exclusive right to edit draft `id`. Held across the file write so
    /// saves of one draft land in the order their edits were made, without
    /// blocking readers of other drafts.
    pub async fn lock_draft(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.edit_locks.lock().await;
            Arc::clone(locks.entry(id).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop the edit lock of a deleted draft
    pub async fn forget_draft_lock(&self, id: Uuid) {
        self.edit_locks.lock().await.remove(&id);
    }

    /// Write a draft's flat file
    pub async fn persist_draft(&self, book: &Book) -> StorageResult<()> {
        self.storage.save_book(book).await
    }

    /// Render the draft's preview, reusing the latest one if still current.
    ///
    /// Assembly runs on the blocking pool. Returns `None` if the draft does
    /// not exist.
    pub async fn render_preview(&self, id: Uuid) -> Option<Arc<DocumentModel>> {
        let (ticket, book) = {
            let drafts = self.drafts.read().await;
            let session = drafts.get(&id)?;
            if let (false, Some(doc)) = (session.is_stale(), session.preview()) {
                return Some(doc);
            }
            session.snapshot()
        };

        let doc = match tokio::task::spawn_blocking(move || assemble(&book)).await {
            Ok(doc) => Arc::new(doc),
            Err(e) => {
                tracing::error!("Preview task failed for {}: {}", id, e);
                self.broadcast(ServerEvent::Error {
                    message: format!("Preview failed for {}", id),
                });
                return None;
            }
        };

        let accepted = match self.drafts.write().await.get_mut(&id) {
            Some(session) => session.accept(ticket, Arc::clone(&doc)),
            None => false,
        };
        if accepted {
            self.broadcast(ServerEvent::PreviewReady {
                id,
                generation: ticket.generation(),
                pages: doc.page_count(),
            });
        }

        Some(doc)
    }

    /// Start rendering a draft's preview in the background
    pub fn schedule_render(&self, id: Uuid) {
        let state = self.clone();
        tokio::spawn(async move {
            state.render_preview(id).await;
        });
    }

    /// Subscribe to server events
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast an event
    pub fn broadcast(&self, event: ServerEvent) {
        // Ignore errors (no subscribers)
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewright_core::settings::MemorySettings;
    use pagewright_core::storage::MemoryStore;
    use pagewright_core::Chapter;

    fn memory_state() -> AppState {
        AppState::with_parts(
            Arc::new(MemoryStore::new()),
            Box::new(MemorySettings::new()),
        )
    }

    #[tokio::test]
    async fn test_restore_drafts_skips_broken_files() {
        let state = memory_state();
        let book = Book::new("Saved").with_chapter(Chapter::new("One").with_content("text"));
        state.persist_draft(&book).await.unwrap();
        state
            .storage
            .write(Uuid::new_v4(), "not a book".to_string())
            .await
            .unwrap();
        let stray = Book::new("Misfiled");
        state
            .storage
            .write(Uuid::new_v4(), bookfile::save(&stray))
            .await
            .unwrap();

        assert_eq!(state.restore_drafts().await.unwrap(), 1);
        let drafts = state.drafts.read().await;
        assert_eq!(drafts[&book.id()].book().title, "Saved");
    }

    #[tokio::test]
    async fn test_render_preview_publishes_once() {
        let state = memory_state();
        let book = Book::new("Draft");
        let id = book.id();
        state
            .drafts
            .write()
            .await
            .insert(id, PreviewSession::new(book));

        let mut events = state.subscribe();
        let first = state.render_preview(id).await.unwrap();
        let second = state.render_preview(id).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        match events.recv().await.unwrap() {
            ServerEvent::PreviewReady { id: got, pages, .. } => {
                assert_eq!(got, id);
                assert_eq!(pages, 2);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_render_preview_unknown_draft() {
        let state = memory_state();
        assert!(state.render_preview(Uuid::new_v4()).await.is_none());
    }
}
