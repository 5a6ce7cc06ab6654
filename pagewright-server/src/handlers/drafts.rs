//! Draft management handlers

use super::{draft_not_found, parse_id, sanitize_filename, storage_error, ApiResult};
use crate::state::{AppState, ServerEvent};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use pagewright_core::{bookfile, image};
use pagewright_core::{AuthorImagePosition, Book, Chapter, PreviewSession};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chapter as sent and returned by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterBody {
    pub title: String,
    pub content: String,
}

impl From<&Chapter> for ChapterBody {
    fn from(chapter: &Chapter) -> Self {
        Self {
            title: chapter.title.clone(),
            content: chapter.content.clone(),
        }
    }
}

impl From<ChapterBody> for Chapter {
    fn from(body: ChapterBody) -> Self {
        Chapter::new(body.title).with_content(body.content)
    }
}

/// Book fields editable through the API. Images are uploaded separately.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DraftRequest {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub publisher: String,
    pub cover_text: String,
    pub author_image_position: AuthorImagePosition,
    pub chapters: Vec<ChapterBody>,
}

impl DraftRequest {
    fn apply(self, book: Book) -> Book {
        book.edit(|b| {
            b.title = self.title;
            b.subtitle = self.subtitle;
            b.author = self.author;
            b.publisher = self.publisher;
            b.cover_text = self.cover_text;
            b.author_image_position = self.author_image_position;
            b.chapters = self.chapters.into_iter().map(Chapter::from).collect();
        })
    }
}

/// Full draft response
#[derive(Debug, Serialize)]
pub struct DraftResponse {
    pub id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub publisher: String,
    pub cover_text: String,
    pub author_image_position: AuthorImagePosition,
    pub has_cover_image: bool,
    pub has_author_image: bool,
    pub chapters: Vec<ChapterBody>,
    pub generation: u64,
    pub last_modified: DateTime<Utc>,
}

impl DraftResponse {
    fn new(book: &Book, generation: u64) -> Self {
        Self {
            id: book.id(),
            title: book.title.clone(),
            subtitle: book.subtitle.clone(),
            author: book.author.clone(),
            publisher: book.publisher.clone(),
            cover_text: book.cover_text.clone(),
            author_image_position: book.author_image_position,
            has_cover_image: book.cover_image.is_some(),
            has_author_image: book.author_image.is_some(),
            chapters: book.chapters.iter().map(ChapterBody::from).collect(),
            generation,
            last_modified: book.last_modified(),
        }
    }

    fn from_session(session: &PreviewSession) -> Self {
        Self::new(session.book(), session.generation())
    }
}

/// Draft summary for list response
#[derive(Debug, Serialize)]
pub struct DraftSummary {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub chapters: usize,
    pub last_modified: DateTime<Utc>,
}

/// Apply an edit to an open draft, save it, then start a fresh preview.
///
/// The draft is only replaced once its file is written; on any failure it
/// stays as it was. The drafts map is not locked during the write.
pub(crate) async fn apply_edit(
    state: &AppState,
    id: Uuid,
    edit: impl FnOnce(Book) -> ApiResult<Book>,
) -> ApiResult<DraftResponse> {
    let _editing = state.lock_draft(id).await;

    let (generation, book) = {
        let drafts = state.drafts.read().await;
        let session = drafts.get(&id).ok_or_else(|| draft_not_found(id))?;
        (session.generation(), session.book().clone())
    };

    let book = edit(book)?;
    state.persist_draft(&book).await.map_err(storage_error)?;

    let response = {
        let mut drafts = state.drafts.write().await;
        let session = drafts.get_mut(&id).ok_or_else(|| draft_not_found(id))?;

        // Only a configuration change can land in between; keep the newer layout
        let book = if session.generation() == generation {
            book
        } else {
            tracing::debug!("Draft {} was re-laid out during an edit", id);
            book.with_config(session.book().config.clone())
        };
        session.replace(book);
        DraftResponse::from_session(session)
    };

    state.broadcast(ServerEvent::DraftUpdated {
        id,
        title: response.title.clone(),
        generation: response.generation,
    });
    state.schedule_render(id);

    Ok(response)
}

/// Save a new book and open it as a draft
async fn open_draft(state: &AppState, book: Book) -> ApiResult<DraftResponse> {
    let book = book.with_config(state.configuration().await);
    state.persist_draft(&book).await.map_err(storage_error)?;

    let id = book.id();
    let session = PreviewSession::new(book);
    let response = DraftResponse::from_session(&session);
    state.drafts.write().await.insert(id, session);

    state.broadcast(ServerEvent::DraftUpdated {
        id,
        title: response.title.clone(),
        generation: response.generation,
    });
    state.schedule_render(id);

    Ok(response)
}

/// List all open drafts
pub async fn list_drafts(State(state): State<AppState>) -> Json<Vec<DraftSummary>> {
    let drafts = state.drafts.read().await;

    let mut summaries: Vec<DraftSummary> = drafts
        .values()
        .map(|session| {
            let book = session.book();
            DraftSummary {
                id: book.id(),
                title: book.title.clone(),
                author: book.author.clone(),
                chapters: book.chapters.len(),
                last_modified: book.last_modified(),
            }
        })
        .collect();

    // Sort by title
    summaries.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));

    Json(summaries)
}

/// Create a new draft
pub async fn create_draft(
    State(state): State<AppState>,
    Json(request): Json<DraftRequest>,
) -> ApiResult<(StatusCode, Json<DraftResponse>)> {
    let book = request.apply(Book::new(""));
    let response = open_draft(&state, book).await?;

    tracing::info!("Created draft {} '{}'", response.id, response.title);
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get a single draft
pub async fn get_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DraftResponse>> {
    let id = parse_id(&id)?;
    let drafts = state.drafts.read().await;
    let session = drafts.get(&id).ok_or_else(|| draft_not_found(id))?;
    Ok(Json(DraftResponse::from_session(session)))
}

/// Replace a draft's metadata and chapters
pub async fn update_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DraftRequest>,
) -> ApiResult<Json<DraftResponse>> {
    let id = parse_id(&id)?;
    let response = apply_edit(&state, id, |book| Ok(request.apply(book))).await?;
    Ok(Json(response))
}

/// Delete a draft and its file
pub async fn delete_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    let editing = state.lock_draft(id).await;

    if !state.drafts.read().await.contains_key(&id) {
        return Err(draft_not_found(id));
    }

    // Remove the file first so a failure leaves the draft open
    match state.storage.remove(id).await {
        Ok(()) | Err(pagewright_core::StorageError::NotFound(_)) => {}
        Err(e) => return Err(storage_error(e)),
    }
    state.drafts.write().await.remove(&id);
    drop(editing);
    state.forget_draft_lock(id).await;

    tracing::info!("Deleted draft {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Download a draft as a flat book file
pub async fn save_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let drafts = state.drafts.read().await;
    let book = drafts.get(&id).ok_or_else(|| draft_not_found(id))?.book();

    let filename = format!(
        "{}.{}",
        sanitize_filename(&book.title, 50),
        bookfile::EXTENSION
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bookfile::save(book),
    )
        .into_response())
}

/// Open a flat book file as a draft. A draft with the same id is replaced.
pub async fn load_draft(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<(StatusCode, Json<DraftResponse>)> {
    let book = bookfile::load(&body)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to load: {}", e)))?;
    let id = book.id();

    let exists = state.drafts.read().await.contains_key(&id);
    if exists {
        let config = state.configuration().await;
        let response = apply_edit(&state, id, |_| Ok(book.with_config(config))).await?;
        return Ok((StatusCode::OK, Json(response)));
    }

    let response = open_draft(&state, book).await?;
    tracing::info!("Loaded draft {} '{}'", response.id, response.title);
    Ok((StatusCode::CREATED, Json(response)))
}

/// Image slots on the cover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageSlot {
    Cover,
    Author,
}

fn parse_slot(slot: &str) -> ApiResult<ImageSlot> {
    match slot {
        "cover" => Ok(ImageSlot::Cover),
        "author" => Ok(ImageSlot::Author),
        other => Err((
            StatusCode::BAD_REQUEST,
            format!("Unknown image slot: {}", other),
        )),
    }
}

fn set_image(book: Book, slot: ImageSlot, image: Option<pagewright_core::ImageBlob>) -> Book {
    match slot {
        ImageSlot::Cover => book.with_cover_image(image),
        ImageSlot::Author => book.with_author_image(image),
    }
}

/// Upload the cover or author image
pub async fn upload_image(
    State(state): State<AppState>,
    Path((id, slot)): Path<(String, String)>,
    mut multipart: axum_extra::extract::Multipart,
) -> ApiResult<Json<DraftResponse>> {
    let id = parse_id(&id)?;
    let slot = parse_slot(&slot)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().map(|s| s.to_string());

        // Read file data
        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

        let image = image::ingest_bytes(data.to_vec(), filename.as_deref()).map_err(|e| {
            state.broadcast(ServerEvent::Error {
                message: format!("Image upload failed for {}: {}", id, e),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        })?;

        tracing::info!(
            "Ingested {} image for {} ({} bytes)",
            image.mime_type(),
            id,
            image.len()
        );

        let response = apply_edit(&state, id, |book| Ok(set_image(book, slot, Some(image)))).await?;
        return Ok(Json(response));
    }

    Err((StatusCode::BAD_REQUEST, "No file provided".to_string()))
}

/// Remove the cover or author image
pub async fn remove_image(
    State(state): State<AppState>,
    Path((id, slot)): Path<(String, String)>,
) -> ApiResult<Json<DraftResponse>> {
    let id = parse_id(&id)?;
    let slot = parse_slot(&slot)?;
    let response = apply_edit(&state, id, |book| Ok(set_image(book, slot, None))).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pagewright_core::settings::MemorySettings;
    use pagewright_core::storage::{DraftStore, MemoryStore, StorageResult};
    use std::sync::Arc;
    use tokio::sync::Semaphore;

    /// Memory store whose writes wait for a permit
    struct GatedStore {
        inner: MemoryStore,
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl DraftStore for GatedStore {
        async fn ids(&self) -> StorageResult<Vec<Uuid>> {
            self.inner.ids().await
        }

        async fn read(&self, id: Uuid) -> StorageResult<String> {
            self.inner.read(id).await
        }

        async fn write(&self, id: Uuid, text: String) -> StorageResult<()> {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            self.inner.write(id, text).await
        }

        async fn remove(&self, id: Uuid) -> StorageResult<()> {
            self.inner.remove(id).await
        }
    }

    fn gated_state() -> (AppState, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let store = GatedStore {
            inner: MemoryStore::new(),
            gate: Arc::clone(&gate),
        };
        let state = AppState::with_parts(Arc::new(store), Box::new(MemorySettings::new()));
        (state, gate)
    }

    async fn open(state: &AppState, title: &str) -> Uuid {
        let book = Book::new(title);
        let id = book.id();
        state.drafts.write().await.insert(id, PreviewSession::new(book));
        id
    }

    #[tokio::test]
    async fn test_drafts_stay_readable_while_an_edit_saves() {
        let (state, gate) = gated_state();
        let id = open(&state, "Slow").await;
        let other = open(&state, "Other").await;

        let editing = tokio::spawn({
            let state = state.clone();
            async move { apply_edit(&state, id, |book| Ok(book.with_title("Renamed"))).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!editing.is_finished());

        {
            let drafts = state
                .drafts
                .try_write()
                .expect("drafts map must not be held during a save");
            assert_eq!(drafts[&id].book().title, "Slow");
            assert_eq!(drafts[&other].book().title, "Other");
        }

        gate.add_permits(1);
        let response = editing.await.unwrap().unwrap();
        assert_eq!(response.title, "Renamed");
        assert_eq!(state.drafts.read().await[&id].book().title, "Renamed");
    }

    #[tokio::test]
    async fn test_concurrent_edits_all_land_in_memory_and_on_disk() {
        let (state, gate) = gated_state();
        let id = open(&state, "Busy").await;
        gate.add_permits(8);

        let edits: Vec<_> = (0..8)
            .map(|n| {
                let state = state.clone();
                tokio::spawn(async move {
                    apply_edit(&state, id, |book| {
                        Ok(book.with_chapter(Chapter::new(format!("Chapter {}", n))))
                    })
                    .await
                })
            })
            .collect();
        for edit in edits {
            edit.await.unwrap().unwrap();
        }

        let drafts = state.drafts.read().await;
        assert_eq!(drafts[&id].book().chapters.len(), 8);
        let saved = bookfile::load(&state.storage.read(id).await.unwrap()).unwrap();
        assert_eq!(&saved.chapters, &drafts[&id].book().chapters);
    }

    #[tokio::test]
    async fn test_configuration_change_during_an_edit_is_kept() {
        let (state, gate) = gated_state();
        let id = open(&state, "Laid out").await;

        let editing = tokio::spawn({
            let state = state.clone();
            async move { apply_edit(&state, id, |book| Ok(book.with_author("Someone"))).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let mut config = pagewright_core::Configuration::default();
        config.font_size = 20.0;
        state
            .drafts
            .write()
            .await
            .get_mut(&id)
            .unwrap()
            .update(|book| book.with_config(config.clone()));

        gate.add_permits(1);
        editing.await.unwrap().unwrap();

        let drafts = state.drafts.read().await;
        assert_eq!(drafts[&id].book().author, "Someone");
        assert_eq!(drafts[&id].book().config.font_size, 20.0);
    }
}
