//! Chapter editing handlers

use super::{apply_edit, parse_id, ApiResult, ChapterBody, DraftResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use pagewright_core::{Book, Chapter};
use serde::Deserialize;

fn check_index(book: &Book, index: usize) -> ApiResult<()> {
    if index < book.chapters.len() {
        Ok(())
    } else {
        Err((
            StatusCode::NOT_FOUND,
            format!("Chapter {} not found", index),
        ))
    }
}

/// Append a chapter
pub async fn add_chapter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(chapter): Json<ChapterBody>,
) -> ApiResult<(StatusCode, Json<DraftResponse>)> {
    let id = parse_id(&id)?;
    let response = apply_edit(&state, id, |book| {
        Ok(book.with_chapter(Chapter::from(chapter)))
    })
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Replace the chapter at `index`
pub async fn update_chapter(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
    Json(chapter): Json<ChapterBody>,
) -> ApiResult<Json<DraftResponse>> {
    let id = parse_id(&id)?;
    let response = apply_edit(&state, id, |book| {
        check_index(&book, index)?;
        Ok(book.with_chapter_at(index, Chapter::from(chapter)))
    })
    .await?;
    Ok(Json(response))
}

/// Remove the chapter at `index`
pub async fn delete_chapter(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
) -> ApiResult<Json<DraftResponse>> {
    let id = parse_id(&id)?;
    let response = apply_edit(&state, id, |book| {
        check_index(&book, index)?;
        Ok(book.without_chapter(index))
    })
    .await?;
    Ok(Json(response))
}

/// Target position for a chapter move
#[derive(Debug, Deserialize)]
pub struct MoveChapterRequest {
    pub to: usize,
}

/// Move the chapter at `index` to a new position
pub async fn move_chapter(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
    Json(request): Json<MoveChapterRequest>,
) -> ApiResult<Json<DraftResponse>> {
    let id = parse_id(&id)?;
    let response = apply_edit(&state, id, |book| {
        check_index(&book, index)?;
        check_index(&book, request.to)?;
        Ok(book.with_chapter_moved(index, request.to))
    })
    .await?;
    Ok(Json(response))
}
