//! Preview and export handlers

use super::{draft_not_found, parse_id, sanitize_filename, ApiResult};
use crate::state::{AppState, ServerEvent};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use pagewright_core::encoder::render_html;
use pagewright_core::{ExportError, ExportFormat};
use serde::Deserialize;

/// Preview query parameters
#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    /// `json` (default) or `html`
    pub format: Option<String>,
}

/// Latest preview of a draft, as the document model or rendered HTML
pub async fn preview_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let format = query.format.unwrap_or_else(|| "json".to_string());
    if format != "json" && format != "html" {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Unsupported preview format: {}", format),
        ));
    }

    let doc = state
        .render_preview(id)
        .await
        .ok_or_else(|| draft_not_found(id))?;

    if format == "html" {
        Ok(Html(render_html(&doc)).into_response())
    } else {
        Ok(Json(&*doc).into_response())
    }
}

/// Download query parameters
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// Output format (pdf, docx, txt, html)
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "pdf".to_string()
}

fn export_status(e: &ExportError) -> StatusCode {
    match e {
        ExportError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
        ExportError::UnsupportedFeature(_) | ExportError::MissingField(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ExportError::EncodingFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Export a draft in the requested format
pub async fn export_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let format: ExportFormat = query
        .format
        .parse()
        .map_err(|e: ExportError| (export_status(&e), e.to_string()))?;

    let doc = state
        .render_preview(id)
        .await
        .ok_or_else(|| draft_not_found(id))?;
    let title = doc.title().to_string();

    // Encode in a blocking task (CPU-intensive operation)
    let output = tokio::task::spawn_blocking(move || pagewright_core::export(&doc, format))
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Task failed: {}", e),
            )
        })?;

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!("Export of {} as {} failed: {}", id, format, e);
            state.broadcast(ServerEvent::Error {
                message: format!("Export of {} as {} failed: {}", id, format, e),
            });
            return Err((export_status(&e), e.to_string()));
        }
    };

    // Broadcast event
    state.broadcast(ServerEvent::ExportComplete {
        id,
        format: format.to_string(),
    });

    let encoder = format.encoder();
    let filename = format!(
        "{}.{}",
        sanitize_filename(&title, 50),
        encoder.file_extension()
    );

    Ok((
        [
            (header::CONTENT_TYPE, encoder.mime_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        output,
    )
        .into_response())
}
