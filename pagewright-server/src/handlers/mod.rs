//! Request handlers

mod chapters;
mod config;
mod drafts;
mod render;
mod sync;

pub use chapters::*;
pub use config::*;
pub use drafts::*;
pub use render::*;
pub use sync::*;

use axum::http::StatusCode;
use axum::Json;
use pagewright_core::StorageError;
use serde::Serialize;
use uuid::Uuid;

/// Handler result carrying a status and message on failure
pub type ApiResult<T> = Result<T, (StatusCode, String)>;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Parse a draft id from the path
fn parse_id(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| (StatusCode::BAD_REQUEST, format!("Invalid draft id: {}", id)))
}

fn draft_not_found(id: Uuid) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("Draft not found: {}", id))
}

fn storage_error(e: StorageError) -> (StatusCode, String) {
    tracing::error!("Storage failure: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Sanitize a filename for Content-Disposition header
fn sanitize_filename(name: &str, max_len: usize) -> String {
    let name = name
        .chars()
        .take(max_len)
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_' || *c == '.')
        .collect::<String>()
        .trim()
        .to_string();
    if name.is_empty() {
        "untitled".to_string()
    } else {
        name
    }
}
