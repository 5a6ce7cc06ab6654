//! Server-Sent Events handler for live preview updates

use crate::state::{AppState, ServerEvent};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Event name and JSON payload for an SSE frame
pub fn event_payload(event: &ServerEvent) -> (&'static str, serde_json::Value) {
    match event {
        ServerEvent::DraftUpdated {
            id,
            title,
            generation,
        } => (
            "draft_updated",
            serde_json::json!({ "id": id, "title": title, "generation": generation }),
        ),
        ServerEvent::PreviewReady {
            id,
            generation,
            pages,
        } => (
            "preview_ready",
            serde_json::json!({ "id": id, "generation": generation, "pages": pages }),
        ),
        ServerEvent::ExportComplete { id, format } => (
            "export_complete",
            serde_json::json!({ "id": id, "format": format }),
        ),
        ServerEvent::Error { message } => ("error", serde_json::json!({ "message": message })),
    }
}

/// SSE endpoint for real-time updates
pub async fn sync_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let stream = BroadcastStream::new(rx);

    let event_stream = stream.filter_map(|result| match result {
        Ok(event) => {
            let (event_type, data) = event_payload(&event);
            Some(Ok(Event::default().event(event_type).data(data.to_string())))
        }
        Err(_) => None, // Lagged, skip
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}
