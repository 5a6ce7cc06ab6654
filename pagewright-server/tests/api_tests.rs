//! Integration tests for the Pagewright Server API

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use pagewright_core::bookfile;
use pagewright_core::settings::JsonFileSettings;
use pagewright_core::storage::DirectoryStore;
use pagewright_core::{Book, Chapter};
use pagewright_server::routes::create_router;
use pagewright_server::state::{AppState, ServerEvent};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDRfake";

/// Create a test app state over a storage directory
fn create_state_at(path: &Path) -> AppState {
    let storage = Arc::new(DirectoryStore::new(path.join("drafts")));
    let settings = JsonFileSettings::open(path.join("settings.json")).unwrap();
    AppState::with_parts(storage, Box::new(settings))
}

/// Create a test server and keep a handle on its state
fn create_test_server() -> (TestServer, AppState, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let state = create_state_at(temp_dir.path());
    let server = TestServer::new(create_router(state.clone())).expect("Failed to create test server");
    (server, state, temp_dir)
}

/// Create a draft and return its id
async fn create_draft(server: &TestServer, body: Value) -> String {
    let response = server.post("/api/v1/drafts").json(&body).await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["id"].as_str().unwrap().to_string()
}

fn sample_draft() -> Value {
    json!({
        "title": "Test Novel",
        "author": "A. Writer",
        "chapters": [
            { "title": "One", "content": "Hello **world**\n[[PAGEBREAK]]\nSecond page." },
            { "title": "Two", "content": "The end." }
        ]
    })
}

// =============================================================================
// Health and drafts
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let (server, _state, _temp_dir) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_list_drafts_empty() {
    let (server, _state, _temp_dir) = create_test_server();

    let response = server.get("/api/v1/drafts").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_create_and_get_draft() {
    let (server, _state, temp_dir) = create_test_server();
    let id = create_draft(&server, sample_draft()).await;

    let response = server.get(&format!("/api/v1/drafts/{}", id)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["title"], "Test Novel");
    assert_eq!(body["author"], "A. Writer");
    assert_eq!(body["chapters"].as_array().unwrap().len(), 2);
    assert_eq!(body["author_image_position"], "bottom-right");
    assert_eq!(body["has_cover_image"], false);

    let list: Value = server.get("/api/v1/drafts").await.json();
    assert_eq!(list[0]["id"], id.as_str());
    assert_eq!(list[0]["chapters"], 2);

    // Saved as a flat file
    let path = temp_dir.path().join("drafts").join(format!("{}.book", id));
    let saved = std::fs::read_to_string(path).unwrap();
    assert!(saved.starts_with(bookfile::SIGNATURE));
}

#[tokio::test]
async fn test_get_draft_invalid_uuid() {
    let (server, _state, _temp_dir) = create_test_server();

    let response = server.get("/api/v1/drafts/invalid-uuid").await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_get_draft_not_found() {
    let (server, _state, _temp_dir) = create_test_server();

    let response = server
        .get("/api/v1/drafts/00000000-0000-0000-0000-000000000000")
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_update_draft_bumps_generation() {
    let (server, _state, _temp_dir) = create_test_server();
    let id = create_draft(&server, sample_draft()).await;

    let before: Value = server.get(&format!("/api/v1/drafts/{}", id)).await.json();
    let response = server
        .put(&format!("/api/v1/drafts/{}", id))
        .json(&json!({ "title": "Renamed", "author_image_position": "top-left" }))
        .await;

    response.assert_status_ok();
    let after: Value = response.json();
    assert_eq!(after["title"], "Renamed");
    assert_eq!(after["author_image_position"], "top-left");
    assert_eq!(after["chapters"].as_array().unwrap().len(), 0);
    assert!(after["generation"].as_u64() > before["generation"].as_u64());
}

#[tokio::test]
async fn test_delete_draft() {
    let (server, _state, temp_dir) = create_test_server();
    let id = create_draft(&server, sample_draft()).await;

    server
        .delete(&format!("/api/v1/drafts/{}", id))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .get(&format!("/api/v1/drafts/{}", id))
        .await
        .assert_status_not_found();
    server
        .delete(&format!("/api/v1/drafts/{}", id))
        .await
        .assert_status_not_found();
    assert!(!temp_dir
        .path()
        .join("drafts")
        .join(format!("{}.book", id))
        .exists());
}

#[tokio::test]
async fn test_drafts_restored_at_startup() {
    let temp_dir = TempDir::new().unwrap();
    let id = {
        let state = create_state_at(temp_dir.path());
        let server = TestServer::new(create_router(state)).unwrap();
        create_draft(&server, sample_draft()).await
    };

    let state = create_state_at(temp_dir.path());
    assert_eq!(state.restore_drafts().await.unwrap(), 1);
    let server = TestServer::new(create_router(state)).unwrap();

    let body: Value = server.get(&format!("/api/v1/drafts/{}", id)).await.json();
    assert_eq!(body["title"], "Test Novel");
    assert_eq!(
        body["chapters"][0]["content"],
        "Hello **world**\n[[PAGEBREAK]]\nSecond page."
    );
}

// =============================================================================
// Chapters
// =============================================================================

#[tokio::test]
async fn test_chapter_editing() {
    let (server, _state, _temp_dir) = create_test_server();
    let id = create_draft(&server, sample_draft()).await;
    let base = format!("/api/v1/drafts/{}/chapters", id);

    let response = server
        .post(&base)
        .json(&json!({ "title": "Three", "content": "More." }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["chapters"][2]["title"], "Three");

    let body: Value = server
        .post(&format!("{}/2/move", base))
        .json(&json!({ "to": 0 }))
        .await
        .json();
    let titles: Vec<_> = body["chapters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, ["Three", "One", "Two"]);

    let body: Value = server
        .put(&format!("{}/1", base))
        .json(&json!({ "title": "Uno", "content": "Rewritten." }))
        .await
        .json();
    assert_eq!(body["chapters"][1]["title"], "Uno");
    assert_eq!(body["chapters"][1]["content"], "Rewritten.");

    let body: Value = server.delete(&format!("{}/0", base)).await.json();
    assert_eq!(body["chapters"].as_array().unwrap().len(), 2);

    server
        .delete(&format!("{}/9", base))
        .await
        .assert_status_not_found();
    server
        .post(&format!("{}/0/move", base))
        .json(&json!({ "to": 5 }))
        .await
        .assert_status_not_found();
}

// =============================================================================
// Preview and export
// =============================================================================

#[tokio::test]
async fn test_preview_json() {
    let (server, _state, _temp_dir) = create_test_server();
    let id = create_draft(&server, sample_draft()).await;

    let response = server.get(&format!("/api/v1/drafts/{}/preview", id)).await;

    response.assert_status_ok();
    let body: Value = response.json();
    // cover, contents, two pages for chapter one, one for chapter two
    assert_eq!(body["pages"].as_array().unwrap().len(), 5);
    assert_eq!(body["toc"][0]["page"], 3);
    assert_eq!(body["toc"][1]["page"], 5);
    assert_eq!(body["pages"][0]["kind"], "cover");
}

#[tokio::test]
async fn test_preview_html() {
    let (server, _state, _temp_dir) = create_test_server();
    let id = create_draft(&server, sample_draft()).await;

    let response = server
        .get(&format!("/api/v1/drafts/{}/preview", id))
        .add_query_param("format", "html")
        .await;

    response.assert_status_ok();
    let html = response.text();
    assert_eq!(html.matches("<section class=\"page").count(), 5);
    assert!(html.contains("<strong>world</strong>"));
}

#[tokio::test]
async fn test_preview_invalid_format() {
    let (server, _state, _temp_dir) = create_test_server();
    let id = create_draft(&server, sample_draft()).await;

    server
        .get(&format!("/api/v1/drafts/{}/preview", id))
        .add_query_param("format", "pdf")
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn test_export_txt() {
    let (server, state, _temp_dir) = create_test_server();
    let id = create_draft(&server, sample_draft()).await;
    let mut events = state.subscribe();

    let response = server
        .get(&format!("/api/v1/drafts/{}/export", id))
        .add_query_param("format", "txt")
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "text/plain; charset=utf-8"
    );
    assert!(response
        .header("content-disposition")
        .to_str()
        .unwrap()
        .contains("Test Novel.txt"));
    assert!(response.text().contains("Hello world"));

    loop {
        match events.recv().await.unwrap() {
            ServerEvent::ExportComplete { format, .. } => {
                assert_eq!(format, "txt");
                break;
            }
            ServerEvent::Error { message } => panic!("unexpected error: {}", message),
            _ => continue,
        }
    }
}

#[tokio::test]
async fn test_export_invalid_format() {
    let (server, _state, _temp_dir) = create_test_server();
    let id = create_draft(&server, sample_draft()).await;

    server
        .get(&format!("/api/v1/drafts/{}/export", id))
        .add_query_param("format", "epub")
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn test_export_not_found() {
    let (server, _state, _temp_dir) = create_test_server();

    // Default format is pdf; the draft does not exist
    server
        .get("/api/v1/drafts/00000000-0000-0000-0000-000000000000/export")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_export_failure_is_per_format() {
    let (server, _state, _temp_dir) = create_test_server();
    let id = create_draft(
        &server,
        json!({ "title": "Unicode", "chapters": [{ "title": "One", "content": "日本語" }] }),
    )
    .await;

    server
        .get(&format!("/api/v1/drafts/{}/export", id))
        .add_query_param("format", "pdf")
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    for format in ["html", "txt", "docx"] {
        server
            .get(&format!("/api/v1/drafts/{}/export", id))
            .add_query_param("format", format)
            .await
            .assert_status_ok();
    }
}

#[tokio::test]
async fn test_export_missing_title() {
    let (server, _state, _temp_dir) = create_test_server();
    let id = create_draft(&server, json!({ "title": "  " })).await;

    server
        .get(&format!("/api/v1/drafts/{}/export", id))
        .add_query_param("format", "html")
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Save and load
// =============================================================================

#[tokio::test]
async fn test_save_and_load() {
    let (server, _state, _temp_dir) = create_test_server();
    let id = create_draft(&server, sample_draft()).await;

    let response = server.get(&format!("/api/v1/drafts/{}/save", id)).await;
    response.assert_status_ok();
    let saved = response.text();
    assert!(saved.starts_with(bookfile::SIGNATURE));

    // Loading a draft that is already open replaces it
    let response = server.post("/api/v1/drafts/load").text(saved).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["id"], id.as_str());

    // A new book becomes a new draft
    let book = Book::new("Imported").with_chapter(Chapter::new("Only").with_content("text"));
    let response = server
        .post("/api/v1/drafts/load")
        .text(bookfile::save(&book))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["id"], book.id().to_string());

    let list: Value = server.get("/api/v1/drafts").await.json();
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_load_malformed_file() {
    let (server, _state, _temp_dir) = create_test_server();

    let response = server
        .post("/api/v1/drafts/load")
        .text("this is not a book")
        .await;

    response.assert_status_bad_request();
    let list: Value = server.get("/api/v1/drafts").await.json();
    assert_eq!(list.as_array().unwrap().len(), 0);
}

// =============================================================================
// Images
// =============================================================================

#[tokio::test]
async fn test_upload_cover_image() {
    let (server, _state, _temp_dir) = create_test_server();
    let id = create_draft(&server, sample_draft()).await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(PNG.to_vec())
            .file_name("cover.png")
            .mime_type("image/png"),
    );
    let response = server
        .post(&format!("/api/v1/drafts/{}/images/cover", id))
        .multipart(form)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["has_cover_image"], true);
    assert_eq!(body["has_author_image"], false);

    let body: Value = server
        .delete(&format!("/api/v1/drafts/{}/images/cover", id))
        .await
        .json();
    assert_eq!(body["has_cover_image"], false);
}

#[tokio::test]
async fn test_upload_unrecognized_image_leaves_draft_unchanged() {
    let (server, _state, _temp_dir) = create_test_server();
    let id = create_draft(&server, sample_draft()).await;
    let before: Value = server.get(&format!("/api/v1/drafts/{}", id)).await.json();

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"plain text".to_vec()).file_name("notes.txt"),
    );
    server
        .post(&format!("/api/v1/drafts/{}/images/author", id))
        .multipart(form)
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let after: Value = server.get(&format!("/api/v1/drafts/{}", id)).await.json();
    assert_eq!(after["generation"], before["generation"]);
    assert_eq!(after["has_author_image"], false);
}

#[tokio::test]
async fn test_upload_unknown_slot() {
    let (server, _state, _temp_dir) = create_test_server();
    let id = create_draft(&server, sample_draft()).await;

    let form = MultipartForm::new().add_part("file", Part::bytes(PNG.to_vec()));
    server
        .post(&format!("/api/v1/drafts/{}/images/back", id))
        .multipart(form)
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn test_upload_no_file() {
    let (server, _state, _temp_dir) = create_test_server();
    let id = create_draft(&server, sample_draft()).await;

    // POST with no file should fail
    let response = server
        .post(&format!("/api/v1/drafts/{}/images/cover", id))
        .await;

    response.assert_status_bad_request();
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn test_config_defaults() {
    let (server, _state, _temp_dir) = create_test_server();

    let body: Value = server.get("/api/v1/config").await.json();

    assert_eq!(body["font_size"], 12.0);
    assert_eq!(body["page_number_alignment"], "center");
}

#[tokio::test]
async fn test_config_update_applies_to_drafts() {
    let (server, _state, temp_dir) = create_test_server();
    let id = create_draft(&server, sample_draft()).await;

    let mut config: Value = server.get("/api/v1/config").await.json();
    config["page_number_alignment"] = json!("none");
    config["font_size"] = json!(14.0);

    server.put("/api/v1/config").json(&config).await.assert_status_ok();

    let body: Value = server.get("/api/v1/config").await.json();
    assert_eq!(body["font_size"], 14.0);

    let preview: Value = server
        .get(&format!("/api/v1/drafts/{}/preview", id))
        .await
        .json();
    assert_eq!(preview["config"]["font_size"], 14.0);
    assert!(preview["pages"][2]["footer"].is_null());

    // Persisted to the settings file
    let settings = std::fs::read_to_string(temp_dir.path().join("settings.json")).unwrap();
    assert!(settings.contains("\"font_size\": \"14\""));
}

#[tokio::test]
async fn test_config_rejects_invalid_values() {
    let (server, _state, _temp_dir) = create_test_server();

    let mut config: Value = server.get("/api/v1/config").await.json();
    config["font_size"] = json!(500.0);

    server
        .put("/api/v1/config")
        .json(&config)
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = server.get("/api/v1/config").await.json();
    assert_eq!(body["font_size"], 12.0);
}

#[tokio::test]
async fn test_config_reset() {
    let (server, _state, _temp_dir) = create_test_server();

    let mut config: Value = server.get("/api/v1/config").await.json();
    config["line_height"] = json!(2.0);
    server.put("/api/v1/config").json(&config).await.assert_status_ok();

    let body: Value = server.post("/api/v1/config/reset").await.json();
    assert_eq!(body["line_height"], 1.5);
}

// =============================================================================
// Events
// =============================================================================

#[tokio::test]
async fn test_preview_ready_event_after_edit() {
    let (server, state, _temp_dir) = create_test_server();
    let mut events = state.subscribe();

    let id = create_draft(&server, sample_draft()).await;

    let mut saw_update = false;
    loop {
        match events.recv().await.unwrap() {
            ServerEvent::DraftUpdated { id: got, .. } => {
                assert_eq!(got.to_string(), id);
                saw_update = true;
            }
            ServerEvent::PreviewReady { id: got, pages, .. } => {
                assert_eq!(got.to_string(), id);
                assert_eq!(pages, 5);
                break;
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert!(saw_update);
}

#[tokio::test]
async fn test_cors_headers() {
    let (server, _state, _temp_dir) = create_test_server();

    // Response should succeed (CORS is configured)
    server.get("/api/v1/drafts").await.assert_status_ok();
}
