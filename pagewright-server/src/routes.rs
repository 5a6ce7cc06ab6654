//! API routes

use crate::handlers;
use crate::state::AppState;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

/// Origins allowed when `PAGEWRIGHT_CORS_ORIGINS` is not set
const DEV_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

fn cors_layer() -> CorsLayer {
    // PAGEWRIGHT_CORS_ORIGINS can be comma-separated list of origins, or "*" for any
    let origins = match std::env::var("PAGEWRIGHT_CORS_ORIGINS").ok() {
        Some(origins) if origins.trim() == "*" => AllowOrigin::any(),
        Some(origins) => AllowOrigin::list(
            origins
                .split(',')
                .filter_map(|s| s.trim().parse::<HeaderValue>().ok()),
        ),
        None => AllowOrigin::list(
            DEV_ORIGINS
                .iter()
                .map(|origin| HeaderValue::from_static(origin)),
        ),
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Configuration
        .route(
            "/config",
            get(handlers::get_config).put(handlers::put_config),
        )
        .route("/config/reset", post(handlers::reset_config))
        // Drafts
        .route(
            "/drafts",
            get(handlers::list_drafts).post(handlers::create_draft),
        )
        .route("/drafts/load", post(handlers::load_draft))
        .route(
            "/drafts/:id",
            get(handlers::get_draft)
                .put(handlers::update_draft)
                .delete(handlers::delete_draft),
        )
        .route("/drafts/:id/save", get(handlers::save_draft))
        .route("/drafts/:id/preview", get(handlers::preview_draft))
        .route("/drafts/:id/export", get(handlers::export_draft))
        .route(
            "/drafts/:id/images/:slot",
            post(handlers::upload_image).delete(handlers::remove_image),
        )
        // Chapters
        .route("/drafts/:id/chapters", post(handlers::add_chapter))
        .route(
            "/drafts/:id/chapters/:index",
            axum::routing::put(handlers::update_chapter).delete(handlers::delete_chapter),
        )
        .route(
            "/drafts/:id/chapters/:index/move",
            post(handlers::move_chapter),
        )
        // SSE endpoint
        .route("/sync", get(handlers::sync_events));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}
