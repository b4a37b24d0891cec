pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::ingest::handlers as ingest_handlers;
use crate::query::handlers as query_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Leave headroom over the configured file cap for multipart framing.
    let body_limit = state.config.max_upload_bytes + 16 * 1024;

    Router::new()
        .route("/health", get(health::health_handler))
        // Ingestion API
        .route(
            "/api/v1/resumes",
            post(ingest_handlers::handle_upload).get(ingest_handlers::handle_list),
        )
        .route("/api/v1/resumes/:id", get(ingest_handlers::handle_get))
        .route(
            "/api/v1/resumes/:id/status",
            get(ingest_handlers::handle_status),
        )
        .route(
            "/api/v1/resumes/:id/chunks",
            get(ingest_handlers::handle_chunks),
        )
        .route(
            "/api/v1/resumes/:id/reprocess",
            post(ingest_handlers::handle_reprocess),
        )
        // Query API
        .route("/api/v1/search", post(query_handlers::handle_search))
        .route("/api/v1/chat", post(query_handlers::handle_chat))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
