//! Route table.

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

use super::handlers;
use super::AppState;

/// Largest accepted schema upload.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/query", post(handlers::query))
        .route("/api/schema/upload", post(handlers::upload_schema))
        .route("/api/schema/context", get(handlers::schema_context))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.request_timeout,
        ))
        .layer(cors)
        .with_state(state)
}
