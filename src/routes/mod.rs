// src/routes/mod.rs
pub mod chat;
pub mod predict;

use crate::state::SharedState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use chat::{chat_handler, session_handler};
use predict::{predict_handler, status_handler};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn create_router() -> Router<SharedState> {
    Router::new()
        .route(
            "/predict",
            post(predict_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/chat", post(chat_handler))
        .route("/session/{id}", get(session_handler))
        .route("/status", get(status_handler))
        .route("/health", get(|| async { "OK" }))
        .fallback_service(ServeDir::new("public"))
        .layer(TraceLayer::new_for_http())
}
