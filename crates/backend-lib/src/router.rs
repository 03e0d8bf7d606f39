// ============================
// dropmate-backend-lib/src/router.rs
// ============================
//! HTTP router.
use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{actions, pages, stream, webhook};
use crate::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/", get(pages::home))
        .route("/scan", get(pages::scan))
        .route("/status", get(pages::status))
        .route("/locker", get(pages::locker))
        .route("/status-stream", get(stream::status_stream))
        .route("/locker-stream", get(stream::locker_stream))
        .route("/decision", get(actions::decision))
        .route("/enable", get(actions::enable))
        .route("/door", get(actions::door))
        .route("/webhook", post(webhook::receive))
        .route("/healthz", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "ok"
}
