// ============================
// crates/backend-lib/src/handlers/webhook.rs
// ============================
use axum::{body::Bytes, extract::State, http::StatusCode};

use crate::AppState;

/// LINE webhook. Always 200 so the platform never retries a batch.
pub async fn receive(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let outcomes =
        crate::webhook::handle_body(&state.processor, state.default_locker_id(), &body).await;
    tracing::debug!(events = outcomes.len(), "webhook handled");
    StatusCode::OK
}
