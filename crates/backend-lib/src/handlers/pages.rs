// ============================
// crates/backend-lib/src/handlers/pages.rs
// ============================
//! Visitor-facing pages.
use axum::{
    extract::{Query, State},
    response::Html,
};

use super::view_renderer::render_template;
use super::{locker_or_default, required, LockerQuery, RequestQuery};
use crate::views::{HomeView, LockerView, RequestStatusView, ScanPendingView};
use crate::{error::AppError, AppState};

pub async fn home(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    render_template(HomeView::new(state.default_locker_id()))
}

/// QR scan: open a request and show the waiting page.
pub async fn scan(
    State(state): State<AppState>,
    Query(query): Query<LockerQuery>,
) -> Result<Html<String>, AppError> {
    let locker_id = locker_or_default(&state, query.locker_id);
    let request = state.processor.request_access(&locker_id).await?;
    render_template(ScanPendingView::from(request))
}

pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<RequestQuery>,
) -> Result<Html<String>, AppError> {
    let request_id = required(query.request_id, "request_id")?;
    let request = state
        .processor
        .store()
        .request(&request_id)
        .ok_or(AppError::RequestNotFound(request_id))?;
    render_template(RequestStatusView::from(request))
}

pub async fn locker(
    State(state): State<AppState>,
    Query(query): Query<LockerQuery>,
) -> Result<Html<String>, AppError> {
    let locker_id = locker_or_default(&state, query.locker_id);
    render_template(LockerView::from(state.processor.store().locker(&locker_id)))
}
