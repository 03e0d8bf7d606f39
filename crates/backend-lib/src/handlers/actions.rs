// ============================
// crates/backend-lib/src/handlers/actions.rs
// ============================
//! Owner links (sent as quick replies) and the door hook.
use axum::{
    extract::{Query, State},
    response::Html,
};

use super::view_renderer::render_template;
use super::{locker_or_default, non_blank, ActionQuery, LockerQuery};
use crate::processor::Ack;
use crate::{error::AppError, views::NoticeView, AppState};

/// `approve` / `deny` a request, or `disable` a locker's QR.
///
/// Anything but `disable` is about a request: an unknown request is reported
/// before the action is looked at, and a decided one stays decided whatever
/// the action says.
pub async fn decision(
    State(state): State<AppState>,
    Query(query): Query<ActionQuery>,
) -> Result<Html<String>, AppError> {
    let processor = &state.processor;
    let action = non_blank(query.action).unwrap_or_default();
    if action == "disable" {
        let locker_id = locker_or_default(&state, query.locker_id);
        processor.set_locker_disabled(&locker_id, true, Ack::Push).await;
        return render_template(NoticeView::qr_disabled(&locker_id));
    }

    let request_id = non_blank(query.request_id).unwrap_or_default();
    let request = processor
        .store()
        .request(&request_id)
        .ok_or_else(|| AppError::RequestNotFound(request_id.clone()))?;
    if request.status.is_terminal() {
        return Err(AppError::AlreadyDecided {
            request_id,
            status: request.status,
        });
    }

    match action.as_str() {
        "approve" => {
            let request = processor.approve(&request_id).await?;
            render_template(NoticeView::approved(&request))
        }
        "deny" => {
            let request = processor.deny(&request_id).await?;
            render_template(NoticeView::denied(&request))
        }
        other => Err(AppError::BadCommand(format!("unknown action {other:?}"))),
    }
}

pub async fn enable(
    State(state): State<AppState>,
    Query(query): Query<LockerQuery>,
) -> Result<Html<String>, AppError> {
    let locker_id = locker_or_default(&state, query.locker_id);
    state
        .processor
        .set_locker_disabled(&locker_id, false, Ack::Push)
        .await;
    render_template(NoticeView::qr_enabled(&locker_id))
}

/// Door sensor / controller reports.
pub async fn door(
    State(state): State<AppState>,
    Query(query): Query<ActionQuery>,
) -> Result<Html<String>, AppError> {
    let open = match query.action.as_deref().map(str::trim) {
        Some("open") => true,
        Some("close") => false,
        other => {
            return Err(AppError::BadCommand(format!(
                "unknown door action {:?}",
                other.unwrap_or_default()
            )))
        }
    };
    let locker_id = locker_or_default(&state, query.locker_id);
    state.processor.set_door_open(&locker_id, open);
    render_template(NoticeView::door_changed(&locker_id, open))
}
