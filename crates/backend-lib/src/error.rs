// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use dropmate_common::RequestStatus;
use thiserror::Error;

use crate::views::NoticeView;

/// Errors a processor operation or handler can end in.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Request not found: {0}")]
    RequestNotFound(String),

    #[error("Request {request_id} already decided: {status}")]
    AlreadyDecided {
        request_id: String,
        status: RequestStatus,
    },

    #[error("Locker {0} is not accepting requests")]
    LockerDisabled(String),

    #[error("Bad command: {0}")]
    BadCommand(String),

    #[error("Page rendering failed: {0}")]
    Render(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::RequestNotFound(_) => StatusCode::NOT_FOUND,
            // informational outcomes, the visitor or owner just sees a notice
            AppError::AlreadyDecided { .. } | AppError::LockerDisabled(_) => StatusCode::OK,
            AppError::BadCommand(_) => StatusCode::BAD_REQUEST,
            AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::RequestNotFound(_) => "REQ_001",
            AppError::AlreadyDecided { .. } => "REQ_002",
            AppError::LockerDisabled(_) => "LOCKER_001",
            AppError::BadCommand(_) => "CMD_001",
            AppError::Render(_) => "VIEW_001",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "request ended with notice");
        }

        match NoticeView::from(&self).render() {
            Ok(page) => (status, Html(page)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "failed to render error page");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
        }
    }
}
