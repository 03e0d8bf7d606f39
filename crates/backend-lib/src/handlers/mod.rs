// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers.
use serde::Deserialize;

use crate::{error::AppError, AppState};

pub mod actions;
pub mod pages;
pub mod stream;
pub mod view_renderer;
pub mod webhook;

#[derive(Debug, Default, Deserialize)]
pub struct LockerQuery {
    pub locker_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestQuery {
    pub request_id: Option<String>,
}

/// Query parameters of `/decision` and `/door`.
#[derive(Debug, Default, Deserialize)]
pub struct ActionQuery {
    pub request_id: Option<String>,
    pub locker_id: Option<String>,
    pub action: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// A parameter the route cannot work without.
fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    non_blank(value).ok_or_else(|| AppError::BadCommand(format!("missing {name}")))
}

fn locker_or_default(state: &AppState, value: Option<String>) -> String {
    non_blank(value).unwrap_or_else(|| state.default_locker_id().to_string())
}
