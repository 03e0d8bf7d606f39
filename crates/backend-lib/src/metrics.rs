// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const REQUEST_CREATED: &str = "request.created";
pub const REQUEST_REJECTED: &str = "request.rejected";
pub const REQUEST_DECIDED: &str = "request.decided";
pub const LOCKER_COMMAND: &str = "locker.command";
pub const STREAM_OPENED: &str = "stream.opened";
pub const STREAM_ACTIVE: &str = "stream.active";
pub const WEBHOOK_EVENTS: &str = "webhook.events";
pub const WEBHOOK_REFUSED: &str = "webhook.refused";
pub const NOTIFY_FAILED: &str = "notify.failed";
