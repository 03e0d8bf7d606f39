// ================
// common/src/lib.rs
// ================
//! Common types shared between the DROPMATE backend and its browser pages.
//! This module defines the locker/request records and the events pushed
//! over the live status streams.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Locker used when a link or command does not name one.
pub const DEFAULT_LOCKER_ID: &str = "LOCKER001";

/// Current state of a physical locker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Locker {
    /// Owner-chosen locker identifier
    pub locker_id: String,
    /// QR acceptance gate: scans are rejected while set
    pub disabled: bool,
    /// Physical door state
    #[serde(rename = "doorOpen")]
    pub door_open: bool,
}

impl Locker {
    /// A locker as it looks on first reference.
    pub fn new(locker_id: impl Into<String>) -> Self {
        Self {
            locker_id: locker_id.into(),
            disabled: false,
            door_open: false,
        }
    }
}

/// Lifecycle of an access request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
    Closed,
}

impl RequestStatus {
    /// `true` once the owner (or an unlock) has settled the request.
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Denied => "denied",
            RequestStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A visitor's ask to open a specific locker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    /// Short random identifier
    pub request_id: String,
    /// Locker the request refers to
    pub locker_id: String,
    /// Where the request is in its lifecycle
    pub status: RequestStatus,
    /// Creation time, Unix epoch milliseconds
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

/// Events pushed to live status streams.
///
/// Serialized as `{"type": "...", "payload": {...}}` so browser scripts can
/// read `data.payload` regardless of the stream they opened.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A request's status changed (or the snapshot at stream open)
    RequestUpdate(AccessRequest),
    /// A locker's QR or door flag changed (or the snapshot at stream open)
    LockerUpdate(Locker),
}

impl StreamEvent {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_locker_is_enabled_and_closed() {
        let locker = Locker::new("L1");
        assert!(!locker.disabled);
        assert!(!locker.door_open);
    }

    #[test]
    fn locker_update_wire_shape() {
        let event = StreamEvent::LockerUpdate(Locker {
            locker_id: "L1".to_string(),
            disabled: true,
            door_open: false,
        });
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "locker_update");
        assert_eq!(value["payload"]["locker_id"], "L1");
        assert_eq!(value["payload"]["disabled"], true);
        assert_eq!(value["payload"]["doorOpen"], false);
    }

    #[test]
    fn request_update_wire_shape() {
        let event = StreamEvent::RequestUpdate(AccessRequest {
            request_id: "abc".to_string(),
            locker_id: "L1".to_string(),
            status: RequestStatus::Pending,
            created_at: 1_700_000_000_000,
        });
        let json = event.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "request_update");
        assert_eq!(value["payload"]["status"], "pending");
        assert_eq!(value["payload"]["createdAt"], 1_700_000_000_000_i64);

        let back: StreamEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn only_pending_is_open() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Denied.is_terminal());
        assert!(RequestStatus::Closed.is_terminal());
        assert_eq!(RequestStatus::Denied.to_string(), "denied");
    }
}
