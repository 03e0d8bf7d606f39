// ============================
// dropmate-backend-lib/src/webhook.rs
// ============================
//! Inbound LINE webhook events.
//!
//! Each event in a batch is decoded and handled on its own; an event that
//! fails to decode is logged and skipped. Only text messages and postbacks
//! are acted on, and only when they come from the owner.
use metrics::counter;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::commands::OwnerCommand;
use crate::metrics::{WEBHOOK_EVENTS, WEBHOOK_REFUSED};
use crate::processor::{Ack, Processor};

pub const REFUSAL_TEXT: &str = "บัญชีนี้ไม่ได้รับอนุญาตให้ควบคุมตู้";
pub const INVALID_COMMAND_TEXT: &str = "คำสั่งไม่ถูกต้อง";

/// Webhook request body. Events stay raw so one bad event can't sink the rest.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookBatch {
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WebhookEvent {
    Message {
        #[serde(rename = "replyToken")]
        reply_token: Option<String>,
        #[serde(default)]
        source: EventSource,
        message: MessageContent,
    },
    Postback {
        #[serde(rename = "replyToken")]
        reply_token: Option<String>,
        #[serde(default)]
        source: EventSource,
        postback: PostbackContent,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventSource {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostbackContent {
    #[serde(default)]
    pub data: String,
}

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ignored,
    Refused,
    Help,
    InvalidCommand,
    Executed(OwnerCommand),
}

/// Decode and handle every event in a raw webhook body.
pub async fn handle_body(
    processor: &Processor,
    default_locker_id: &str,
    body: &[u8],
) -> Vec<Outcome> {
    let batch: WebhookBatch = match serde_json::from_slice(body) {
        Ok(batch) => batch,
        Err(e) => {
            warn!(error = %e, "unreadable webhook body");
            return Vec::new();
        }
    };

    let mut outcomes = Vec::with_capacity(batch.events.len());
    for raw in batch.events {
        match serde_json::from_value::<WebhookEvent>(raw) {
            Ok(event) => outcomes.push(handle_event(processor, default_locker_id, event).await),
            Err(e) => warn!(error = %e, "skipping malformed webhook event"),
        }
    }
    outcomes
}

pub async fn handle_event(
    processor: &Processor,
    default_locker_id: &str,
    event: WebhookEvent,
) -> Outcome {
    counter!(WEBHOOK_EVENTS).increment(1);
    match event {
        WebhookEvent::Message {
            reply_token,
            source,
            message: MessageContent::Text { text },
        } => {
            let ack = Ack::reply_to(reply_token.as_deref());
            if !processor.is_owner(source.user_id.as_deref()) {
                return refuse(processor, ack, source.user_id.as_deref()).await;
            }
            match OwnerCommand::parse_text(&text, default_locker_id) {
                Some(command) => run(processor, command, ack).await,
                None => {
                    processor.send_help(ack, default_locker_id).await;
                    Outcome::Help
                }
            }
        }
        WebhookEvent::Postback {
            reply_token,
            source,
            postback,
        } => {
            let ack = Ack::reply_to(reply_token.as_deref());
            if !processor.is_owner(source.user_id.as_deref()) {
                return refuse(processor, ack, source.user_id.as_deref()).await;
            }
            match OwnerCommand::parse_postback(&postback.data, default_locker_id) {
                Some(command) => run(processor, command, ack).await,
                None => {
                    debug!(data = %postback.data, "unknown postback action");
                    processor.acknowledge(ack, INVALID_COMMAND_TEXT.to_string()).await;
                    Outcome::InvalidCommand
                }
            }
        }
        WebhookEvent::Message { .. } | WebhookEvent::Other => Outcome::Ignored,
    }
}

async fn refuse(processor: &Processor, ack: Ack<'_>, user_id: Option<&str>) -> Outcome {
    counter!(WEBHOOK_REFUSED).increment(1);
    info!(user_id = user_id.unwrap_or("-"), "command from non-owner refused");
    processor.acknowledge(ack, REFUSAL_TEXT.to_string()).await;
    Outcome::Refused
}

async fn run(processor: &Processor, command: OwnerCommand, ack: Ack<'_>) -> Outcome {
    match &command {
        OwnerCommand::Status(id) => {
            processor.report_status(id, ack).await;
        }
        OwnerCommand::Disable(id) => {
            processor.set_locker_disabled(id, true, ack).await;
        }
        OwnerCommand::Enable(id) => {
            processor.set_locker_disabled(id, false, ack).await;
        }
        OwnerCommand::Unlock(id) => {
            processor.unlock(id, ack).await;
        }
    }
    Outcome::Executed(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::tests::{processor, RecordingMessenger, Sent, OWNER};
    use dropmate_common::RequestStatus;
    use serde_json::json;
    use std::sync::Arc;

    const DEFAULT: &str = "LOCKER001";

    fn text_event(user: &str, text: &str) -> serde_json::Value {
        json!({
            "type": "message",
            "replyToken": "r1",
            "source": { "type": "user", "userId": user },
            "message": { "type": "text", "id": "1", "text": text }
        })
    }

    fn body(events: Vec<serde_json::Value>) -> Vec<u8> {
        serde_json::to_vec(&json!({ "destination": "Ubot", "events": events })).unwrap()
    }

    #[tokio::test]
    async fn owner_unlock_by_text() {
        let messenger = Arc::new(RecordingMessenger::default());
        let p = processor(messenger.clone());

        let outcomes = handle_body(&p, DEFAULT, &body(vec![text_event(OWNER, "ปลดล็อก L2")])).await;
        assert_eq!(outcomes, vec![Outcome::Executed(OwnerCommand::Unlock("L2".into()))]);

        assert!(p.store().locker("L2").door_open);
        let requests = p.store().requests_for("L2");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].status, RequestStatus::Approved);
        assert!(matches!(&messenger.sent()[0], Sent::Reply(tok, _) if tok == "r1"));
    }

    #[tokio::test]
    async fn stranger_is_refused_and_nothing_changes() {
        let messenger = Arc::new(RecordingMessenger::default());
        let p = processor(messenger.clone());

        let batch = body(vec![text_event("Ustranger", "ปลดล็อก L2")]);
        let outcomes = handle_body(&p, DEFAULT, &batch).await;
        assert_eq!(outcomes, vec![Outcome::Refused]);

        assert!(!p.store().locker("L2").door_open);
        assert!(p.store().requests_for("L2").is_empty());
        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text(), REFUSAL_TEXT);
    }

    #[tokio::test]
    async fn unknown_text_gets_help() {
        let messenger = Arc::new(RecordingMessenger::default());
        let p = processor(messenger.clone());

        let outcomes = handle_body(&p, DEFAULT, &body(vec![text_event(OWNER, "hello")])).await;
        assert_eq!(outcomes, vec![Outcome::Help]);
        assert!(messenger.sent()[0].text().contains("ปลดล็อก"));
    }

    #[tokio::test]
    async fn postbacks_drive_the_same_commands() {
        let messenger = Arc::new(RecordingMessenger::default());
        let p = processor(messenger.clone());
        let events = vec![
            json!({
                "type": "postback",
                "replyToken": "r2",
                "source": { "userId": OWNER },
                "postback": { "data": "action=disable&locker_id=L5" }
            }),
            json!({
                "type": "postback",
                "source": { "userId": OWNER },
                "postback": { "data": "action=fly" }
            }),
        ];

        let outcomes = handle_body(&p, DEFAULT, &body(events)).await;
        assert_eq!(
            outcomes,
            vec![
                Outcome::Executed(OwnerCommand::Disable("L5".into())),
                Outcome::InvalidCommand
            ]
        );
        assert!(p.store().locker("L5").disabled);
        // second postback had no reply token
        assert_eq!(messenger.sent().len(), 1);
    }

    #[tokio::test]
    async fn odd_events_are_skipped() {
        let messenger = Arc::new(RecordingMessenger::default());
        let p = processor(messenger.clone());
        let events = vec![
            json!({ "type": "follow", "replyToken": "r", "source": { "userId": OWNER } }),
            json!({
                "type": "message",
                "replyToken": "r",
                "source": { "userId": OWNER },
                "message": { "type": "sticker", "packageId": "1" }
            }),
            json!({ "type": "message", "message": 42 }),
            json!("not an object"),
        ];

        let outcomes = handle_body(&p, DEFAULT, &body(events)).await;
        assert_eq!(outcomes, vec![Outcome::Ignored, Outcome::Ignored]);
        assert!(messenger.sent().is_empty());

        assert!(handle_body(&p, DEFAULT, b"{not json").await.is_empty());
        assert!(handle_body(&p, DEFAULT, b"{}").await.is_empty());
    }
}
