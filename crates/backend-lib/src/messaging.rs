// ============================
// dropmate-backend-lib/src/messaging.rs
// ============================
//! Outbound messages to the owner over the LINE Messaging API.
//!
//! [`Messenger`] is the seam the processor talks to; [`LineClient`] is the
//! production implementation. Failures come back as [`MessagingError`] and
//! are logged by the caller, never retried.
use async_trait::async_trait;
use serde::Serialize;

pub const LINE_API_BASE: &str = "https://api.line.me";

/// Error type for push/reply failures.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// The HTTP request itself failed (network, DNS, TLS, ...).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The platform answered with a non-2xx status.
    #[error("LINE API returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
}

/// A LINE message object. Only text is sent by this service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Text {
        text: String,
        #[serde(rename = "quickReply", skip_serializing_if = "Option::is_none")]
        quick_reply: Option<QuickReply>,
    },
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        OutboundMessage::Text {
            text: text.into(),
            quick_reply: None,
        }
    }

    /// Attach URI quick-reply buttons.
    pub fn with_links<I, L, U>(self, links: I) -> Self
    where
        I: IntoIterator<Item = (L, U)>,
        L: Into<String>,
        U: Into<String>,
    {
        let OutboundMessage::Text { text, .. } = self;
        let items = links
            .into_iter()
            .map(|(label, uri)| QuickReplyItem {
                kind: "action",
                action: UriAction {
                    kind: "uri",
                    label: label.into(),
                    uri: uri.into(),
                },
            })
            .collect();
        OutboundMessage::Text {
            text,
            quick_reply: Some(QuickReply { items }),
        }
    }

    pub fn body(&self) -> &str {
        match self {
            OutboundMessage::Text { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickReply {
    pub items: Vec<QuickReplyItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickReplyItem {
    #[serde(rename = "type")]
    kind: &'static str,
    pub action: UriAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UriAction {
    #[serde(rename = "type")]
    kind: &'static str,
    pub label: String,
    pub uri: String,
}

/// Push/reply capability of the messaging platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send unsolicited messages to a user.
    async fn push(&self, to: &str, messages: Vec<OutboundMessage>) -> Result<(), MessagingError>;

    /// Answer an inbound event using its one-shot reply token.
    async fn reply(
        &self,
        reply_token: &str,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), MessagingError>;
}

#[derive(Serialize)]
struct PushBody<'a> {
    to: &'a str,
    messages: &'a [OutboundMessage],
}

#[derive(Serialize)]
struct ReplyBody<'a> {
    #[serde(rename = "replyToken")]
    reply_token: &'a str,
    messages: &'a [OutboundMessage],
}

/// LINE Messaging API client.
#[derive(Clone)]
pub struct LineClient {
    client: reqwest::Client,
    access_token: String,
    api_base: String,
}

impl LineClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base(access_token, LINE_API_BASE)
    }

    /// Point the client at another API host (staging, local mock).
    pub fn with_base(access_token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post<B>(&self, path: &str, body: &B) -> Result<(), MessagingError>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .client
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MessagingError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for LineClient {
    async fn push(&self, to: &str, messages: Vec<OutboundMessage>) -> Result<(), MessagingError> {
        self.post("/v2/bot/message/push", &PushBody { to, messages: &messages }).await
    }

    async fn reply(
        &self,
        reply_token: &str,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), MessagingError> {
        self.post(
            "/v2/bot/message/reply",
            &ReplyBody {
                reply_token,
                messages: &messages,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_has_no_quick_reply() {
        let value = serde_json::to_value(OutboundMessage::text("hello")).unwrap();
        assert_eq!(value, serde_json::json!({ "type": "text", "text": "hello" }));
    }

    #[test]
    fn quick_reply_links_follow_line_shape() {
        let msg = OutboundMessage::text("choose").with_links([
            ("approve", "https://example.test/decision?action=approve"),
            ("deny", "https://example.test/decision?action=deny"),
        ]);
        let value = serde_json::to_value(&msg).unwrap();

        let items = value["quickReply"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["type"], "action");
        assert_eq!(items[0]["action"]["type"], "uri");
        assert_eq!(items[0]["action"]["label"], "approve");
        assert_eq!(items[1]["action"]["uri"], "https://example.test/decision?action=deny");
        assert_eq!(msg.body(), "choose");
    }

    #[test]
    fn request_bodies_use_platform_field_names() {
        let messages = vec![OutboundMessage::text("x")];
        let push = serde_json::to_value(PushBody { to: "U1", messages: &messages }).unwrap();
        assert_eq!(push["to"], "U1");
        let reply = serde_json::to_value(ReplyBody {
            reply_token: "tok",
            messages: &messages,
        })
        .unwrap();
        assert_eq!(reply["replyToken"], "tok");
        assert_eq!(reply["messages"][0]["text"], "x");
    }

    #[test]
    fn api_base_trailing_slash_is_trimmed() {
        let client = LineClient::with_base("token", "http://localhost:9000/");
        assert_eq!(client.api_base, "http://localhost:9000");
    }
}
