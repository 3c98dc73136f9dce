use bon::Builder;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Outbound command envelope, the mirror image of the inbound frame shape.
///
/// Commands are fire and forget: the client does not track acknowledgement,
/// and a command issued while the socket is closed is dropped (the
/// message-send path falls back to REST instead).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ChatCommand {
    /// Deliver a message to a peer
    Message(OutgoingMessage),
    /// Update the typing indicator shown to a peer
    Typing(TypingUpdate),
    /// Tell a peer their messages have been read
    Seen(SeenUpdate),
}

impl ChatCommand {
    /// Create a send-message command with a fresh client id.
    #[must_use]
    pub fn message(recipient_id: &str, body: &str) -> Self {
        Self::Message(
            OutgoingMessage::builder()
                .client_id(Uuid::new_v4())
                .recipient_id(recipient_id.to_owned())
                .body(body.to_owned())
                .build(),
        )
    }

    /// Create a set-typing command.
    #[must_use]
    pub fn typing(recipient_id: &str, is_typing: bool) -> Self {
        Self::Typing(TypingUpdate {
            recipient_id: recipient_id.to_owned(),
            is_typing,
        })
    }

    /// Create a mark-seen command.
    #[must_use]
    pub fn seen(recipient_id: &str) -> Self {
        Self::Seen(SeenUpdate {
            recipient_id: recipient_id.to_owned(),
        })
    }
}

/// Payload of a send-message command.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    /// Client-generated id so the sender can match the server echo
    pub client_id: Uuid,
    /// User id of the addressee
    pub recipient_id: String,
    /// Message text
    pub body: String,
}

/// Payload of a set-typing command.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct TypingUpdate {
    /// User id the indicator is addressed to
    pub recipient_id: String,
    /// Whether this session's user is currently typing
    pub is_typing: bool,
}

/// Payload of a mark-seen command.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct SeenUpdate {
    /// User id whose messages were read
    pub recipient_id: String,
}

/// Query parameters for `GET /messages`.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    /// User id of the requesting session
    pub user_id: String,
    /// Peer whose conversation to fetch
    pub peer_id: String,
    /// Maximum number of messages to return
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Only return messages sent before this time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<DateTime<Utc>>,
}

/// Body of `POST /messages`, the fallback send path when the socket is
/// closed.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// User id of the author
    pub sender_id: String,
    /// User id of the addressee
    pub recipient_id: String,
    /// Message text
    pub body: String,
    /// Client-generated id so the server can deduplicate retries
    pub client_id: Uuid,
}
