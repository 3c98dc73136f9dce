use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{TimestampMilliSeconds, serde_as};

use crate::ws::error::WsError;

/// One parsed unit of inbound real-time data, tagged by kind.
///
/// Every frame on the wire is a JSON object of the shape
/// `{ "type": <tag>, "data": { ... } }`; anything that does not decode into
/// one of the known tags is dropped by the connection manager.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ChatFrame {
    /// A chat message addressed to this session
    Message(ChatMessage),
    /// A peer started or stopped typing
    Typing(TypingEvent),
    /// A peer read this session's messages
    Seen(SeenReceipt),
    /// A peer came online or went offline
    Online(PresenceEvent),
    /// The server rejected a command or reports a session problem
    Error(ServerError),
}

impl ChatFrame {
    /// Extract the message payload, if this is a `message` frame.
    #[must_use]
    pub fn into_message(self) -> Option<ChatMessage> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Extract the typing payload, if this is a `typing` frame.
    #[must_use]
    pub fn into_typing(self) -> Option<TypingEvent> {
        match self {
            Self::Typing(event) => Some(event),
            _ => None,
        }
    }

    /// Extract the receipt payload, if this is a `seen` frame.
    #[must_use]
    pub fn into_seen(self) -> Option<SeenReceipt> {
        match self {
            Self::Seen(receipt) => Some(receipt),
            _ => None,
        }
    }

    /// Extract the presence payload, if this is an `online` frame.
    #[must_use]
    pub fn into_presence(self) -> Option<PresenceEvent> {
        match self {
            Self::Online(event) => Some(event),
            _ => None,
        }
    }

    /// Extract the error payload, if this is an `error` frame.
    #[must_use]
    pub fn into_server_error(self) -> Option<ServerError> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }
}

/// A chat message, as delivered over the socket or returned by the REST
/// history endpoint.
#[serde_as]
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Server-assigned message id. Absent on frames echoed back before the
    /// message was persisted.
    #[serde(default)]
    pub id: Option<String>,
    /// User id of the author
    pub sender_id: String,
    /// User id of the addressee
    pub recipient_id: String,
    /// Message text
    pub body: String,
    /// Send time in Unix milliseconds
    #[serde_as(as = "Option<TimestampMilliSeconds<i64>>")]
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
}

/// Typing indicator update from a peer.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    /// User id of the peer that is (or stopped) typing
    pub sender_id: String,
    /// User id the indicator is addressed to
    pub recipient_id: String,
    /// Whether the peer is currently typing
    pub is_typing: bool,
}

/// Read receipt: a peer has seen this session's messages.
#[serde_as]
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct SeenReceipt {
    /// User id of the reader
    pub sender_id: String,
    /// User id whose messages were read
    pub recipient_id: String,
    /// Read time in Unix milliseconds
    #[serde_as(as = "Option<TimestampMilliSeconds<i64>>")]
    #[serde(default)]
    pub seen_at: Option<DateTime<Utc>>,
}

/// Presence change for one user.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEvent {
    /// User id whose presence changed
    pub user_id: String,
    /// Whether the user is now online
    pub is_online: bool,
}

/// Error description pushed by the server.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct ServerError {
    /// Human-readable description
    pub message: String,
    /// Machine-readable error code, when the server provides one
    #[serde(default)]
    pub code: Option<String>,
}

/// Deserialize frames from the byte slice.
///
/// Returns an empty vector for empty or whitespace-only input (server
/// keepalives). Anything else must be a single frame envelope; a decode
/// failure is returned as an error and the caller drops the input.
pub fn parse_frames(bytes: &[u8]) -> crate::Result<Vec<ChatFrame>> {
    let trimmed = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map_or(&[][..], |start| &bytes[start..]);

    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let frame: ChatFrame = serde_json::from_slice(trimmed).map_err(WsError::FrameParse)?;
    Ok(vec![frame])
}
