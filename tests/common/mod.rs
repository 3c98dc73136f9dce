#![cfg(feature = "chat")]
#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]
#![allow(
    unused,
    reason = "Deeply nested uses in sub-modules are falsely flagged as being unused"
)]

use std::time::Duration;

use peerchat_client_sdk::ws::config::Config;
use serde_json::{Value, json};

pub const USER_ID: &str = "u1";
pub const PEER_ID: &str = "u2";

/// REST base for tests that never touch REST; the port is closed.
pub const UNUSED_API_ENDPOINT: &str = "http://127.0.0.1:9";

/// Test config with short backoff delays so reconnection tests stay fast.
#[must_use]
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.reconnect.max_attempts = Some(5);
    config.reconnect.initial_backoff = Duration::from_millis(50);
    config.reconnect.max_backoff = Duration::from_millis(200);
    config
}

/// Example payloads matching the chat wire protocol:
/// `{ "type": <tag>, "data": { ... } }` with camelCase fields.
#[must_use]
pub fn message_frame(sender: &str, recipient: &str, body: &str) -> Value {
    json!({
        "type": "message",
        "data": {
            "id": "m-1",
            "senderId": sender,
            "recipientId": recipient,
            "body": body,
            "sentAt": 1_753_314_064_213_i64
        }
    })
}

#[must_use]
pub fn typing_frame(sender: &str, recipient: &str, is_typing: bool) -> Value {
    json!({
        "type": "typing",
        "data": { "senderId": sender, "recipientId": recipient, "isTyping": is_typing }
    })
}

#[must_use]
pub fn seen_frame(sender: &str, recipient: &str) -> Value {
    json!({
        "type": "seen",
        "data": { "senderId": sender, "recipientId": recipient, "seenAt": 1_753_314_070_000_i64 }
    })
}

#[must_use]
pub fn online_frame(user: &str, is_online: bool) -> Value {
    json!({
        "type": "online",
        "data": { "userId": user, "isOnline": is_online }
    })
}

#[must_use]
pub fn error_frame(message: &str) -> Value {
    json!({
        "type": "error",
        "data": { "message": message, "code": "rejected" }
    })
}
