#![expect(
    clippy::module_name_repetitions,
    reason = "Re-exported names intentionally match their modules for API clarity"
)]

//! Real-time chat client for the PeerChat platform.
//!
//! **Feature flag:** `chat` (required to use this module)
//!
//! One [`Client`] owns one logical WebSocket session for one user identity:
//! peer-to-peer messages, typing indicators, read receipts, and presence
//! arrive as typed frames; sends go out over the socket with a REST
//! fallback for messages. Connection loss is handled transparently with
//! bounded exponential-backoff reconnection.
//!
//! # Example
//!
//! ```rust, no_run
//! use peerchat_client_sdk::chat::Client;
//! use peerchat_client_sdk::ws::config::Config;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Client::new("u1", Config::default())?;
//!
//!     client.send_message("u2", "did you get the notes?").await?;
//!
//!     let stream = client.messages();
//!     let mut stream = Box::pin(stream);
//!     while let Some(message) = stream.next().await {
//!         println!("{:?}", message?);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod types;

// Re-export commonly used types
pub use client::{Client, EnvelopeParser};
pub use types::request::{
    ChatCommand, HistoryRequest, OutgoingMessage, SeenUpdate, SendMessageRequest, TypingUpdate,
};
pub use types::response::{
    ChatFrame, ChatMessage, PresenceEvent, SeenReceipt, ServerError, TypingEvent,
};
