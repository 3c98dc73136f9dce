//! Core WebSocket infrastructure.
//!
//! This module provides generic connection management that can be
//! specialized for different real-time services using traits and the
//! strategy pattern.
//!
//! # Architecture
//!
//! - [`ConnectionManager`]: owns the single socket of a session, dispatches
//!   inbound frames to subscribers, and drives bounded exponential-backoff
//!   reconnection
//! - [`FrameParser`]: trait for decoding incoming WebSocket frames
//!
//! # Example
//!
//! ```ignore
//! // Define your frame type
//! #[derive(Clone, Debug, Deserialize)]
//! enum MyFrame { /* ... */ }
//!
//! let connection = ConnectionManager::new(endpoint, config, MyParser)?;
//! connection.connect().await;
//! let mut rx = connection.subscribe();
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod traits;

pub use connection::ConnectionManager;
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use traits::*;
