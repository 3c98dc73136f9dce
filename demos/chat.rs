//! Minimal chat session walkthrough.
//!
//! Connects as one user, sends a message and a typing indicator, then
//! prints everything that arrives for a while.
//!
//! Run with tracing enabled:
//! ```sh
//! RUST_LOG=info cargo run --example chat --features chat,tracing
//! ```

use std::time::Duration;

use futures::StreamExt as _;
use peerchat_client_sdk::chat::Client;
use peerchat_client_sdk::ws::config::Config;
use tokio::time::timeout;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let client = Client::new("demo-user", Config::default())?;

    info!(state = ?client.connection_state(), "starting session");

    // Typed streams; one receiver per concern
    let messages = client.messages();
    let mut messages = Box::pin(messages);
    let typing = client.typing_events();
    let mut typing = Box::pin(typing);

    // Fire-and-forget commands; send_message falls back to REST while the
    // socket is still connecting
    client.send_message("demo-peer", "hello from the demo").await?;
    if let Err(e) = client.set_typing("demo-peer", true) {
        info!(error = %e, "typing indicator dropped");
    }

    let mut received = 0;
    loop {
        tokio::select! {
            result = timeout(Duration::from_secs(10), messages.next()) => {
                match result {
                    Ok(Some(Ok(message))) => {
                        info!(from = %message.sender_id, body = %message.body, "message");
                        received += 1;
                    }
                    Ok(Some(Err(e))) => info!(error = %e, "message stream error"),
                    _ => break,
                }
            }
            result = timeout(Duration::from_secs(10), typing.next()) => {
                match result {
                    Ok(Some(Ok(event))) => {
                        info!(from = %event.sender_id, typing = event.is_typing, "typing");
                    }
                    Ok(Some(Err(e))) => info!(error = %e, "typing stream error"),
                    _ => break,
                }
            }
        }

        if received >= 5 {
            break;
        }
    }

    client.disconnect().await;
    info!("session closed");

    Ok(())
}
