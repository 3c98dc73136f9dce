//! Presence watching demo.
//!
//! Streams presence changes and read receipts for a session, and shows the
//! last-known presence cache.
//!
//! ```sh
//! RUST_LOG=info cargo run --example presence --features chat,tracing
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

    let presence = client.presence_events();
    let mut presence = Box::pin(presence);

    let mut seen = 0;
    while let Ok(Some(result)) = timeout(Duration::from_secs(30), presence.next()).await {
        match result {
            Ok(event) => {
                info!(user = %event.user_id, online = event.is_online, "presence change");
                info!(
                    cached = client.is_online(&event.user_id),
                    "last-known presence"
                );
                seen += 1;
                if seen >= 10 {
                    break;
                }
            }
            Err(e) => info!(error = %e, "presence stream error"),
        }
    }

    client.disconnect().await;

    Ok(())
}
