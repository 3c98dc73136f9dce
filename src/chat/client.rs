use std::env;
use std::sync::Arc;

use async_stream::try_stream;
use dashmap::DashMap;
use futures::Stream;
use reqwest::{
    Client as ReqwestClient, Method,
    header::{HeaderMap, HeaderValue},
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use url::Url;
use uuid::Uuid;

use super::types::request::{ChatCommand, HistoryRequest, OutgoingMessage, SendMessageRequest};
use super::types::response::{
    ChatFrame, ChatMessage, PresenceEvent, SeenReceipt, ServerError, TypingEvent, parse_frames,
};
use crate::ws::ConnectionManager;
use crate::ws::config::Config;
use crate::ws::connection::ConnectionState;
use crate::ws::error::WsError;
use crate::{Result, ToQueryParams as _};

/// Parser for the chat frame envelope.
#[non_exhaustive]
#[derive(Clone)]
pub struct EnvelopeParser;

impl crate::ws::traits::FrameParser<ChatFrame> for EnvelopeParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<ChatFrame>> {
        parse_frames(bytes)
    }
}

/// Real-time chat client bound to one session identity.
///
/// Each instance owns one logical WebSocket session: it connects as soon as
/// it is created with a non-empty user id, reconnects with bounded
/// exponential backoff when the connection drops, and is disposed by
/// [`disconnect`](Self::disconnect) (or by dropping every clone). An
/// instance is never reused across identities; a different user id needs a
/// fresh client.
///
/// Must be created within a Tokio runtime.
///
/// # Examples
///
/// ```rust, no_run
/// use peerchat_client_sdk::chat::Client;
/// use peerchat_client_sdk::ws::config::Config;
/// use futures::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = Client::new("u1", Config::default())?;
///
///     let stream = client.messages();
///     let mut stream = Box::pin(stream);
///
///     while let Some(message) = stream.next().await {
///         println!("Received: {:?}", message?);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    /// Session identity this client is bound to
    user_id: String,
    /// Connection manager for the WebSocket session
    connection: ConnectionManager<ChatFrame, EnvelopeParser>,
    /// HTTP client for the REST endpoints
    http: ReqwestClient,
    /// REST API base URL
    api_host: Url,
    /// Last-known presence per user id
    presence: Arc<DashMap<String, bool>>,
}

impl Client {
    /// Create a client for `user_id` using the configured endpoints.
    ///
    /// The WebSocket base comes from [`WS_URL_VAR`](crate::WS_URL_VAR)
    /// (default [`DEFAULT_WS_ENDPOINT`](crate::DEFAULT_WS_ENDPOINT)), the
    /// REST base from [`API_URL_VAR`](crate::API_URL_VAR) (default
    /// [`DEFAULT_API_ENDPOINT`](crate::DEFAULT_API_ENDPOINT)).
    pub fn new(user_id: &str, config: Config) -> Result<Self> {
        let ws_base =
            env::var(crate::WS_URL_VAR).unwrap_or_else(|_| crate::DEFAULT_WS_ENDPOINT.to_owned());
        let api_base =
            env::var(crate::API_URL_VAR).unwrap_or_else(|_| crate::DEFAULT_API_ENDPOINT.to_owned());
        Self::with_endpoints(user_id, &ws_base, &api_base, config)
    }

    /// Create a client for `user_id` against explicit endpoints.
    ///
    /// Connects immediately when `user_id` is non-empty; with an empty id
    /// the client stays offline and [`connect`](Self::connect) is a no-op.
    pub fn with_endpoints(
        user_id: &str,
        ws_base: &str,
        api_base: &str,
        config: Config,
    ) -> Result<Self> {
        let endpoint = crate::session_endpoint(ws_base, user_id)?;
        let connection = ConnectionManager::new(endpoint, config, EnvelopeParser)?;

        let mut headers = HeaderMap::new();
        headers.insert("User-Agent", HeaderValue::from_static("rs_chat_client"));
        headers.insert("Accept", HeaderValue::from_static("*/*"));
        headers.insert("Connection", HeaderValue::from_static("keep-alive"));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let http = ReqwestClient::builder().default_headers(headers).build()?;

        let presence = Arc::new(DashMap::new());
        Self::start_presence_tracker(Arc::clone(&presence), connection.subscribe());

        let client = Self {
            inner: Arc::new(ClientInner {
                user_id: user_id.to_owned(),
                connection,
                http,
                api_host: Url::parse(api_base)?,
                presence,
            }),
        };

        // A session dials as soon as it has an identity
        if client.inner.user_id.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::warn!("created without a user id; the connection stays offline");
        } else {
            let connection = client.inner.connection.clone();
            tokio::spawn(async move { connection.connect().await });
        }

        Ok(client)
    }

    /// Open the session.
    ///
    /// Idempotent while an attempt is in flight or the connection is open.
    /// With an empty user id this logs and does nothing; it never fails.
    pub async fn connect(&self) {
        if self.inner.user_id.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::warn!("connect ignored: empty user id");
            return;
        }
        self.inner.connection.connect().await;
    }

    /// Tear the session down.
    ///
    /// Safe in any state: cancels a pending reconnect, closes the socket,
    /// and leaves subscribers registered for a later [`connect`](Self::connect).
    pub async fn disconnect(&self) {
        self.inner.connection.disconnect().await;
    }

    /// The session identity this client was created with.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    /// Check whether the connection is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_open()
    }

    /// Get the current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    /// Subscribe to connection state changes.
    ///
    /// This is how consumers observe connects, disconnects, and terminal
    /// reconnection failure (e.g. to render a "disconnected" banner).
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.state_receiver()
    }

    /// Send a message to `recipient_id`.
    ///
    /// Prefers the open WebSocket session. When the socket is not open the
    /// message goes out over `POST /messages` instead, so a dropped
    /// connection does not lose the send.
    pub async fn send_message(&self, recipient_id: &str, body: &str) -> Result<()> {
        let outgoing = OutgoingMessage::builder()
            .client_id(Uuid::new_v4())
            .recipient_id(recipient_id.to_owned())
            .body(body.to_owned())
            .build();

        let Err(e) = self
            .inner
            .connection
            .send(&ChatCommand::Message(outgoing.clone()))
        else {
            return Ok(());
        };
        if !matches!(e.downcast_ref::<WsError>(), Some(WsError::NotConnected)) {
            return Err(e);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(recipient = %recipient_id, "socket not open, sending over REST");

        let request = SendMessageRequest::builder()
            .sender_id(self.inner.user_id.clone())
            .recipient_id(outgoing.recipient_id)
            .body(outgoing.body)
            .client_id(outgoing.client_id)
            .build();
        let _persisted: ChatMessage = self.post("messages", &request).await?;
        Ok(())
    }

    /// Update the typing indicator shown to `recipient_id`.
    ///
    /// Fire and forget; while the socket is closed the update is dropped
    /// with a warning and [`WsError::NotConnected`] is returned.
    pub fn set_typing(&self, recipient_id: &str, is_typing: bool) -> Result<()> {
        self.inner
            .connection
            .send(&ChatCommand::typing(recipient_id, is_typing))
    }

    /// Tell `recipient_id` their messages have been read.
    ///
    /// Fire and forget, like [`set_typing`](Self::set_typing).
    pub fn mark_seen(&self, recipient_id: &str) -> Result<()> {
        self.inner.connection.send(&ChatCommand::seen(recipient_id))
    }

    /// Subscribe to the raw frame feed.
    ///
    /// Each call returns a new independent receiver; frames are delivered
    /// unfiltered, in transport order.
    #[must_use]
    pub fn frames(&self) -> broadcast::Receiver<ChatFrame> {
        self.inner.connection.subscribe()
    }

    /// Stream of incoming chat messages.
    pub fn messages(&self) -> impl Stream<Item = Result<ChatMessage>> {
        self.filtered(ChatFrame::into_message)
    }

    /// Stream of typing indicator updates.
    pub fn typing_events(&self) -> impl Stream<Item = Result<TypingEvent>> {
        self.filtered(ChatFrame::into_typing)
    }

    /// Stream of read receipts.
    pub fn seen_receipts(&self) -> impl Stream<Item = Result<SeenReceipt>> {
        self.filtered(ChatFrame::into_seen)
    }

    /// Stream of presence changes.
    pub fn presence_events(&self) -> impl Stream<Item = Result<PresenceEvent>> {
        self.filtered(ChatFrame::into_presence)
    }

    /// Stream of server-pushed errors (e.g. rejected commands).
    pub fn server_errors(&self) -> impl Stream<Item = Result<ServerError>> {
        self.filtered(ChatFrame::into_server_error)
    }

    /// Last-known presence for `user_id`.
    ///
    /// Users never seen on this session count as offline.
    #[must_use]
    pub fn is_online(&self, user_id: &str) -> bool {
        self.inner.presence.get(user_id).is_some_and(|entry| *entry)
    }

    /// Fetch recent message history with `peer_id` over REST.
    pub async fn history(&self, peer_id: &str, limit: Option<u32>) -> Result<Vec<ChatMessage>> {
        let request = HistoryRequest::builder()
            .user_id(self.inner.user_id.clone())
            .peer_id(peer_id.to_owned())
            .maybe_limit(limit)
            .build();
        self.get("messages", &request).await
    }

    /// Create one filtered stream with its own receiver.
    fn filtered<T>(&self, select: fn(ChatFrame) -> Option<T>) -> impl Stream<Item = Result<T>> {
        let mut rx = self.inner.connection.subscribe();

        try_stream! {
            loop {
                match rx.recv().await {
                    Ok(frame) => {
                        if let Some(item) = select(frame) {
                            yield item;
                        }
                    }
                    Err(RecvError::Lagged(count)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("chat subscription lagged, missed {count} frames");
                        Err(WsError::Lagged { count })?;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    /// Keep the presence map current from `online` frames.
    fn start_presence_tracker(
        presence: Arc<DashMap<String, bool>>,
        mut rx: broadcast::Receiver<ChatFrame>,
    ) {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ChatFrame::Online(event)) => {
                        presence.insert(event.user_id, event.is_online);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => {
                        // Last-write-wins; the next update overwrites anything missed
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    async fn get<Req: Serialize, Res: DeserializeOwned>(
        &self,
        path: &str,
        req: &Req,
    ) -> Result<Res> {
        let query = req.query_params(None);
        let request = self
            .inner
            .http
            .request(Method::GET, format!("{}{path}{query}", self.inner.api_host))
            .build()?;
        crate::request(&self.inner.http, request, None).await
    }

    async fn post<Req: Serialize, Res: DeserializeOwned>(
        &self,
        path: &str,
        req: &Req,
    ) -> Result<Res> {
        let request = self
            .inner
            .http
            .request(Method::POST, format!("{}{path}", self.inner.api_host))
            .json(req)
            .build()?;
        crate::request(&self.inner.http, request, None).await
    }
}
