#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use backoff::backoff::Backoff as _;
use futures::{SinkExt as _, StreamExt as _};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::config::Config;
use super::error::WsError;
use super::traits::FrameParser;
use crate::Result;
use crate::error::Error;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Outbound channel slot; populated only while a socket is open.
type OutboundWriter = Arc<RwLock<Option<mpsc::UnboundedSender<String>>>>;

/// Broadcast channel capacity for incoming frames.
const BROADCAST_CAPACITY: usize = 1024;

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket and no pending work
    Idle,
    /// Socket created, handshake not yet confirmed
    Connecting,
    /// Handshake confirmed, frames may flow both ways
    Open {
        /// When the connection was established
        since: Instant,
    },
    /// A backoff delay is pending before the next connection attempt
    Reconnecting {
        /// Current reconnection attempt number
        attempt: u32,
    },
    /// Reconnection attempts exhausted; terminal until `connect` is called
    /// again
    Failed {
        /// Number of attempts made before giving up
        attempts: u32,
    },
}

impl ConnectionState {
    /// Check if the connection is currently open.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

/// Handle to a running connection task.
struct LoopHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Manages the WebSocket connection lifecycle of one session.
///
/// This generic connection manager handles all connection concerns:
/// - Establishing and tearing down the single socket of a session
/// - Automatic reconnection with bounded exponential backoff
/// - Decoding inbound frames and broadcasting them to subscribers
/// - Best-effort delivery of outbound commands while the socket is open
///
/// The manager owns the socket exclusively: every transition runs through
/// the connection task, so racing `connect` calls can never create a second
/// socket.
///
/// # Type Parameters
///
/// - `F`: Frame type delivered to subscribers
/// - `P`: Parser type that implements [`FrameParser<F>`]
///
/// # Example
///
/// ```ignore
/// let connection = ConnectionManager::new(endpoint, config, EnvelopeParser)?;
/// connection.connect().await;
///
/// let mut rx = connection.subscribe();
/// while let Ok(frame) = rx.recv().await {
///     println!("Received: {frame:?}");
/// }
/// ```
#[derive(Clone)]
pub struct ConnectionManager<F, P>
where
    F: Clone + Send + 'static,
    P: FrameParser<F>,
{
    /// Endpoint the connection task dials
    endpoint: String,
    /// Reconnection configuration
    config: Config,
    /// Decoder for inbound frames
    parser: P,
    /// Watch channel sender for state changes
    state_tx: watch::Sender<ConnectionState>,
    /// Watch channel receiver for state changes (for use in checking the current state)
    state_rx: watch::Receiver<ConnectionState>,
    /// Broadcast sender for incoming frames
    broadcast_tx: broadcast::Sender<F>,
    /// Sender half of the open socket's outbound channel, `None` while closed
    writer: OutboundWriter,
    /// The running connection task, if any; the single control path for all
    /// socket transitions
    task: Arc<Mutex<Option<LoopHandle>>>,
}

impl<F, P> ConnectionManager<F, P>
where
    F: Clone + Send + 'static,
    P: FrameParser<F>,
{
    /// Create a new connection manager in the [`ConnectionState::Idle`]
    /// state. No socket is created until [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns an error when `endpoint` is not a valid URL.
    pub fn new(endpoint: String, config: Config, parser: P) -> Result<Self> {
        Url::parse(&endpoint)?;

        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);

        Ok(Self {
            endpoint,
            config,
            parser,
            state_tx,
            state_rx,
            broadcast_tx,
            writer: Arc::default(),
            task: Arc::default(),
        })
    }

    /// Start the connection task.
    ///
    /// Idempotent: while a connection attempt is in flight or a connection
    /// is open, further calls are no-ops. After
    /// [`ConnectionState::Failed`] or [`disconnect`](Self::disconnect), a
    /// call starts a fresh reconnection cycle.
    pub async fn connect(&self) {
        let mut task = self.task.lock().await;

        if let Some(running) = task.as_ref()
            && !running.handle.is_finished()
        {
            #[cfg(feature = "tracing")]
            tracing::debug!("connect ignored: a connection attempt is already in flight");
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Self::connection_loop(
            self.endpoint.clone(),
            self.config.clone(),
            self.parser.clone(),
            self.state_tx.clone(),
            self.broadcast_tx.clone(),
            Arc::clone(&self.writer),
            cancel.clone(),
        ));

        *task = Some(LoopHandle { cancel, handle });
    }

    /// Tear the connection down.
    ///
    /// Safe to call in any state. Cancels a pending reconnect delay,
    /// detaches the outbound writer before the socket close completes, and
    /// waits for the connection task to finish, so a slow close can never
    /// leave two sockets alive. Subscribers stay registered.
    pub async fn disconnect(&self) {
        let mut task = self.task.lock().await;

        if let Some(LoopHandle { cancel, handle }) = task.take() {
            cancel.cancel();
            _ = handle.await;
        }

        self.writer
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        _ = self.state_tx.send(ConnectionState::Idle);
    }

    /// Send a command to the server.
    ///
    /// Best effort: the command is written only while the connection is
    /// open. In any other state it is dropped with a warning and
    /// [`WsError::NotConnected`] is returned; nothing is queued and nothing
    /// panics.
    pub fn send<R: Serialize>(&self, command: &R) -> Result<()> {
        let json = serde_json::to_string(command)?;

        let writer = self.writer.read().unwrap_or_else(PoisonError::into_inner);
        let delivered = writer.as_ref().is_some_and(|tx| tx.send(json).is_ok());
        if delivered {
            Ok(())
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!("dropping outbound command: connection is not open");
            Err(WsError::NotConnected.into())
        }
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Check whether the connection is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Subscribe to incoming frames.
    ///
    /// Each call returns a new independent receiver. Frames are delivered
    /// to every live receiver in transport order; dropping a receiver
    /// unsubscribes it without affecting the others.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<F> {
        self.broadcast_tx.subscribe()
    }

    /// Subscribe to connection state changes.
    ///
    /// Returns a receiver that notifies on every transition, which is how
    /// consumers observe connects, disconnects, and terminal failure.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Main connection loop with automatic reconnection.
    async fn connection_loop(
        endpoint: String,
        config: Config,
        parser: P,
        state_tx: watch::Sender<ConnectionState>,
        broadcast_tx: broadcast::Sender<F>,
        writer: OutboundWriter,
        cancel: CancellationToken,
    ) {
        let mut attempts = 0_u32;
        let mut backoff: backoff::ExponentialBackoff = config.reconnect.clone().into();

        loop {
            _ = state_tx.send(ConnectionState::Connecting);

            let connected = tokio::select! {
                () = cancel.cancelled() => return,
                result = connect_async(&endpoint) => result,
            };

            match connected {
                Ok((ws_stream, _response)) => {
                    attempts = 0;
                    backoff.reset();

                    // Install the writer before announcing Open so a send
                    // racing the state change finds the channel in place
                    let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
                    *writer.write().unwrap_or_else(PoisonError::into_inner) = Some(out_tx);
                    _ = state_tx.send(ConnectionState::Open {
                        since: Instant::now(),
                    });

                    Self::drive_connection(ws_stream, out_rx, &broadcast_tx, &writer, &cancel, &parser)
                        .await;

                    // The writer only exists while this socket is usable
                    writer.write().unwrap_or_else(PoisonError::into_inner).take();

                    if cancel.is_cancelled() {
                        // Consumer-initiated close: no reconnect, no error noise
                        return;
                    }

                    #[cfg(feature = "tracing")]
                    tracing::warn!("connection closed unexpectedly");
                }
                Err(e) => {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let error = Error::from(WsError::Connection(e));
                    #[cfg(feature = "tracing")]
                    tracing::warn!(%error, "unable to connect");
                    #[cfg(not(feature = "tracing"))]
                    let _ = &error;
                }
            }

            if let Some(max) = config.reconnect.max_attempts
                && attempts >= max
            {
                let error = Error::from(WsError::RetriesExhausted { attempts });
                #[cfg(feature = "tracing")]
                tracing::error!(%error, "reconnection abandoned");
                #[cfg(not(feature = "tracing"))]
                let _ = &error;
                _ = state_tx.send(ConnectionState::Failed { attempts });
                return;
            }

            _ = state_tx.send(ConnectionState::Reconnecting { attempt: attempts });
            attempts = attempts.saturating_add(1);

            if let Some(delay) = backoff.next_backoff() {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = sleep(delay) => {}
                }
            }
        }
    }

    /// Drive one open socket until it closes or the session is cancelled.
    async fn drive_connection(
        ws_stream: WsStream,
        mut out_rx: mpsc::UnboundedReceiver<String>,
        broadcast_tx: &broadcast::Sender<F>,
        writer: &OutboundWriter,
        cancel: &CancellationToken,
        parser: &P,
    ) {
        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    // Detach the writer before closing so a racing send
                    // observes the closed state instead of a dying socket
                    writer.write().unwrap_or_else(PoisonError::into_inner).take();
                    _ = write.close().await;
                    return;
                }

                // Handle incoming frames
                message = read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            match parser.parse(text.as_bytes()) {
                                Ok(frames) => {
                                    for frame in frames {
                                        _ = broadcast_tx.send(frame);
                                    }
                                }
                                Err(e) => {
                                    // One bad frame never ends the session
                                    #[cfg(feature = "tracing")]
                                    tracing::warn!(%text, error = %e, "dropping malformed frame");
                                    #[cfg(not(feature = "tracing"))]
                                    let _ = &e;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => return,
                        Some(Ok(_)) => {
                            // Ignore binary frames and transport control frames
                        }
                        Some(Err(e)) => {
                            // Suppress error noise while tearing down
                            if !cancel.is_cancelled() {
                                #[cfg(feature = "tracing")]
                                tracing::warn!(error = %e, "socket error");
                                #[cfg(not(feature = "tracing"))]
                                let _ = &e;
                            }
                            return;
                        }
                    }
                }

                // Handle outgoing commands
                Some(text) = out_rx.recv() => {
                    if write.send(Message::Text(text.into())).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_open_counts_as_open() {
        assert!(
            ConnectionState::Open {
                since: Instant::now()
            }
            .is_open()
        );
        assert!(!ConnectionState::Idle.is_open());
        assert!(!ConnectionState::Connecting.is_open());
        assert!(!ConnectionState::Reconnecting { attempt: 1 }.is_open());
        assert!(!ConnectionState::Failed { attempts: 5 }.is_open());
    }
}
