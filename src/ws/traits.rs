//! Core traits for generic WebSocket infrastructure.

/// Frame parser trait for converting raw bytes to frames.
///
/// The connection manager never interprets frame contents itself; a parser
/// decides how the raw text of one transport message maps onto the typed
/// frame union. A failed parse drops that message only, the connection
/// stays open.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone)]
/// pub struct MyParser;
///
/// impl FrameParser<MyFrame> for MyParser {
///     fn parse(&self, bytes: &[u8]) -> crate::Result<Vec<MyFrame>> {
///         let frame: MyFrame = serde_json::from_slice(bytes)?;
///         Ok(vec![frame])
///     }
/// }
/// ```
pub trait FrameParser<F>: Clone + Send + Sync + 'static {
    /// Parse incoming bytes into frames.
    ///
    /// May return an empty vec for keepalive or otherwise content-free
    /// messages.
    fn parse(&self, bytes: &[u8]) -> crate::Result<Vec<F>>;
}
