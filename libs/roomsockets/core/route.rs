use crate::core::socket::{WsSocket, WsUrl};
use crate::traits::TransportError;
use tracing::debug;

/// Result of one non-blocking poll of a route
///
/// "No data this tick" is an ordinary value, never an error.
#[derive(Debug)]
pub enum PollOutcome {
    /// One complete text message
    Message(String),
    /// Nothing for device logic this tick (no data, or a control frame)
    Nothing,
    /// The route is broken and must be re-established
    Failed(TransportError),
}

/// One named logical route bound to one socket
///
/// A route is "up" iff its socket is connected. Reconnection swaps in a
/// brand new socket under the same name.
pub struct RouteClient {
    name: String,
    url: WsUrl,
    socket: Option<WsSocket>,
    max_frame_len: u64,
}

impl RouteClient {
    pub fn new(name: impl Into<String>, url: WsUrl, max_frame_len: u64) -> Self {
        Self {
            name: name.into(),
            url,
            socket: None,
            max_frame_len,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn url(&self) -> &WsUrl {
        &self.url
    }

    #[inline]
    pub fn is_up(&self) -> bool {
        self.socket.as_ref().is_some_and(WsSocket::is_connected)
    }

    /// Open a fresh socket, discarding the previous one
    pub async fn connect(&mut self) -> Result<(), TransportError> {
        if let Some(mut old) = self.socket.take() {
            old.close().await;
        }
        let socket = WsSocket::connect(&self.url, self.max_frame_len).await?;
        self.socket = Some(socket);
        Ok(())
    }

    /// Read at most one frame without waiting for data to arrive
    ///
    /// Peeks one byte; only once a byte is there does it wait for the rest
    /// of the frame.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let Some(socket) = self.socket.as_mut() else {
            return PollOutcome::Failed(TransportError::NotConnected);
        };

        let first = match socket.try_read_byte() {
            Ok(byte) => byte,
            Err(e) if e.is_would_block() => return PollOutcome::Nothing,
            Err(e) => return PollOutcome::Failed(e),
        };

        match socket.receive(Some(first)).await {
            Ok(Some(text)) => PollOutcome::Message(text),
            Ok(None) if socket.is_connected() => PollOutcome::Nothing,
            Ok(None) => {
                debug!("Route '{}' closed by peer", self.name);
                PollOutcome::Failed(TransportError::ConnectionReset("close frame received".into()))
            }
            Err(e) => PollOutcome::Failed(e),
        }
    }

    /// Send one text message, waiting until it is fully written
    pub async fn send(&mut self, text: &str) -> Result<(), TransportError> {
        match self.socket.as_mut() {
            Some(socket) => socket.send(text).await,
            None => Err(TransportError::NotConnected),
        }
    }

    /// Close the socket if any; the route stays registered but down
    pub async fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            socket.close().await;
        }
    }
}
