//! One WebSocket session over one TCP connection
//!
//! The socket never retries on its own. Every failure comes back to the
//! caller as a [`TransportError`] and the connection manager decides what
//! to do with the route.
//!
//! The upgrade response is accepted on the "101 Switching Protocols"
//! substring alone; `Sec-WebSocket-Accept` is not verified.

use crate::core::frame::{self, OpCode};
use crate::traits::TransportError;
use base64::Engine;
use rand::RngCore;
use std::fmt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

const SWITCHING_PROTOCOLS: &str = "101 Switching Protocols";
const MAX_HANDSHAKE_RESPONSE: usize = 4096;

/// `ws://host[:port]/path` split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsUrl {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl WsUrl {
    /// Parse a plain `ws://` URL (no TLS); the port defaults to 80
    pub fn parse(url: &str) -> Result<Self, TransportError> {
        let rest = url
            .strip_prefix("ws://")
            .ok_or_else(|| TransportError::InvalidUrl(url.to_string()))?;

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| TransportError::InvalidUrl(url.to_string()))?;
                (host, port)
            }
            None => (authority, 80),
        };

        if host.is_empty() {
            return Err(TransportError::InvalidUrl(url.to_string()));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }
}

impl fmt::Display for WsUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ws://{}:{}{}", self.host, self.port, self.path)
    }
}

/// A connected WebSocket client session
pub struct WsSocket {
    stream: TcpStream,
    url: WsUrl,
    connected: bool,
    max_frame_len: u64,
}

impl WsSocket {
    /// Open TCP, perform the HTTP upgrade and return a live socket
    pub async fn connect(url: &WsUrl, max_frame_len: u64) -> Result<Self, TransportError> {
        let mut stream = TcpStream::connect((url.host.as_str(), url.port)).await?;
        stream.set_nodelay(true)?;

        let request = handshake_request(url, &generate_key());
        stream.write_all(request.as_bytes()).await?;

        let response = read_handshake_response(&mut stream).await?;
        if !response.contains(SWITCHING_PROTOCOLS) {
            let status = response.lines().next().unwrap_or_default().to_string();
            return Err(TransportError::HandshakeRejected(status));
        }

        debug!("WebSocket upgrade accepted by {}", url);
        Ok(Self {
            stream,
            url: url.clone(),
            connected: true,
            max_frame_len,
        })
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[inline]
    pub fn url(&self) -> &WsUrl {
        &self.url
    }

    /// Send one masked text frame
    pub async fn send(&mut self, text: &str) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        let bytes = frame::encode_text_frame(text);
        self.write(&bytes).await
    }

    /// Read one byte without waiting
    ///
    /// `Err(TransportError::WouldBlock)` means nothing has arrived yet.
    /// End of stream is reported as a reset.
    pub fn try_read_byte(&mut self) -> Result<u8, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        let mut buf = [0u8; 1];
        match self.stream.try_read(&mut buf) {
            Ok(0) => {
                self.connected = false;
                Err(TransportError::ConnectionReset("peer closed the stream".into()))
            }
            Ok(_) => Ok(buf[0]),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(TransportError::WouldBlock),
            Err(e) => {
                self.connected = false;
                Err(TransportError::Io(e))
            }
        }
    }

    /// Read the rest of one frame and interpret it
    ///
    /// Returns `Ok(Some(text))` for text frames. Control frames are handled
    /// here (PING is answered with one PONG, CLOSE tears the socket down) and
    /// yield `Ok(None)`. Malformed but complete frames are logged and
    /// dropped; only stream failures come back as errors.
    pub async fn receive(&mut self, first_byte: Option<u8>) -> Result<Option<String>, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        let frame = match frame::decode_frame(&mut self.stream, first_byte, self.max_frame_len).await {
            Ok(frame) => frame,
            Err(e) if e.is_stream_failure() => {
                self.connected = false;
                return Err(TransportError::ConnectionReset(e.to_string()));
            }
            Err(e) => {
                warn!("Dropping frame from {}: {}", self.url, e);
                return Ok(None);
            }
        };

        match frame.opcode {
            OpCode::Text => match frame.into_text() {
                Ok(text) => Ok(Some(text)),
                Err(_) => {
                    warn!("Dropping text frame with invalid UTF-8 from {}", self.url);
                    Ok(None)
                }
            },
            OpCode::Ping => {
                debug!("PING from {}, answering PONG", self.url);
                let pong = frame::encode_control_frame(OpCode::Pong);
                self.write(&pong).await?;
                Ok(None)
            }
            OpCode::Pong => Ok(None),
            OpCode::Close => {
                debug!("CLOSE frame from {}", self.url);
                self.close().await;
                Ok(None)
            }
            OpCode::Continuation => {
                warn!("Fragmented messages are not supported, dropping continuation from {}", self.url);
                Ok(None)
            }
        }
    }

    /// Best-effort CLOSE frame, then shut the stream down; never fails
    pub async fn close(&mut self) {
        if self.connected {
            let close = frame::encode_control_frame(OpCode::Close);
            let _ = self.stream.write_all(&close).await;
            let _ = self.stream.shutdown().await;
        }
        self.connected = false;
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if let Err(e) = self.stream.write_all(bytes).await {
            self.connected = false;
            return Err(TransportError::Io(e));
        }
        Ok(())
    }
}

fn generate_key() -> String {
    let mut raw = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut raw);
    base64::engine::general_purpose::STANDARD.encode(raw)
}

fn handshake_request(url: &WsUrl, key: &str) -> String {
    format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host}:{port}\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Origin: http://{host}:{port}\r\n\
         \r\n",
        path = url.path,
        host = url.host,
        port = url.port,
    )
}

// Byte by byte so the first frame is never swallowed with the headers.
async fn read_handshake_response(stream: &mut TcpStream) -> Result<String, TransportError> {
    let mut response = Vec::with_capacity(256);
    let mut byte = [0u8; 1];

    while !response.ends_with(b"\r\n\r\n") {
        if response.len() >= MAX_HANDSHAKE_RESPONSE {
            return Err(TransportError::HandshakeRejected("response headers too long".into()));
        }
        let n = stream.read(&mut byte).await?;
        if n == 0 {
            return Err(TransportError::HandshakeRejected(
                "connection closed during handshake".into(),
            ));
        }
        response.push(byte[0]);
    }

    Ok(String::from_utf8_lossy(&response).into_owned())
}
