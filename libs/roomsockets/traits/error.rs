use std::io;
use thiserror::Error;

/// Errors raised while reading or interpreting a single WebSocket frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The peer stopped sending in the middle of a frame
    #[error("Truncated frame while reading {section}")]
    Truncated { section: &'static str },

    /// The stream failed while a frame was being read
    #[error("Stream error while reading frame: {0:?}")]
    Io(std::io::ErrorKind),

    /// Opcode outside of text/ping/pong/close/continuation
    #[error("Unsupported opcode: 0x{0:X}")]
    UnsupportedOpcode(u8),

    /// Text frame whose payload is not valid UTF-8
    #[error("Invalid UTF-8 in text frame")]
    InvalidUtf8,

    /// Declared payload length exceeds the configured ceiling
    #[error("Frame too large: {declared} bytes (max {max})")]
    TooLarge { declared: u64, max: u64 },
}

impl FrameError {
    /// Whether the stream can no longer be trusted after this error
    ///
    /// Truncation and stream errors mean the peer is gone. The other
    /// variants were raised after the whole frame was consumed, so the
    /// stream stays aligned and only the message is dropped.
    #[inline]
    pub fn is_stream_failure(&self) -> bool {
        matches!(self, FrameError::Truncated { .. } | FrameError::Io(_) | FrameError::TooLarge { .. })
    }
}

/// Socket-level failures
#[derive(Error, Debug)]
pub enum TransportError {
    /// Non-blocking read found nothing to read (expected steady state)
    #[error("No data available")]
    WouldBlock,

    /// The peer went away or the stream broke
    #[error("Connection reset: {0}")]
    ConnectionReset(String),

    /// The HTTP upgrade did not answer with 101 Switching Protocols
    #[error("Handshake rejected: {0}")]
    HandshakeRejected(String),

    /// The route has no live socket
    #[error("Not connected")]
    NotConnected,

    /// The route URL could not be parsed into host, port and path
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Any other I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Whether this error only means "nothing this tick"
    #[inline]
    pub fn is_would_block(&self) -> bool {
        match self {
            TransportError::WouldBlock => true,
            TransportError::Io(e) => e.kind() == io::ErrorKind::WouldBlock,
            _ => false,
        }
    }
}

/// Envelope text that does not follow the addressing convention
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Empty payload
    #[error("Empty message")]
    Empty,

    /// Envelope marker present but the section count is wrong
    #[error("Expected sender=>[destinations]=>payload, got {sections} sections")]
    MissingSeparator { sections: usize },

    /// Destination list not wrapped in brackets
    #[error("Malformed destination list: {0}")]
    MalformedDestinations(String),
}

/// Application-level failures (dispatch and animation)
#[derive(Error, Debug)]
pub enum LogicError {
    /// No handler registered for the topic
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// A handler rejected the message
    #[error("Handler error on '{topic}': {reason}")]
    Handler { topic: String, reason: String },

    /// An animation routine panicked
    #[error("Animation '{0}' panicked")]
    AnimationPanicked(String),

    /// The animation thread could not be started
    #[error("Failed to spawn animation '{name}': {reason}")]
    AnimationSpawn { name: String, reason: String },
}

/// Main error type for roomsockets
#[derive(Error, Debug)]
pub enum RoomSocketError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Logic(#[from] LogicError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for roomsockets operations
pub type Result<T> = std::result::Result<T, RoomSocketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_would_block_classification() {
        assert!(TransportError::WouldBlock.is_would_block());
        assert!(TransportError::Io(io::Error::from(io::ErrorKind::WouldBlock)).is_would_block());
        assert!(!TransportError::NotConnected.is_would_block());
        assert!(!TransportError::ConnectionReset("eof".into()).is_would_block());
    }

    #[test]
    fn test_umbrella_conversion() {
        let err: RoomSocketError = FrameError::InvalidUtf8.into();
        assert!(matches!(err, RoomSocketError::Frame(FrameError::InvalidUtf8)));
        assert_eq!(err.to_string(), "Invalid UTF-8 in text frame");
    }
}
