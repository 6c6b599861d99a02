/// Trait for detecting and responding to passive ping messages
///
/// The hub checks liveness with plain text messages rather than WebSocket
/// PING frames. A detected ping is answered on the route it arrived on and
/// never reaches device logic.
///
/// # Flow
/// ```text
/// Hub ──["ping"]──> Route
///                    │
///                    ├─> is_ping() checks message
///                    │   └─> returns true
///                    │
/// Hub <─["pong"]──── Route sends pong_response() immediately
/// ```
pub trait PassivePingDetector: Send + Sync {
    /// Check if an inbound text is a liveness ping
    fn is_ping(&self, text: &str) -> bool;

    /// Text to send back when `is_ping` matched
    fn pong_response(&self) -> String;
}

/// A passive ping detector that never detects pings
pub struct NoOpPassivePing;

impl PassivePingDetector for NoOpPassivePing {
    fn is_ping(&self, _text: &str) -> bool {
        false
    }

    fn pong_response(&self) -> String {
        String::new()
    }
}

/// Exact-match text ping detector
///
/// # Example
/// ```ignore
/// let detector = TextPassivePing::new("ping", "pong");
/// assert!(detector.is_ping("ping"));
/// ```
pub struct TextPassivePing {
    ping_text: String,
    pong_response: String,
}

impl TextPassivePing {
    /// Create a new text-based passive ping detector
    ///
    /// # Arguments
    /// * `ping_text` - The exact text to match (INBOUND)
    /// * `pong_response` - The text to answer with (OUTBOUND)
    pub fn new(ping_text: impl Into<String>, pong_response: impl Into<String>) -> Self {
        Self {
            ping_text: ping_text.into(),
            pong_response: pong_response.into(),
        }
    }
}

impl Default for TextPassivePing {
    fn default() -> Self {
        Self::new("ping", "pong")
    }
}

impl PassivePingDetector for TextPassivePing {
    fn is_ping(&self, text: &str) -> bool {
        text.trim().eq_ignore_ascii_case(&self.ping_text)
    }

    fn pong_response(&self) -> String {
        self.pong_response.clone()
    }
}
