use crate::core::config::MESSAGE_ROUTE;
use crate::protocol::Envelope;
use crossbeam_channel::Sender;

/// One queued outbound text and the route it should leave on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub route: String,
    pub text: String,
}

/// Cloneable handle for sending from other threads
///
/// Animation routines and input callbacks never touch a route directly;
/// they push here and the manager writes on its next tick.
#[derive(Clone)]
pub struct Outbox {
    tx: Sender<OutboundMessage>,
}

impl Outbox {
    pub(crate) fn new(tx: Sender<OutboundMessage>) -> Self {
        Self { tx }
    }

    /// Queue `text` for `route`; false once the manager is gone
    pub fn send_on(&self, route: impl Into<String>, text: impl Into<String>) -> bool {
        self.tx
            .send(OutboundMessage {
                route: route.into(),
                text: text.into(),
            })
            .is_ok()
    }

    /// Queue `text` for the message route
    pub fn send(&self, text: impl Into<String>) -> bool {
        self.send_on(MESSAGE_ROUTE, text)
    }

    pub fn send_envelope(&self, envelope: &Envelope) -> bool {
        self.send(envelope.to_string())
    }
}
