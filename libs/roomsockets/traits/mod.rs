//! # RoomSockets Traits
//!
//! Pluggable seams of the client and the error taxonomy:
//!
//! - **ReconnectionStrategy**: spacing between reconnection attempts
//! - **PassivePingDetector**: recognize and answer text heartbeats
//! - **NetworkLink**: join the network before (re)connecting
//! - **OutputSync**: outward state announced each time all routes come up
//! - **TopicRouter**: topic → handler dispatch table

pub mod error;
pub mod link;
pub mod passive_ping;
pub mod reconnect;
pub mod router;
pub mod state;

pub use error::{FrameError, LogicError, ProtocolError, Result, RoomSocketError, TransportError};
pub use link::{HostLink, NetworkLink};
pub use passive_ping::{NoOpPassivePing, PassivePingDetector, TextPassivePing};
pub use reconnect::{FixedDelay, ReconnectionStrategy};
pub use router::{DispatchOutcome, TopicHandler, TopicMatch, TopicMessage, TopicRouter};
pub use state::{NoOutputs, OutputSync};
