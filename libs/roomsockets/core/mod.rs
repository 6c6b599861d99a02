//! Client-side building blocks: frame codec, socket, routes and their state
//!
//! ```text
//! RouteManager ──owns──> RouteClient ("connect") ──> WsSocket ──> TcpStream
//!                   ├──> RouteClient ("message") ──> WsSocket ──> TcpStream
//!                   └──> RouteClient ("ping")    ──> WsSocket ──> TcpStream
//! ```

pub mod builder;
pub mod config;
pub mod connection_state;
pub mod frame;
pub mod outbox;
pub mod route;
pub mod socket;

pub use builder::{states, RouteManagerBuilder};
pub use config::{ManagerConfig, CONNECT_ROUTE, MESSAGE_ROUTE};
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics};
pub use frame::{Frame, OpCode};
pub use outbox::{OutboundMessage, Outbox};
pub use route::{PollOutcome, RouteClient};
pub use socket::{WsSocket, WsUrl};

/// Create a new route manager builder
pub fn builder() -> RouteManagerBuilder<states::NoHub, states::NoDevice> {
    RouteManagerBuilder::new()
}
