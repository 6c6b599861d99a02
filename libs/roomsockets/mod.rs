//! # RoomSockets
//!
//! Resilient multi-route WebSocket client for the installation's nodes.
//!
//! Every node keeps three plain-TCP WebSocket routes to the hub
//! (`{device}Connect`, `{device}Message`, `{device}Ping`) and exchanges
//! `sender=>[destinations]=>topic#value` envelopes on the message route.
//!
//! ## Features
//!
//! - **Hand-written framing**: RFC 6455 subset, masked client frames, 7/16/64-bit lengths
//! - **Non-blocking polling**: one frame per route per tick, "no data" is a value, not an error
//! - **Reconnection state machine**: Up / Degraded / Reconnecting, rate-limited, never gives up
//! - **Output resync**: relay and lock states announced on start and after every reconnection
//! - **Topic dispatch**: explicit exact/contains handler table
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut manager = roomsockets::builder()
//!     .hub("192.168.10.146", 8080)
//!     .device("volcano_espLed")
//!     .build()?;
//!
//! manager.start().await;
//! loop {
//!     let report = manager.tick().await;
//!     for msg in report.messages {
//!         router.dispatch(&mut device, &msg.route, &msg.text);
//!     }
//!     tokio::time::sleep(Duration::from_millis(100)).await;
//! }
//! ```

pub mod traits;
pub mod core;
pub mod manager;
pub mod protocol;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use core::{
    builder, config, connection_state, frame, outbox, route, socket,
    builder::{states, RouteManagerBuilder},
    config::{ManagerConfig, CONNECT_ROUTE, MESSAGE_ROUTE},
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics},
    outbox::{OutboundMessage, Outbox},
    route::{PollOutcome, RouteClient},
    socket::{WsSocket, WsUrl},
};

pub use manager::{Delivery, InboundMessage, ManagerEvent, PollReport, RouteFailure, RouteManager};
pub use protocol::{parse_topic_value, Envelope, TopicValue};
