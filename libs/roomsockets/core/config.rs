use crate::traits::*;
use std::sync::Arc;

/// Route suffixes every node registers, in connection order
pub const DEFAULT_ROUTE_SUFFIXES: [&str; 3] = ["Connect", "Message", "Ping"];

/// Route that carries application envelopes
pub const MESSAGE_ROUTE: &str = "message";

/// Route that receives the greeting after every `connect_all`
pub const CONNECT_ROUTE: &str = "connect";

/// Configuration for a [`RouteManager`](crate::manager::RouteManager)
///
/// Built with the type-state builder; hub address and device name are
/// mandatory, everything else has a default.
pub struct ManagerConfig {
    /// `host:port` of the hub
    pub(crate) base_url: String,

    /// Device identity, prefix of every route path
    pub(crate) device_name: String,

    /// Route path suffixes; the lowercased suffix is the route name
    pub(crate) route_suffixes: Vec<String>,

    /// Text sent on the connect route after every `connect_all`.
    /// `None` sends `Hello from {device}{suffix}`, an empty string disables it.
    pub(crate) greeting: Option<String>,

    /// Bounded FIFO for sends whose route is down (0 disables queueing)
    pub(crate) retry_queue_capacity: usize,

    /// Ceiling for a single inbound frame payload
    pub(crate) max_frame_len: u64,

    /// Spacing between reconnection attempts
    pub(crate) reconnect_strategy: Box<dyn ReconnectionStrategy>,

    /// Text liveness ping answered on the route it arrives on
    pub(crate) passive_ping: Arc<dyn PassivePingDetector>,

    /// Network join performed before each (re)connection
    pub(crate) link: Arc<dyn NetworkLink>,

    /// Outward state announced after every successful connection, first one included
    pub(crate) output_sync: Arc<dyn OutputSync>,
}

impl ManagerConfig {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn route_suffixes(&self) -> &[String] {
        &self.route_suffixes
    }

    pub fn retry_queue_capacity(&self) -> usize {
        self.retry_queue_capacity
    }

    /// `ws://{base_url}/{device_name}{suffix}`
    pub fn route_url(&self, suffix: &str) -> String {
        format!("ws://{}/{}{}", self.base_url, self.device_name, suffix)
    }

    /// Greeting for the route with the given suffix, if one should be sent
    pub(crate) fn greeting_for(&self, suffix: &str) -> Option<String> {
        match &self.greeting {
            None => Some(format!("Hello from {}{}", self.device_name, suffix)),
            Some(text) if text.is_empty() => None,
            Some(text) => Some(text.clone()),
        }
    }
}

/// Route name for a path suffix
#[inline]
pub fn route_name(suffix: &str) -> String {
    suffix.to_ascii_lowercase()
}
