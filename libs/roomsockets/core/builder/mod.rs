pub mod states;

use crate::core::config::{route_name, ManagerConfig, DEFAULT_ROUTE_SUFFIXES};
use crate::core::frame::DEFAULT_MAX_FRAME_LEN;
use crate::manager::RouteManager;
use crate::traits::*;
use states::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Default spacing between reconnection attempts
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(1000);

/// Default capacity of the retry queue
pub const DEFAULT_RETRY_QUEUE_CAPACITY: usize = 32;

/// Type-state builder for [`RouteManager`]
///
/// `build()` only exists once both the hub address and the device name have
/// been given.
///
/// # Example
/// ```ignore
/// let mut manager = roomsockets::builder()
///     .hub("192.168.10.146", 8080)
///     .device("volcano_espLed")
///     .reconnect_strategy(FixedDelay::new(Duration::from_secs(1)))
///     .output_sync(relays.clone())
///     .build()?;
///
/// manager.start().await;
/// ```
pub struct RouteManagerBuilder<H, D>
where
    H: HubState,
    D: DeviceState,
{
    _state: TypeState<H, D>,
    base_url: Option<String>,
    device_name: Option<String>,
    route_suffixes: Vec<String>,
    greeting: Option<String>,
    retry_queue_capacity: usize,
    max_frame_len: u64,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    passive_ping: Option<Arc<dyn PassivePingDetector>>,
    link: Option<Arc<dyn NetworkLink>>,
    output_sync: Option<Arc<dyn OutputSync>>,
}

impl RouteManagerBuilder<NoHub, NoDevice> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            base_url: None,
            device_name: None,
            route_suffixes: DEFAULT_ROUTE_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            greeting: None,
            retry_queue_capacity: DEFAULT_RETRY_QUEUE_CAPACITY,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            reconnect_strategy: None,
            passive_ping: None,
            link: None,
            output_sync: None,
        }
    }
}

impl Default for RouteManagerBuilder<NoHub, NoDevice> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H, D> RouteManagerBuilder<H, D>
where
    H: HubState,
    D: DeviceState,
{
    fn retag<H2: HubState, D2: DeviceState>(self) -> RouteManagerBuilder<H2, D2> {
        RouteManagerBuilder {
            _state: TypeState::new(),
            base_url: self.base_url,
            device_name: self.device_name,
            route_suffixes: self.route_suffixes,
            greeting: self.greeting,
            retry_queue_capacity: self.retry_queue_capacity,
            max_frame_len: self.max_frame_len,
            reconnect_strategy: self.reconnect_strategy,
            passive_ping: self.passive_ping,
            link: self.link,
            output_sync: self.output_sync,
        }
    }

    /// Replace the default `Connect`/`Message`/`Ping` suffixes
    pub fn route_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.route_suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }

    /// Greeting sent on the connect route; an empty string disables it
    pub fn greeting(mut self, text: impl Into<String>) -> Self {
        self.greeting = Some(text.into());
        self
    }

    pub fn retry_queue_capacity(mut self, capacity: usize) -> Self {
        self.retry_queue_capacity = capacity;
        self
    }

    pub fn max_frame_len(mut self, max: u64) -> Self {
        self.max_frame_len = max;
        self
    }

    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    pub fn passive_ping(mut self, detector: impl PassivePingDetector + 'static) -> Self {
        self.passive_ping = Some(Arc::new(detector));
        self
    }

    pub fn link(mut self, link: Arc<dyn NetworkLink>) -> Self {
        self.link = Some(link);
        self
    }

    pub fn output_sync(mut self, sync: Arc<dyn OutputSync>) -> Self {
        self.output_sync = Some(sync);
        self
    }
}

impl<D: DeviceState> RouteManagerBuilder<NoHub, D> {
    /// Hub address; routes live at `ws://{host}:{port}/{device}{suffix}`
    pub fn hub(mut self, host: impl AsRef<str>, port: u16) -> RouteManagerBuilder<HasHub, D> {
        self.base_url = Some(format!("{}:{}", host.as_ref(), port));
        self.retag()
    }
}

impl<H: HubState> RouteManagerBuilder<H, NoDevice> {
    pub fn device(mut self, name: impl Into<String>) -> RouteManagerBuilder<H, HasDevice> {
        self.device_name = Some(name.into());
        self.retag()
    }
}

impl RouteManagerBuilder<HasHub, HasDevice> {
    /// Validate the configuration and create a manager with no open routes
    pub fn build(self) -> Result<RouteManager> {
        let base_url = self
            .base_url
            .ok_or_else(|| RoomSocketError::Configuration("hub address missing".into()))?;
        let device_name = self
            .device_name
            .ok_or_else(|| RoomSocketError::Configuration("device name missing".into()))?;

        if device_name.trim().is_empty() {
            return Err(RoomSocketError::Configuration("device name is empty".into()));
        }
        if self.route_suffixes.is_empty() {
            return Err(RoomSocketError::Configuration("at least one route suffix is required".into()));
        }

        let mut seen = HashSet::new();
        for suffix in &self.route_suffixes {
            if suffix.is_empty() || !seen.insert(route_name(suffix)) {
                return Err(RoomSocketError::Configuration(format!(
                    "route suffix '{}' is empty or duplicated",
                    suffix
                )));
            }
        }

        let config = ManagerConfig {
            base_url,
            device_name,
            route_suffixes: self.route_suffixes,
            greeting: self.greeting,
            retry_queue_capacity: self.retry_queue_capacity,
            max_frame_len: self.max_frame_len,
            reconnect_strategy: self
                .reconnect_strategy
                .unwrap_or_else(|| Box::new(FixedDelay::new(DEFAULT_RECONNECT_INTERVAL))),
            passive_ping: self
                .passive_ping
                .unwrap_or_else(|| Arc::new(TextPassivePing::default())),
            link: self.link.unwrap_or_else(|| Arc::new(HostLink)),
            output_sync: self.output_sync.unwrap_or_else(|| Arc::new(NoOutputs)),
        };

        RouteManager::new(config)
    }
}
