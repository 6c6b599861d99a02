use crate::core::config::{route_name, ManagerConfig, CONNECT_ROUTE, MESSAGE_ROUTE};
use crate::core::{
    AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics, OutboundMessage, Outbox, PollOutcome,
    RouteClient, WsUrl,
};
use crate::traits::{Result, TransportError};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Connection lifecycle notifications for observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerEvent {
    /// A route failed and was closed
    RouteDown(String),
    /// At least one route is down
    Degraded,
    /// Reconnection attempt number (1-based, since the last success)
    Reconnecting(usize),
    /// Every route is connected
    Up,
}

/// Outcome of [`RouteManager::send_on`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to the route
    Sent,
    /// Route down; kept in the retry queue
    Queued,
    /// Not delivered and not kept
    Dropped,
}

/// One inbound text and the route it arrived on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub route: String,
    pub text: String,
}

/// A route that broke during a poll or a send
#[derive(Debug)]
pub struct RouteFailure {
    pub route: String,
    pub error: TransportError,
}

/// Everything one `poll_all` produced
#[derive(Debug, Default)]
pub struct PollReport {
    pub messages: Vec<InboundMessage>,
    pub failures: Vec<RouteFailure>,
}

impl PollReport {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.failures.is_empty()
    }
}

/// Owner of the fixed set of routes for one device identity
///
/// The manager is driven by its caller: `poll_all` reads at most one frame
/// per route and `maintain` performs the rate-limited reconnection and
/// drains pending sends. Nothing runs in the background, so a burst of
/// frames on one route is delivered one per tick.
///
/// ```text
///        route fails            interval elapsed
///   Up ─────────────> Degraded ─────────────────> Reconnecting
///    ^                   ^                             │
///    │                   └──── join or connect fails ──┤
///    └──────────── all routes up, outputs resynced ────┘
/// ```
pub struct RouteManager {
    config: ManagerConfig,
    routes: Vec<RouteClient>,
    state: AtomicConnectionState,
    metrics: AtomicMetrics,
    retry_queue: VecDeque<OutboundMessage>,
    outbox_tx: Sender<OutboundMessage>,
    outbox_rx: Receiver<OutboundMessage>,
    event_tx: Sender<ManagerEvent>,
    event_rx: Receiver<ManagerEvent>,
    failed_attempts: usize,
    last_attempt: Option<Instant>,
    ever_connected: bool,
}

impl RouteManager {
    /// Create a manager with every route registered but closed
    pub fn new(config: ManagerConfig) -> Result<Self> {
        let mut routes = Vec::with_capacity(config.route_suffixes.len());
        for suffix in &config.route_suffixes {
            let url = WsUrl::parse(&config.route_url(suffix))?;
            routes.push(RouteClient::new(route_name(suffix), url, config.max_frame_len));
        }

        let (outbox_tx, outbox_rx) = unbounded();
        let (event_tx, event_rx) = bounded(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config,
            routes,
            state: AtomicConnectionState::new(ConnectionState::Degraded),
            metrics: AtomicMetrics::new(),
            retry_queue: VecDeque::new(),
            outbox_tx,
            outbox_rx,
            event_tx,
            event_rx,
            failed_attempts: 0,
            last_attempt: None,
            ever_connected: false,
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot()
    }

    /// Receiver for lifecycle events; events are dropped when nobody reads
    pub fn events(&self) -> Receiver<ManagerEvent> {
        self.event_rx.clone()
    }

    /// Thread-safe handle whose messages are sent on the next `maintain`
    pub fn outbox(&self) -> Outbox {
        Outbox::new(self.outbox_tx.clone())
    }

    pub fn route_names(&self) -> Vec<&str> {
        self.routes.iter().map(RouteClient::name).collect()
    }

    pub fn is_route_up(&self, name: &str) -> bool {
        self.route_index(name).is_some_and(|idx| self.routes[idx].is_up())
    }

    pub fn up_count(&self) -> usize {
        self.routes.iter().filter(|r| r.is_up()).count()
    }

    pub fn retry_queue_len(&self) -> usize {
        self.retry_queue.len()
    }

    /// First connection: join the network, open every route, resync outputs
    pub async fn start(&mut self) -> bool {
        self.attempt().await
    }

    /// Open a fresh socket for every route
    ///
    /// Routes that fail are left down and picked up by the next
    /// reconnection; they are never retried inline. Returns the number of
    /// routes that came up.
    pub async fn connect_all(&mut self) -> usize {
        let mut up = 0;
        for route in self.routes.iter_mut() {
            match route.connect().await {
                Ok(()) => {
                    info!("Route '{}' connected to {}", route.name(), route.url());
                    up += 1;
                }
                Err(e) => warn!("Route '{}' failed to connect to {}: {}", route.name(), route.url(), e),
            }
        }

        self.send_greeting().await;

        if self.up_count() == self.routes.len() {
            self.transition(ConnectionState::Up);
        } else {
            self.transition(ConnectionState::Degraded);
        }
        up
    }

    /// Read at most one frame from every live route, without waiting
    ///
    /// Text pings are answered in place and not reported. A broken route is
    /// closed, reported in `failures`, and moves the manager to `Degraded`.
    pub async fn poll_all(&mut self) -> PollReport {
        let mut report = PollReport::default();

        for idx in 0..self.routes.len() {
            if !self.routes[idx].is_up() {
                continue;
            }

            match self.routes[idx].poll_once().await {
                PollOutcome::Nothing => {}
                PollOutcome::Message(text) => {
                    self.metrics.increment_received();
                    if self.config.passive_ping.is_ping(&text) {
                        let pong = self.config.passive_ping.pong_response();
                        debug!("Passive ping on '{}', answering '{}'", self.routes[idx].name(), pong);
                        match self.routes[idx].send(&pong).await {
                            Ok(()) => self.metrics.increment_sent(),
                            Err(e) => report.failures.push(self.route_failed(idx, e).await),
                        }
                        continue;
                    }
                    report.messages.push(InboundMessage {
                        route: self.routes[idx].name().to_string(),
                        text,
                    });
                }
                PollOutcome::Failed(e) => report.failures.push(self.route_failed(idx, e).await),
            }
        }

        report
    }

    /// Reconnect when due, then flush the retry queue and the outbox
    pub async fn maintain(&mut self) {
        if self.state() != ConnectionState::Up && self.reconnect_due() {
            self.attempt().await;
        }
        self.drain_retry_queue().await;
        self.drain_outbox().await;
    }

    /// `maintain` followed by `poll_all`
    pub async fn tick(&mut self) -> PollReport {
        self.maintain().await;
        self.poll_all().await
    }

    /// Tear every route down and reconnect as soon as the rate limit allows
    ///
    /// Returns true when the manager is `Up` afterwards.
    pub async fn force_reconnect(&mut self) -> bool {
        for route in self.routes.iter_mut() {
            route.close().await;
        }
        self.transition(ConnectionState::Degraded);
        if self.reconnect_due() {
            self.attempt().await;
        }
        self.state() == ConnectionState::Up
    }

    /// Send `text` on the named route
    ///
    /// If the route is down (or breaks while sending) the text goes to the
    /// bounded retry queue; when the queue is full the oldest entry is
    /// dropped. Duplicates are not detected.
    pub async fn send_on(&mut self, route: &str, text: &str) -> Delivery {
        let Some(idx) = self.route_index(route) else {
            warn!("No route named '{}', dropping message", route);
            self.metrics.increment_dropped();
            return Delivery::Dropped;
        };

        if self.routes[idx].is_up() {
            match self.routes[idx].send(text).await {
                Ok(()) => {
                    self.metrics.increment_sent();
                    return Delivery::Sent;
                }
                Err(e) => {
                    self.route_failed(idx, e).await;
                }
            }
        }

        self.enqueue(OutboundMessage {
            route: route.to_string(),
            text: text.to_string(),
        })
    }

    /// Send on the message route
    pub async fn send(&mut self, text: &str) -> Delivery {
        self.send_on(MESSAGE_ROUTE, text).await
    }

    /// Close every route; the manager can be started again afterwards
    pub async fn shutdown(&mut self) {
        info!("Closing all routes for '{}'", self.config.device_name);
        for route in self.routes.iter_mut() {
            route.close().await;
        }
        self.transition(ConnectionState::Degraded);
    }

    fn route_index(&self, name: &str) -> Option<usize> {
        self.routes.iter().position(|r| r.name() == name)
    }

    fn reconnect_due(&self) -> bool {
        match self.last_attempt {
            None => true,
            Some(at) => {
                let wait = self
                    .config
                    .reconnect_strategy
                    .next_delay(self.failed_attempts.saturating_sub(1));
                at.elapsed() >= wait
            }
        }
    }

    async fn attempt(&mut self) -> bool {
        let attempt = self.failed_attempts + 1;
        self.last_attempt = Some(Instant::now());
        self.metrics.increment_reconnect_attempts();
        self.state.set(ConnectionState::Reconnecting);
        self.emit(ManagerEvent::Reconnecting(attempt));
        info!("Connecting '{}' (attempt {})", self.config.device_name, attempt);

        let Some(address) = self.config.link.join().await else {
            warn!("Network link unavailable, staying degraded");
            self.failed_attempts += 1;
            self.transition(ConnectionState::Degraded);
            return false;
        };
        debug!("Network link up ({})", address);

        self.connect_all().await;
        if self.state() != ConnectionState::Up {
            self.failed_attempts += 1;
            return false;
        }

        if self.ever_connected {
            self.metrics.increment_reconnects();
        }
        self.ever_connected = true;
        self.failed_attempts = 0;
        self.config.reconnect_strategy.reset();

        // Start and reconnection alike: the hub learns output states only from us
        let resync = self.config.output_sync.resync_messages();
        if !resync.is_empty() {
            info!("Re-announcing {} output state(s)", resync.len());
        }
        for text in resync {
            self.send_on(MESSAGE_ROUTE, &text).await;
        }

        self.state() == ConnectionState::Up
    }

    async fn send_greeting(&mut self) {
        let Some(idx) = self.route_index(CONNECT_ROUTE) else {
            return;
        };
        if !self.routes[idx].is_up() {
            return;
        }
        let Some(greeting) = self.config.greeting_for(&self.config.route_suffixes[idx]) else {
            return;
        };
        match self.routes[idx].send(&greeting).await {
            Ok(()) => self.metrics.increment_sent(),
            Err(e) => {
                self.route_failed(idx, e).await;
            }
        }
    }

    async fn route_failed(&mut self, idx: usize, error: TransportError) -> RouteFailure {
        let name = self.routes[idx].name().to_string();
        warn!("Route '{}' lost: {}", name, error);
        self.routes[idx].close().await;
        self.emit(ManagerEvent::RouteDown(name.clone()));
        self.transition(ConnectionState::Degraded);
        RouteFailure { route: name, error }
    }

    fn enqueue(&mut self, message: OutboundMessage) -> Delivery {
        let capacity = self.config.retry_queue_capacity;
        if capacity == 0 {
            warn!("Route '{}' down, dropping message", message.route);
            self.metrics.increment_dropped();
            return Delivery::Dropped;
        }
        if self.retry_queue.len() >= capacity {
            if let Some(oldest) = self.retry_queue.pop_front() {
                warn!("Retry queue full, dropping oldest message for '{}'", oldest.route);
                self.metrics.increment_dropped();
            }
        }
        debug!("Route '{}' down, queueing message", message.route);
        self.retry_queue.push_back(message);
        Delivery::Queued
    }

    async fn drain_retry_queue(&mut self) {
        if self.retry_queue.is_empty() {
            return;
        }

        let pending = std::mem::take(&mut self.retry_queue);
        for message in pending {
            let idx = match self.route_index(&message.route) {
                Some(idx) if self.routes[idx].is_up() => idx,
                _ => {
                    self.retry_queue.push_back(message);
                    continue;
                }
            };
            match self.routes[idx].send(&message.text).await {
                Ok(()) => self.metrics.increment_sent(),
                Err(e) => {
                    self.route_failed(idx, e).await;
                    self.retry_queue.push_back(message);
                }
            }
        }
    }

    async fn drain_outbox(&mut self) {
        let batch: Vec<OutboundMessage> = self.outbox_rx.try_iter().collect();
        for message in batch {
            self.send_on(&message.route, &message.text).await;
        }
    }

    fn transition(&self, to: ConnectionState) {
        let from = self.state.get();
        self.state.set(to);
        if from == to {
            return;
        }
        match to {
            ConnectionState::Up => {
                info!("All routes up for '{}'", self.config.device_name);
                self.emit(ManagerEvent::Up);
            }
            ConnectionState::Degraded => self.emit(ManagerEvent::Degraded),
            ConnectionState::Reconnecting => {}
        }
    }

    fn emit(&self, event: ManagerEvent) {
        let _ = self.event_tx.try_send(event);
    }
}
