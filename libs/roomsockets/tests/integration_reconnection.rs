//! Integration tests for the reconnection state machine
//!
//! These tests drop routes from the hub side and check that the manager
//! degrades, rate-limits its retries, and comes back with fresh sockets.

mod common;

use async_trait::async_trait;
use common::{drive, MockHub};
use roomsockets::{
    builder, ConnectionState, Delivery, FixedDelay, ManagerEvent, NetworkLink, OutputSync, RouteManager,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEVICE: &str = "relay_node";

fn path(suffix: &str) -> String {
    format!("/{}{}", DEVICE, suffix)
}

/// Link whose availability the test controls, counting every join
struct SwitchableLink {
    up: AtomicBool,
    joins: AtomicUsize,
}

impl SwitchableLink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            up: AtomicBool::new(true),
            joins: AtomicUsize::new(0),
        })
    }

    fn joins(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkLink for SwitchableLink {
    async fn join(&self) -> Option<String> {
        self.joins.fetch_add(1, Ordering::SeqCst);
        self.up
            .load(Ordering::SeqCst)
            .then(|| "127.0.0.1".to_string())
    }
}

struct OneRelay;

impl OutputSync for OneRelay {
    fn resync_messages(&self) -> Vec<String> {
        vec![format!("{}=>[ambianceManager]=>relay1#true", DEVICE)]
    }
}

fn manager_for(hub: &MockHub, interval: Duration, link: Arc<SwitchableLink>) -> RouteManager {
    builder()
        .hub(hub.host(), hub.port())
        .device(DEVICE)
        .reconnect_strategy(FixedDelay::new(interval))
        .link(link)
        .output_sync(Arc::new(OneRelay))
        .build()
        .unwrap()
}

async fn poll_until_failure(manager: &mut RouteManager, timeout: Duration) -> Option<String> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        let report = manager.poll_all().await;
        if let Some(failure) = report.failures.into_iter().next() {
            return Some(failure.route);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    None
}

#[tokio::test]
async fn test_route_drop_and_recover() {
    verbose_println!("Testing route drop -> Degraded -> Up...");

    let hub = MockHub::start().await;
    let link = SwitchableLink::new();
    let mut manager = manager_for(&hub, Duration::from_millis(300), Arc::clone(&link));
    let events = manager.events();

    assert!(manager.start().await);
    assert!(hub.wait_until(Duration::from_secs(2), |h| h.total_connections() == 3).await);
    let _: Vec<ManagerEvent> = events.try_iter().collect();

    assert!(hub.close_route(&path("Message")));
    let failed = poll_until_failure(&mut manager, Duration::from_secs(2)).await;
    assert_eq!(failed.as_deref(), Some("message"));
    assert_eq!(manager.state(), ConnectionState::Degraded);
    assert!(!manager.is_route_up("message"));
    assert!(manager.is_route_up("connect"));

    let seen: Vec<ManagerEvent> = events.try_iter().collect();
    assert_eq!(
        seen,
        vec![ManagerEvent::RouteDown("message".into()), ManagerEvent::Degraded]
    );

    let (recovered, _) = drive(&mut manager, Duration::from_secs(3), |m, _| {
        m.state() == ConnectionState::Up
    })
    .await;
    assert!(recovered, "manager never came back up");
    assert_eq!(manager.up_count(), 3);

    assert!(
        hub.wait_until(Duration::from_secs(2), |h| h.total_connections() == 6)
            .await
    );
    for suffix in ["Connect", "Message", "Ping"] {
        assert_eq!(hub.connection_count(&path(suffix)), 2, "route {} not fresh", suffix);
    }

    let metrics = manager.metrics();
    assert_eq!(metrics.reconnects, 1);
    assert_eq!(link.joins(), 2);
    verbose_println!("  Metrics: {:?}", metrics);
}

#[tokio::test]
async fn test_forced_reconnect_opens_fresh_sockets() {
    verbose_println!("Testing forced reconnection...");

    let interval = Duration::from_millis(500);
    let hub = MockHub::start().await;
    let link = SwitchableLink::new();
    let mut manager = manager_for(&hub, interval, Arc::clone(&link));

    assert!(manager.start().await);
    assert!(hub.wait_until(Duration::from_secs(2), |h| h.total_connections() == 3).await);

    // Still inside the window of the start attempt: routes close, none reopen
    assert!(!manager.force_reconnect().await);
    assert_eq!(manager.state(), ConnectionState::Degraded);
    assert_eq!(manager.up_count(), 0);
    assert_eq!(link.joins(), 1);

    tokio::time::sleep(interval + Duration::from_millis(50)).await;
    assert!(manager.force_reconnect().await);
    assert_eq!(manager.state(), ConnectionState::Up);
    assert_eq!(manager.up_count(), 3);
    assert_eq!(link.joins(), 2);

    assert!(
        hub.wait_until(Duration::from_secs(2), |h| h.total_connections() == 6)
            .await
    );
    for suffix in ["Connect", "Message", "Ping"] {
        assert_eq!(hub.connection_count(&path(suffix)), 2, "route {} not fresh", suffix);
    }
    assert_eq!(manager.metrics().reconnects, 1);
}

#[tokio::test]
async fn test_reconnection_rate_limited_under_tight_loop() {
    verbose_println!("Testing reconnection rate limiting...");

    let interval = Duration::from_millis(400);
    let hub = MockHub::start().await;
    let link = SwitchableLink::new();
    let mut manager = manager_for(&hub, interval, Arc::clone(&link));

    assert!(manager.start().await);
    assert!(hub.wait_until(Duration::from_secs(2), |h| h.total_connections() == 3).await);
    assert_eq!(link.joins(), 1);

    link.up.store(false, Ordering::SeqCst);
    assert!(hub.close_route(&path("Ping")));
    assert!(poll_until_failure(&mut manager, Duration::from_secs(2)).await.is_some());

    // The start attempt is still inside its window
    let started = Instant::now();
    while started.elapsed() < Duration::from_millis(200) {
        manager.tick().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert_eq!(link.joins(), 1, "retried before the interval elapsed");

    // Wait for the second (failing) attempt
    let (_, _) = drive(&mut manager, Duration::from_secs(2), |_, _| link.joins() == 2).await;
    assert_eq!(link.joins(), 2);
    let second_attempt = Instant::now();
    assert_eq!(manager.state(), ConnectionState::Degraded);

    // Hammer it: no third attempt inside the window
    while second_attempt.elapsed() < Duration::from_millis(250) {
        manager.tick().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert_eq!(link.joins(), 2, "failed attempt was not rate limited");

    link.up.store(true, Ordering::SeqCst);
    let (recovered, _) = drive(&mut manager, Duration::from_secs(2), |m, _| {
        m.state() == ConnectionState::Up
    })
    .await;
    assert!(recovered);
    assert!(second_attempt.elapsed() >= Duration::from_millis(350));
    assert_eq!(link.joins(), 3);
}

#[tokio::test]
async fn test_retry_queue_drained_after_reconnect() {
    let hub = MockHub::start().await;
    let link = SwitchableLink::new();
    let mut manager = manager_for(&hub, Duration::from_millis(200), link);

    assert!(manager.start().await);
    assert!(hub.wait_until(Duration::from_secs(2), |h| h.total_connections() == 3).await);

    assert!(hub.close_route(&path("Message")));
    assert!(poll_until_failure(&mut manager, Duration::from_secs(2)).await.is_some());

    assert_eq!(manager.send("queued#1").await, Delivery::Queued);
    assert_eq!(manager.send("queued#2").await, Delivery::Queued);
    assert_eq!(manager.retry_queue_len(), 2);

    let message_path = path("Message");
    let (delivered, _) = drive(&mut manager, Duration::from_secs(3), |_, _| {
        hub.received(&message_path).iter().filter(|t| t.starts_with("queued")).count() == 2
    })
    .await;
    assert!(delivered);
    assert_eq!(manager.retry_queue_len(), 0);

    let queued: Vec<String> = hub
        .received(&message_path)
        .into_iter()
        .filter(|t| t.starts_with("queued"))
        .collect();
    assert_eq!(queued, vec!["queued#1", "queued#2"]);
}

#[tokio::test]
async fn test_outputs_resynced_after_reconnect() {
    verbose_println!("Testing relay state re-announcement...");

    let hub = MockHub::start().await;
    let link = SwitchableLink::new();
    let mut manager = manager_for(&hub, Duration::from_millis(200), link);

    let message_path = path("Message");
    let announce = format!("{}=>[ambianceManager]=>relay1#true", DEVICE);
    let announcements = |hub: &MockHub| hub.received(&message_path).iter().filter(|t| **t == announce).count();

    assert!(manager.start().await);
    assert!(hub.wait_until(Duration::from_secs(2), |h| announcements(h) == 1).await);

    assert!(hub.close_route(&path("Connect")));
    assert!(poll_until_failure(&mut manager, Duration::from_secs(2)).await.is_some());

    let (recovered, _) = drive(&mut manager, Duration::from_secs(3), |m, _| {
        m.state() == ConnectionState::Up
    })
    .await;
    assert!(recovered);
    assert!(hub.wait_until(Duration::from_secs(2), |h| announcements(h) == 2).await);
}
