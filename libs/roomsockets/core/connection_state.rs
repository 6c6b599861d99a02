use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Reconnection state of a route manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Every route is connected
    Up = 0,
    /// One or more routes are down, waiting for the next retry window
    Degraded = 1,
    /// Re-establishing all routes
    Reconnecting = 2,
}

impl ConnectionState {
    #[inline]
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Up,
            2 => ConnectionState::Reconnecting,
            _ => ConnectionState::Degraded,
        }
    }
}

/// Lock-free connection state shared between the manager and observers
#[derive(Debug)]
pub struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Atomically move from `current` to `new`; returns the observed state on failure
    pub fn compare_exchange(
        &self,
        current: ConnectionState,
        new: ConnectionState,
    ) -> Result<ConnectionState, ConnectionState> {
        self.0
            .compare_exchange(current as u8, new as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(ConnectionState::from_u8)
            .map_err(ConnectionState::from_u8)
    }

    #[inline]
    pub fn is_up(&self) -> bool {
        self.get() == ConnectionState::Up
    }
}

/// Lock-free counters
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    reconnect_attempts: AtomicU64,
    reconnects: AtomicU64,
    messages_dropped: AtomicU64,
}

/// Point-in-time copy of [`AtomicMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub reconnect_attempts: u64,
    pub reconnects: u64,
    pub messages_dropped: u64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnect_attempts(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Metrics {
        Metrics {
            messages_sent: self.messages_sent(),
            messages_received: self.messages_received(),
            reconnect_attempts: self.reconnect_attempts(),
            reconnects: self.reconnect_count(),
            messages_dropped: self.messages_dropped(),
        }
    }

    pub fn reset(&self) {
        self.messages_sent.store(0, Ordering::Relaxed);
        self.messages_received.store(0, Ordering::Relaxed);
        self.reconnect_attempts.store(0, Ordering::Relaxed);
        self.reconnects.store(0, Ordering::Relaxed);
        self.messages_dropped.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_state_transitions() {
        let state = AtomicConnectionState::new(ConnectionState::Up);
        assert!(state.is_up());

        state.set(ConnectionState::Degraded);
        assert_eq!(state.get(), ConnectionState::Degraded);

        assert_eq!(
            state.compare_exchange(ConnectionState::Degraded, ConnectionState::Reconnecting),
            Ok(ConnectionState::Degraded)
        );
        assert_eq!(
            state.compare_exchange(ConnectionState::Degraded, ConnectionState::Up),
            Err(ConnectionState::Reconnecting)
        );
    }

    #[test]
    fn test_metrics_from_many_threads() {
        let metrics = Arc::new(AtomicMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.increment_sent();
                        metrics.increment_received();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages_sent, 4000);
        assert_eq!(snapshot.messages_received, 4000);

        metrics.reset();
        assert_eq!(metrics.messages_sent(), 0);
    }
}
