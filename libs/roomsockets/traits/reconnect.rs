use std::time::Duration;

/// Trait for defining how often a degraded manager may retry
///
/// Devices are unattended, so there is no "give up" answer: a strategy only
/// decides the minimum spacing between two reconnection attempts.
pub trait ReconnectionStrategy: Send + Sync {
    /// Minimum interval that must elapse after failed attempt number `attempt`
    /// (0-indexed) before the next one is allowed
    fn next_delay(&self, attempt: usize) -> Duration;

    /// Reset the strategy state (called after a successful reconnection)
    fn reset(&mut self);
}

/// Fixed delay reconnection strategy
///
/// Always waits the same amount of time between reconnection attempts.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// Create a new fixed delay strategy
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, _attempt: usize) -> Duration {
        self.delay
    }

    fn reset(&mut self) {
        // No state to reset for fixed delay
    }
}
