//! Binary runner utilities
//!
//! Banners and the supervised restart loop every node binary runs under.

use ambiance::ShutdownManager;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{error, info, warn};

/// Wait before rebuilding a node that failed
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(5);

/// Configuration for running a binary application
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the binary (for logging)
    pub name: String,
    pub restart_delay: Duration,
}

impl RunConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    pub fn print_banner(&self) {
        info!("");
        info!("========================================");
        info!("Starting {}", self.name);
        info!("Press Ctrl+C to stop");
        info!("========================================");
        info!("");
    }

    pub fn print_shutdown(&self, restarts: usize) {
        info!("");
        info!("========================================");
        info!("{} stopped gracefully", self.name);
        info!("Restarts: {}", restarts);
        info!("========================================");
    }
}

/// Run a freshly built node until shutdown, rebuilding it after any error
/// or panic
///
/// `factory` builds and runs one node instance. Returns the number of
/// restarts once shutdown was requested.
pub async fn supervise<F, Fut>(config: &RunConfig, shutdown: &ShutdownManager, mut factory: F) -> usize
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let mut restarts = 0;
    while shutdown.is_running() {
        match AssertUnwindSafe(factory()).catch_unwind().await {
            Ok(Ok(())) if !shutdown.is_running() => break,
            Ok(Ok(())) => warn!("[{}] Node returned early, restarting", config.name),
            Ok(Err(e)) => error!("[{}] Node failed: {:#}", config.name, e),
            Err(_) => error!("[{}] Node panicked", config.name),
        }

        shutdown.interruptible_sleep(config.restart_delay).await;
        if shutdown.is_running() {
            restarts += 1;
            info!("[{}] Restart #{}", config.name, restarts);
        }
    }
    restarts
}
