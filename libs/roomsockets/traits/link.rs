use async_trait::async_trait;

/// Trait for the network link underneath the sockets (WiFi on the ESP32 nodes)
///
/// `join` is called once before the first `connect_all` and again before
/// every reconnection attempt. Returning `None` means the link is down and
/// the attempt is abandoned until the next rate-limit window.
#[async_trait]
pub trait NetworkLink: Send + Sync {
    /// Join (or confirm) the network, returning the local address on success
    async fn join(&self) -> Option<String>;
}

/// Link for hosts whose network is managed by the operating system
pub struct HostLink;

#[async_trait]
impl NetworkLink for HostLink {
    async fn join(&self) -> Option<String> {
        Some("host".to_string())
    }
}
