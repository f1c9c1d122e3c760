//! Transport configuration.

use std::time::Duration;

/// Default listen address.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// Default connection timeout for dialing.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default capacity of the message channel created by
/// [`TcpTransport::with_channel`](crate::TcpTransport::with_channel).
pub const DEFAULT_SINK_CAPACITY: usize = 256;

/// What to do when a second connection arrives for an address that is
/// already registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Register the new peer and close the one it replaces.
    #[default]
    Replace,
    /// Keep the existing peer and close the new connection.
    Reject,
}

/// Configuration for a TCP transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Address to bind the listener to, in `host:port` form.
    pub listen_addr: String,

    /// Timeout for establishing outbound connections.
    pub connect_timeout: Duration,

    /// Optional deadline for the handshake. No deadline when `None`.
    pub handshake_timeout: Option<Duration>,

    /// Set `TCP_NODELAY` on every connection.
    pub nodelay: bool,

    /// Policy for a duplicate remote address.
    pub duplicate_policy: DuplicatePolicy,

    /// Capacity of the bounded message channel.
    pub sink_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            handshake_timeout: None,
            nodelay: true,
            duplicate_policy: DuplicatePolicy::default(),
            sink_capacity: DEFAULT_SINK_CAPACITY,
        }
    }
}

impl TransportConfig {
    /// Create a new configuration with the specified listen address.
    pub fn new(listen_addr: impl Into<String>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            ..Default::default()
        }
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// Enable or disable `TCP_NODELAY`.
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Set the duplicate address policy.
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Set the capacity of the message channel.
    pub fn with_sink_capacity(mut self, capacity: usize) -> Self {
        self.sink_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TransportConfig::default();
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert!(config.handshake_timeout.is_none());
        assert!(config.nodelay);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Replace);
        assert_eq!(config.sink_capacity, DEFAULT_SINK_CAPACITY);
    }

    #[test]
    fn test_config_builder() {
        let config = TransportConfig::new("127.0.0.1:9999")
            .with_connect_timeout(Duration::from_secs(2))
            .with_handshake_timeout(Duration::from_secs(1))
            .with_nodelay(false)
            .with_duplicate_policy(DuplicatePolicy::Reject)
            .with_sink_capacity(8);

        assert_eq!(config.listen_addr, "127.0.0.1:9999");
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.handshake_timeout, Some(Duration::from_secs(1)));
        assert!(!config.nodelay);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.sink_capacity, 8);
    }
}
