//! Node configuration.

use std::net::SocketAddr;
use std::time::Duration;

use strata_p2p::protocol::MAX_FRAME_SIZE;
use strata_p2p::{DuplicatePolicy, TransportConfig};

use crate::cli::{Cli, DecoderKind, HandshakeKind};

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// P2P listen address.
    pub listen_addr: String,

    /// Peers to dial on startup.
    pub seed_nodes: Vec<SocketAddr>,

    /// Handshake strategy.
    pub handshake: HandshakeKind,

    /// Message decoder.
    pub decoder: DecoderKind,

    /// Largest accepted frame for the length decoder.
    pub max_frame_size: usize,

    /// Optional handshake deadline.
    pub handshake_timeout: Option<Duration>,

    /// Duplicate address policy.
    pub duplicate_policy: DuplicatePolicy,
}

impl NodeConfig {
    /// Create a node configuration from CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        let duplicate_policy = if cli.reject_duplicates {
            DuplicatePolicy::Reject
        } else {
            DuplicatePolicy::Replace
        };

        Self {
            listen_addr: cli.listen.clone(),
            seed_nodes: cli.seed_nodes.clone().unwrap_or_default(),
            handshake: cli.handshake,
            decoder: cli.decoder,
            max_frame_size: cli.max_frame_size,
            handshake_timeout: cli.handshake_timeout.map(Duration::from_secs),
            duplicate_policy,
        }
    }

    /// Build the transport configuration.
    pub fn transport_config(&self) -> TransportConfig {
        let mut config = TransportConfig::new(self.listen_addr.clone())
            .with_duplicate_policy(self.duplicate_policy);
        if let Some(timeout) = self.handshake_timeout {
            config = config.with_handshake_timeout(timeout);
        }
        config
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: strata_p2p::config::DEFAULT_LISTEN_ADDR.to_string(),
            seed_nodes: Vec::new(),
            handshake: HandshakeKind::Version,
            decoder: DecoderKind::Length,
            max_frame_size: MAX_FRAME_SIZE,
            handshake_timeout: None,
            duplicate_policy: DuplicatePolicy::Replace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert!(config.seed_nodes.is_empty());
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Replace);
    }

    #[test]
    fn test_from_cli() {
        let cli = Cli::parse_from([
            "strata-node",
            "--listen",
            "127.0.0.1:4000",
            "--handshake-timeout",
            "3",
            "--reject-duplicates",
        ]);
        let config = NodeConfig::from_cli(&cli);
        let transport = config.transport_config();

        assert_eq!(transport.listen_addr, "127.0.0.1:4000");
        assert_eq!(transport.handshake_timeout, Some(Duration::from_secs(3)));
        assert_eq!(transport.duplicate_policy, DuplicatePolicy::Reject);
    }
}
