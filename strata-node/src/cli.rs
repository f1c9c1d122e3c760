//! Command-line argument parsing.

use std::net::SocketAddr;

use clap::{Parser, ValueEnum};

/// Handshake run on every new connection.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeKind {
    /// Accept every peer.
    Nop,
    /// Exchange network magic, protocol version and a self-connection nonce.
    Version,
}

/// Wire decoder for inbound bytes.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    /// 4-byte big-endian length prefix followed by the payload.
    Length,
    /// Whatever a single socket read returns.
    Raw,
}

/// Strata transport node.
#[derive(Parser, Debug, Clone)]
#[command(name = "strata-node")]
#[command(about = "Runs a Strata P2P transport and logs received messages")]
#[command(version)]
pub struct Cli {
    /// P2P listen address (host:port).
    #[arg(long, default_value = "0.0.0.0:3000")]
    pub listen: String,

    /// Comma-separated list of peers to dial on startup.
    #[arg(long, value_delimiter = ',')]
    pub seed_nodes: Option<Vec<SocketAddr>>,

    /// Handshake strategy.
    #[arg(long, value_enum, default_value = "version")]
    pub handshake: HandshakeKind,

    /// Message decoder.
    #[arg(long, value_enum, default_value = "length")]
    pub decoder: DecoderKind,

    /// Largest accepted frame for the length decoder, in bytes.
    #[arg(long, default_value_t = strata_p2p::protocol::MAX_FRAME_SIZE)]
    pub max_frame_size: usize,

    /// Handshake deadline in seconds (no deadline when omitted).
    #[arg(long)]
    pub handshake_timeout: Option<u64>,

    /// Keep the existing peer when a second connection arrives from the same address.
    #[arg(long)]
    pub reject_duplicates: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cli = Cli::parse_from(["strata-node"]);
        assert_eq!(cli.listen, "0.0.0.0:3000");
        assert_eq!(cli.handshake, HandshakeKind::Version);
        assert_eq!(cli.decoder, DecoderKind::Length);
        assert!(cli.handshake_timeout.is_none());
        assert!(!cli.reject_duplicates);
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_seed_nodes() {
        let cli = Cli::parse_from([
            "strata-node",
            "--seed-nodes",
            "127.0.0.1:3000,192.168.1.1:3000",
        ]);
        let seeds = cli.seed_nodes.unwrap();
        assert_eq!(seeds.len(), 2);
    }

    #[test]
    fn test_collaborator_flags() {
        let cli = Cli::parse_from(["strata-node", "--handshake", "nop", "--decoder", "raw"]);
        assert_eq!(cli.handshake, HandshakeKind::Nop);
        assert_eq!(cli.decoder, DecoderKind::Raw);
    }
}
