//! Node orchestration.
//!
//! Runs one transport, dials the configured seed peers and logs every
//! delivered message until a shutdown signal arrives.

use tokio::sync::mpsc;

use strata_p2p::{
    Decoder, Handshake, LengthPrefixedDecoder, Message, NopHandshake, RawDecoder, TcpTransport,
    TransportEvent, VersionHandshake,
};

use crate::cli::{DecoderKind, HandshakeKind};
use crate::config::NodeConfig;
use crate::shutdown::wait_for_shutdown_signal;

/// A running Strata node.
pub struct Node {
    config: NodeConfig,
    transport: TcpTransport,
    messages: mpsc::Receiver<Message>,
    events: mpsc::Receiver<TransportEvent>,
}

impl Node {
    /// Create a new node from configuration.
    pub fn new(config: NodeConfig) -> Self {
        let (transport, messages) = build_transport(&config);
        let events = transport.event_receiver();

        Self {
            config,
            transport,
            messages,
            events,
        }
    }

    /// Run the node until a shutdown signal arrives.
    pub async fn run(mut self) -> anyhow::Result<()> {
        self.transport.listen_and_accept().await?;

        for seed in &self.config.seed_nodes {
            match self.transport.dial(*seed).await {
                Ok(peer_id) => tracing::info!(addr = %seed, peer = %peer_id, "Dialed seed node"),
                Err(e) => tracing::warn!(addr = %seed, error = %e, "Failed to dial seed node"),
            }
        }

        let shutdown = wait_for_shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = &mut shutdown => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Failed to listen for shutdown signal");
                    }
                    break;
                }
                Some(message) = self.messages.recv() => {
                    tracing::info!(
                        from = %message.from(),
                        len = message.payload().len(),
                        "Received message"
                    );
                }
                Some(event) = self.events.recv() => log_event(&event),
            }
        }

        tracing::info!("Shutting down...");
        self.transport.close().await?;
        tracing::info!("Node shutdown complete");

        Ok(())
    }
}

fn log_event(event: &TransportEvent) {
    match event {
        TransportEvent::Connected { peer_id, addr, direction } => {
            tracing::debug!(peer = %peer_id, addr = %addr, direction = %direction, "Peer up");
        }
        TransportEvent::Disconnected { peer_id, addr, reason } => {
            tracing::debug!(peer = %peer_id, addr = %addr, reason = %reason, "Peer down");
        }
        TransportEvent::HandshakeFailed { peer_id, addr, error } => {
            tracing::debug!(peer = %peer_id, addr = %addr, error = %error, "Peer refused");
        }
    }
}

fn build_transport(config: &NodeConfig) -> (TcpTransport, mpsc::Receiver<Message>) {
    match config.handshake {
        HandshakeKind::Nop => with_decoder(config, NopHandshake),
        HandshakeKind::Version => with_decoder(config, VersionHandshake::default()),
    }
}

fn with_decoder<H>(config: &NodeConfig, handshake: H) -> (TcpTransport, mpsc::Receiver<Message>)
where
    H: Handshake + 'static,
{
    match config.decoder {
        DecoderKind::Length => with_parts(
            config,
            handshake,
            LengthPrefixedDecoder::new(config.max_frame_size),
        ),
        DecoderKind::Raw => with_parts(config, handshake, RawDecoder::default()),
    }
}

fn with_parts<H, D>(
    config: &NodeConfig,
    handshake: H,
    decoder: D,
) -> (TcpTransport, mpsc::Receiver<Message>)
where
    H: Handshake + 'static,
    D: Decoder + 'static,
{
    TcpTransport::with_channel(config.transport_config(), handshake, decoder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_every_combination() {
        for handshake in [HandshakeKind::Nop, HandshakeKind::Version] {
            for decoder in [DecoderKind::Length, DecoderKind::Raw] {
                let config = NodeConfig {
                    listen_addr: "127.0.0.1:0".to_string(),
                    handshake,
                    decoder,
                    ..NodeConfig::default()
                };
                let node = Node::new(config);
                node.transport.listen_and_accept().await.unwrap();
                assert!(node.transport.local_addr().is_some());
                node.transport.close().await.unwrap();
            }
        }
    }
}
