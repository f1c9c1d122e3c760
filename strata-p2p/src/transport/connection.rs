//! Per-connection handler: handshake, registration, decode loop, teardown.

use std::sync::Arc;

use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::DuplicatePolicy;
use crate::error::{DecodeError, HandshakeError};
use crate::message::Message;
use crate::peer::{Peer, TcpPeer};
use crate::registry::PeerHandle;
use crate::transport::tcp::Shared;
use crate::transport::{DisconnectReason, TransportEvent};

/// Drive one connection from handshake to close.
pub(crate) async fn run_connection(shared: Arc<Shared>, peer: Arc<TcpPeer>, mut stream: TcpStream) {
    let peer_id = peer.id();
    let addr = peer.remote_addr();

    if let Err(e) = run_handshake(&shared, &peer, &mut stream).await {
        let _ = peer.close();
        tracing::warn!(peer = %peer_id, addr = %addr, error = %e, "Handshake failed");
        shared.emit(TransportEvent::HandshakeFailed {
            peer_id,
            addr,
            error: e.to_string(),
        });
        return;
    }

    let (mut reader, writer) = stream.into_split();
    peer.attach_writer(writer).await;

    if let Err(reason) = register(&shared, &peer) {
        let _ = peer.close();
        peer.shutdown_writer().await;
        shared.emit(TransportEvent::Disconnected {
            peer_id,
            addr,
            reason,
        });
        return;
    }

    tracing::info!(
        peer = %peer_id,
        addr = %addr,
        direction = %peer.direction(),
        "Peer connected"
    );
    shared.emit(TransportEvent::Connected {
        peer_id,
        addr,
        direction: peer.direction(),
    });

    let reason = read_loop(&shared, &peer, &mut reader).await;

    shared.registry.remove_peer(&addr, peer_id);
    let _ = peer.close();
    drop(reader);
    peer.shutdown_writer().await;

    let secs = peer.connection_duration().as_secs();
    if reason.is_clean() {
        tracing::debug!(peer = %peer_id, addr = %addr, %reason, secs, "Peer disconnected");
    } else {
        tracing::warn!(peer = %peer_id, addr = %addr, %reason, secs, "Peer disconnected");
    }
    shared.emit(TransportEvent::Disconnected {
        peer_id,
        addr,
        reason,
    });
}

/// Run the configured handshake, bounded by the optional deadline and the
/// peer's close signal.
async fn run_handshake(
    shared: &Shared,
    peer: &TcpPeer,
    stream: &mut TcpStream,
) -> Result<(), HandshakeError> {
    let handshake = shared.handshake.handshake(peer, stream);
    let bounded = async {
        match shared.config.handshake_timeout {
            Some(deadline) => timeout(deadline, handshake)
                .await
                .unwrap_or(Err(HandshakeError::Timeout)),
            None => handshake.await,
        }
    };

    tokio::select! {
        biased;
        _ = peer.closed() => Err(HandshakeError::Closed),
        result = bounded => result,
    }
}

/// Insert the peer according to the duplicate policy.
///
/// A peer closed before or while registering is never left in the registry.
fn register(shared: &Shared, peer: &Arc<TcpPeer>) -> Result<(), DisconnectReason> {
    if peer.is_closed() {
        return Err(DisconnectReason::LocalClosed);
    }

    insert(shared, peer)?;

    // The shutdown token is cancelled before the registry is drained.
    if peer.is_closed() {
        shared.registry.remove_peer(&peer.remote_addr(), peer.id());
        return Err(DisconnectReason::LocalClosed);
    }
    Ok(())
}

fn insert(shared: &Shared, peer: &Arc<TcpPeer>) -> Result<(), DisconnectReason> {
    let handle: PeerHandle = peer.clone();

    match shared.config.duplicate_policy {
        DuplicatePolicy::Replace => {
            if let Some(evicted) = shared.registry.add(handle) {
                tracing::info!(
                    addr = %evicted.remote_addr(),
                    old = %evicted.id(),
                    new = %peer.id(),
                    "Replacing existing peer"
                );
                let _ = evicted.close();
            }
            Ok(())
        }
        DuplicatePolicy::Reject => shared.registry.try_add(handle).map_err(|e| {
            tracing::warn!(peer = %peer.id(), error = %e, "Rejecting duplicate connection");
            DisconnectReason::Duplicate
        }),
    }
}

/// Decode messages and hand them to the sink until the connection ends.
async fn read_loop(shared: &Shared, peer: &TcpPeer, reader: &mut OwnedReadHalf) -> DisconnectReason {
    loop {
        let payload = tokio::select! {
            biased;
            _ = peer.closed() => return DisconnectReason::LocalClosed,
            result = shared.decoder.decode(&mut *reader) => match result {
                Ok(payload) => payload,
                Err(DecodeError::Eof) => return DisconnectReason::RemoteClosed,
                Err(DecodeError::Io(e)) => return DisconnectReason::Io(e.to_string()),
                Err(e) => return DisconnectReason::Decode(e.to_string()),
            },
        };

        let message = Message::new(peer.remote_addr(), payload);
        tracing::trace!(peer = %peer.id(), msg = %message, "Received message");

        tokio::select! {
            biased;
            _ = peer.closed() => return DisconnectReason::LocalClosed,
            result = shared.sink.send(message) => {
                if result.is_err() {
                    return DisconnectReason::SinkClosed;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use crate::peer::{ConnectionDirection, PeerId};
    use crate::protocol::{LengthPrefixedDecoder, NopHandshake};
    use crate::transport::TcpTransport;

    fn make_peer(shared: &Shared, id: u64) -> Arc<TcpPeer> {
        Arc::new(TcpPeer::new(
            PeerId::new(id),
            "127.0.0.1:9000".parse().unwrap(),
            ConnectionDirection::Inbound,
            &shared.shutdown,
        ))
    }

    #[tokio::test]
    async fn test_register_after_close_is_refused() {
        let (transport, _rx) = TcpTransport::with_channel(
            TransportConfig::new("127.0.0.1:0"),
            NopHandshake,
            LengthPrefixedDecoder::default(),
        );
        let shared = transport.shared.clone();

        let early = make_peer(&shared, 1);
        assert!(register(&shared, &early).is_ok());
        assert_eq!(shared.registry.len(), 1);

        transport.close().await.unwrap();
        assert!(shared.registry.is_empty());

        // A handshake that completes after close must not repopulate the registry.
        let late = make_peer(&shared, 2);
        assert_eq!(register(&shared, &late), Err(DisconnectReason::LocalClosed));
        assert!(shared.registry.is_empty());
    }

    #[tokio::test]
    async fn test_register_closed_peer_is_refused() {
        let (transport, _rx) = TcpTransport::with_channel(
            TransportConfig::new("127.0.0.1:0"),
            NopHandshake,
            LengthPrefixedDecoder::default(),
        );
        let shared = transport.shared.clone();

        let peer = make_peer(&shared, 1);
        peer.close().unwrap();
        assert_eq!(register(&shared, &peer), Err(DisconnectReason::LocalClosed));
        assert!(shared.registry.is_empty());
    }
}
