//! Peer backed by a TCP stream.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{P2pError, P2pResult};
use crate::peer::{ConnectionDirection, Peer, PeerId};

/// A remote node connected over TCP.
///
/// The connection handler owns the read half; the peer holds the write half
/// once the handshake has completed.
#[derive(Debug)]
pub struct TcpPeer {
    id: PeerId,
    addr: SocketAddr,
    direction: ConnectionDirection,
    connected_at: Instant,
    writer: Mutex<Option<OwnedWriteHalf>>,
    closed: CancellationToken,
    close_requested: AtomicBool,
}

impl TcpPeer {
    /// Create a peer whose close signal is a child of `shutdown`.
    pub(crate) fn new(
        id: PeerId,
        addr: SocketAddr,
        direction: ConnectionDirection,
        shutdown: &CancellationToken,
    ) -> Self {
        Self {
            id,
            addr,
            direction,
            connected_at: Instant::now(),
            writer: Mutex::new(None),
            closed: shutdown.child_token(),
            close_requested: AtomicBool::new(false),
        }
    }

    /// Install the write half after a successful handshake.
    pub(crate) async fn attach_writer(&self, writer: OwnedWriteHalf) {
        *self.writer.lock().await = Some(writer);
    }

    /// Take the write half and shut it down.
    pub(crate) async fn shutdown_writer(&self) {
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.shutdown().await {
                tracing::trace!(peer = %self.id, error = %e, "Write half shutdown failed");
            }
        }
    }

    /// Resolves once the peer has been closed locally or the transport is
    /// shutting down.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    /// How long the connection has been open.
    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[async_trait]
impl Peer for TcpPeer {
    fn id(&self) -> PeerId {
        self.id
    }

    fn remote_addr(&self) -> SocketAddr {
        self.addr
    }

    fn direction(&self) -> ConnectionDirection {
        self.direction
    }

    fn close(&self) -> P2pResult<()> {
        if self.close_requested.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.closed.cancel();

        // A writer busy in `send` is released by the handler's teardown.
        if let Ok(mut writer) = self.writer.try_lock() {
            writer.take();
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    async fn send(&self, payload: &[u8]) -> P2pResult<()> {
        let write = async {
            let mut guard = self.writer.lock().await;
            let writer = guard.as_mut().ok_or(P2pError::PeerClosed(self.addr))?;
            writer.write_all(payload).await?;
            Ok(())
        };

        // Closing abandons a write stuck on a peer that stopped reading.
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(P2pError::PeerClosed(self.addr)),
            result = write => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    fn make_peer(shutdown: &CancellationToken) -> TcpPeer {
        TcpPeer::new(
            PeerId::new(1),
            "127.0.0.1:9000".parse().unwrap(),
            ConnectionDirection::Outbound,
            shutdown,
        )
    }

    #[test]
    fn test_close_is_idempotent() {
        let shutdown = CancellationToken::new();
        let peer = make_peer(&shutdown);

        assert!(!peer.is_closed());
        assert!(peer.is_outbound());
        peer.close().unwrap();
        assert!(peer.is_closed());
        peer.close().unwrap();
        assert!(peer.is_closed());
    }

    #[test]
    fn test_shutdown_closes_peer() {
        let shutdown = CancellationToken::new();
        let peer = make_peer(&shutdown);

        shutdown.cancel();
        assert!(peer.is_closed());
    }

    #[tokio::test]
    async fn test_send_without_writer_fails() {
        let shutdown = CancellationToken::new();
        let peer = make_peer(&shutdown);

        let result = peer.send(b"ping").await;
        assert!(matches!(result, Err(P2pError::PeerClosed(_))));
    }

    #[tokio::test]
    async fn test_send_and_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (mut server, _) = listener.accept().await.unwrap();

        let shutdown = CancellationToken::new();
        let peer = TcpPeer::new(PeerId::new(7), addr, ConnectionDirection::Outbound, &shutdown);
        let (_read, write) = client.into_split();
        peer.attach_writer(write).await;

        peer.send(b"hello").await.unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");

        peer.close().unwrap();
        assert!(matches!(peer.send(b"again").await, Err(P2pError::PeerClosed(_))));

        // Write half dropped on close: the server sees EOF.
        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }
}
