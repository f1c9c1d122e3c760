//! TCP transport.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::TransportConfig;
use crate::error::{P2pError, P2pResult};
use crate::message::Message;
use crate::peer::{ConnectionDirection, PeerId, TcpPeer};
use crate::protocol::{Decoder, Handshake};
use crate::registry::{PeerHandle, PeerRegistry};
use crate::sink::MessageSink;
use crate::transport::{connection, Transport, TransportEvent};

/// Capacity of the lifecycle event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// State shared by the transport handle, the accept loop, and every
/// connection handler.
pub(crate) struct Shared {
    pub(crate) config: TransportConfig,
    pub(crate) registry: PeerRegistry,
    pub(crate) handshake: Arc<dyn Handshake>,
    pub(crate) decoder: Arc<dyn Decoder>,
    pub(crate) sink: Arc<dyn MessageSink>,
    pub(crate) shutdown: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    next_peer_id: AtomicU64,
    events: Mutex<Option<mpsc::Sender<TransportEvent>>>,
}

impl Shared {
    /// Send a lifecycle event without blocking; dropped if the observer lags.
    pub(crate) fn emit(&self, event: TransportEvent) {
        let tx = self.events.lock().clone();
        if let Some(tx) = tx {
            if let Err(e) = tx.try_send(event) {
                tracing::trace!(error = %e, "Dropped transport event");
            }
        }
    }

    /// Wrap a fresh connection in a peer and spawn its handler.
    fn spawn_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        addr: SocketAddr,
        direction: ConnectionDirection,
    ) -> PeerId {
        if self.config.nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::warn!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let peer_id = PeerId::new(self.next_peer_id.fetch_add(1, Ordering::Relaxed));
        let peer = Arc::new(TcpPeer::new(peer_id, addr, direction, &self.shutdown));

        tokio::spawn(connection::run_connection(self.clone(), peer, stream));
        peer_id
    }
}

/// Peer-to-peer transport over TCP.
///
/// Cheap to clone; all clones drive the same listener and registry.
#[derive(Clone)]
pub struct TcpTransport {
    pub(crate) shared: Arc<Shared>,
}

impl TcpTransport {
    /// Create a transport delivering decoded messages to `sink`.
    pub fn new(
        config: TransportConfig,
        handshake: impl Handshake + 'static,
        decoder: impl Decoder + 'static,
        sink: impl MessageSink + 'static,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                registry: PeerRegistry::new(),
                handshake: Arc::new(handshake),
                decoder: Arc::new(decoder),
                sink: Arc::new(sink),
                shutdown: CancellationToken::new(),
                local_addr: Mutex::new(None),
                accept_task: Mutex::new(None),
                next_peer_id: AtomicU64::new(1),
                events: Mutex::new(None),
            }),
        }
    }

    /// Create a transport together with a bounded message channel of
    /// `config.sink_capacity`.
    pub fn with_channel(
        config: TransportConfig,
        handshake: impl Handshake + 'static,
        decoder: impl Decoder + 'static,
    ) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(config.sink_capacity.max(1));
        (Self::new(config, handshake, decoder, tx), rx)
    }

    /// Get a receiver for lifecycle events.
    ///
    /// Install it before listening or dialing to observe every connection.
    pub fn event_receiver(&self) -> mpsc::Receiver<TransportEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        *self.shared.events.lock() = Some(tx);
        rx
    }

    /// Get the transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.shared.config
    }

    /// Address the listener is bound to, once listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.shared.local_addr.lock()
    }

    /// Bind the configured address and spawn the accept loop.
    ///
    /// Returns as soon as the listener is bound. A bind failure is returned
    /// here and nothing is spawned.
    pub async fn listen_and_accept(&self) -> P2pResult<()> {
        if self.shared.shutdown.is_cancelled() {
            return Err(P2pError::Shutdown);
        }
        if let Some(addr) = self.local_addr() {
            return Err(P2pError::AlreadyListening { addr });
        }

        let listen_addr = &self.shared.config.listen_addr;
        let listener = TcpListener::bind(listen_addr.as_str())
            .await
            .map_err(|source| P2pError::Bind {
                addr: listen_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        {
            let mut slot = self.shared.local_addr.lock();
            if let Some(addr) = *slot {
                return Err(P2pError::AlreadyListening { addr });
            }
            *slot = Some(local_addr);
        }

        tracing::info!(addr = %local_addr, "Transport listening");

        let handle = tokio::spawn(accept_loop(self.shared.clone(), listener));
        *self.shared.accept_task.lock() = Some(handle);
        Ok(())
    }

    /// Connect to a remote node.
    ///
    /// Returns once the TCP connection is established; the handshake and
    /// registration continue in the connection's own task.
    pub async fn dial(&self, addr: SocketAddr) -> P2pResult<PeerId> {
        if self.shared.shutdown.is_cancelled() {
            return Err(P2pError::Shutdown);
        }

        tracing::debug!(addr = %addr, "Dialing peer");

        let stream = match timeout(self.shared.config.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(P2pError::Io(e)),
            Err(_) => return Err(P2pError::ConnectionTimeout { addr }),
        };
        let remote = stream.peer_addr()?;

        Ok(self
            .shared
            .spawn_connection(stream, remote, ConnectionDirection::Outbound))
    }

    /// Write raw bytes to a registered peer.
    pub async fn send(&self, addr: &SocketAddr, payload: &[u8]) -> P2pResult<()> {
        let peer = self
            .shared
            .registry
            .get(addr)
            .ok_or(P2pError::PeerNotFound(*addr))?;
        peer.send(payload).await
    }

    /// Get the peer registered for an address.
    pub fn peer(&self, addr: &SocketAddr) -> Option<PeerHandle> {
        self.shared.registry.get(addr)
    }

    /// Addresses of all registered peers.
    pub fn peer_addrs(&self) -> Vec<SocketAddr> {
        self.shared.registry.addrs()
    }

    /// Number of registered peers.
    pub fn peer_count(&self) -> usize {
        self.shared.registry.len()
    }

    /// Stop the accept loop, then close and unregister every peer.
    pub async fn close(&self) -> P2pResult<()> {
        self.shared.shutdown.cancel();

        let task = self.shared.accept_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Accept loop ended abnormally");
            }
        }

        let closed = self.shared.registry.close_all();
        *self.shared.local_addr.lock() = None;

        tracing::info!(peers = closed, "Transport closed");
        Ok(())
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn listen_and_accept(&self) -> P2pResult<()> {
        TcpTransport::listen_and_accept(self).await
    }

    async fn dial(&self, addr: SocketAddr) -> P2pResult<PeerId> {
        TcpTransport::dial(self, addr).await
    }

    async fn close(&self) -> P2pResult<()> {
        TcpTransport::close(self).await
    }
}

/// Accept inbound connections until the transport shuts down.
async fn accept_loop(shared: Arc<Shared>, listener: TcpListener) {
    loop {
        tokio::select! {
            _ = shared.shutdown.cancelled() => {
                tracing::info!("Accept loop shutting down");
                break;
            }

            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        let peer_id = shared.spawn_connection(stream, addr, ConnectionDirection::Inbound);
                        tracing::debug!(peer = %peer_id, addr = %addr, "Accepted inbound connection");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Error accepting connection");
                    }
                }
            }
        }
    }
}
