//! Registry of connected peers.
//!
//! Maps remote addresses to live peers. Shared by the accept loop and every
//! connection handler of one transport, guarded by a single reader/writer
//! lock that is never held across an `.await`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{P2pError, P2pResult};
use crate::peer::{Peer, PeerId};

/// Shared handle to a registered peer.
pub type PeerHandle = Arc<dyn Peer>;

/// Concurrency-safe address -> peer map.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<SocketAddr, PeerHandle>>,
}

impl PeerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a peer, replacing any peer registered for the same address.
    ///
    /// Returns the evicted peer so the caller can close it.
    pub fn add(&self, peer: PeerHandle) -> Option<PeerHandle> {
        let addr = peer.remote_addr();
        self.peers.write().insert(addr, peer)
    }

    /// Insert a peer only if its address is not registered yet.
    pub fn try_add(&self, peer: PeerHandle) -> P2pResult<()> {
        let addr = peer.remote_addr();
        let mut peers = self.peers.write();
        if peers.contains_key(&addr) {
            return Err(P2pError::AlreadyConnected { addr });
        }
        peers.insert(addr, peer);
        Ok(())
    }

    /// Remove whatever peer is registered for `addr`.
    pub fn remove(&self, addr: &SocketAddr) -> Option<PeerHandle> {
        self.peers.write().remove(addr)
    }

    /// Remove the entry for `addr` only if it belongs to connection `id`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove_peer(&self, addr: &SocketAddr, id: PeerId) -> bool {
        let mut peers = self.peers.write();
        match peers.get(addr) {
            Some(peer) if peer.id() == id => {
                peers.remove(addr);
                true
            }
            _ => false,
        }
    }

    /// Get the peer registered for an address.
    pub fn get(&self, addr: &SocketAddr) -> Option<PeerHandle> {
        self.peers.read().get(addr).cloned()
    }

    /// Check if an address is registered.
    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.peers.read().contains_key(addr)
    }

    /// Number of registered peers.
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Snapshot of all registered addresses.
    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.peers.read().keys().copied().collect()
    }

    /// Snapshot of all registered peers.
    pub fn peers(&self) -> Vec<PeerHandle> {
        self.peers.read().values().cloned().collect()
    }

    /// Close every registered peer and clear the registry.
    ///
    /// Returns the number of peers closed.
    pub fn close_all(&self) -> usize {
        let mut peers = self.peers.write();
        let count = peers.len();
        for (addr, peer) in peers.drain() {
            if let Err(e) = peer.close() {
                tracing::debug!(addr = %addr, error = %e, "Failed to close peer");
            }
        }
        count
    }
}
