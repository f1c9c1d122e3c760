//! Handshake strategies.
//!
//! A handshake runs once per connection, before the peer is registered.
//! Returning an error rejects the connection.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::HandshakeError;
use crate::peer::Peer;
use crate::protocol::Connection;

/// Network magic bytes identifying the Strata protocol.
pub const NETWORK_MAGIC: [u8; 4] = [0x53, 0x54, 0x52, 0x41]; // "STRA"

/// Current protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Size of a version hello: magic + version + nonce.
const HELLO_SIZE: usize = 16;

/// Validates a new connection before it is trusted.
#[async_trait]
pub trait Handshake: Send + Sync {
    /// Negotiate with the remote end over `stream`.
    async fn handshake(
        &self,
        peer: &dyn Peer,
        stream: &mut dyn Connection,
    ) -> Result<(), HandshakeError>;
}

/// Accepts every peer without exchanging any bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopHandshake;

#[async_trait]
impl Handshake for NopHandshake {
    async fn handshake(
        &self,
        _peer: &dyn Peer,
        _stream: &mut dyn Connection,
    ) -> Result<(), HandshakeError> {
        Ok(())
    }
}

/// Hello sent by both sides of a [`VersionHandshake`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hello {
    /// Network magic.
    pub magic: [u8; 4],
    /// Protocol version of the sender.
    pub version: u32,
    /// Random per-handshake nonce, used to detect connections to self.
    pub nonce: u64,
}

impl Hello {
    /// Encode as `magic | version (BE) | nonce (BE)`.
    pub fn to_bytes(&self) -> [u8; HELLO_SIZE] {
        let mut buf = [0u8; HELLO_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.version.to_be_bytes());
        buf[8..16].copy_from_slice(&self.nonce.to_be_bytes());
        buf
    }

    /// Decode from the wire layout produced by [`Hello::to_bytes`].
    pub fn from_bytes(buf: &[u8; HELLO_SIZE]) -> Self {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[0..4]);
        let mut version = [0u8; 4];
        version.copy_from_slice(&buf[4..8]);
        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(&buf[8..16]);
        Self {
            magic,
            version: u32::from_be_bytes(version),
            nonce: u64::from_be_bytes(nonce),
        }
    }
}

/// Symmetric version exchange.
///
/// Both sides write a [`Hello`] and read the remote one. The connection is
/// rejected on a magic or version mismatch, or when the remote nonce belongs
/// to one of our own in-flight handshakes (we dialed ourselves).
#[derive(Debug)]
pub struct VersionHandshake {
    magic: [u8; 4],
    version: u32,
    local_nonces: Mutex<HashSet<u64>>,
}

impl Default for VersionHandshake {
    fn default() -> Self {
        Self::new(NETWORK_MAGIC, PROTOCOL_VERSION)
    }
}

impl VersionHandshake {
    /// Create a handshake for the given network magic and protocol version.
    pub fn new(magic: [u8; 4], version: u32) -> Self {
        Self {
            magic,
            version,
            local_nonces: Mutex::new(HashSet::new()),
        }
    }

    fn validate(&self, remote: &Hello) -> Result<(), HandshakeError> {
        if remote.magic != self.magic {
            return Err(HandshakeError::InvalidMagic {
                expected: self.magic,
                actual: remote.magic,
            });
        }

        // For now, require exact match; later could allow compatible ranges
        if remote.version != self.version {
            return Err(HandshakeError::IncompatibleVersion {
                peer_version: remote.version,
                our_version: self.version,
            });
        }

        if self.local_nonces.lock().contains(&remote.nonce) {
            return Err(HandshakeError::SelfConnection);
        }

        Ok(())
    }

    async fn exchange(
        &self,
        local: Hello,
        stream: &mut dyn Connection,
    ) -> Result<Hello, HandshakeError> {
        stream.write_all(&local.to_bytes()).await?;
        stream.flush().await?;

        let mut buf = [0u8; HELLO_SIZE];
        stream.read_exact(&mut buf).await?;
        Ok(Hello::from_bytes(&buf))
    }
}

/// A local nonce that stays in the in-flight set until dropped, including
/// when the handshake future is cancelled mid-exchange.
struct NonceGuard<'a> {
    nonces: &'a Mutex<HashSet<u64>>,
    value: u64,
}

impl<'a> NonceGuard<'a> {
    fn reserve(nonces: &'a Mutex<HashSet<u64>>) -> Self {
        let value = loop {
            let candidate: u64 = rand::random();
            if nonces.lock().insert(candidate) {
                break candidate;
            }
        };
        Self { nonces, value }
    }
}

impl Drop for NonceGuard<'_> {
    fn drop(&mut self) {
        self.nonces.lock().remove(&self.value);
    }
}

#[async_trait]
impl Handshake for VersionHandshake {
    async fn handshake(
        &self,
        peer: &dyn Peer,
        stream: &mut dyn Connection,
    ) -> Result<(), HandshakeError> {
        let nonce = NonceGuard::reserve(&self.local_nonces);

        let local = Hello {
            magic: self.magic,
            version: self.version,
            nonce: nonce.value,
        };

        let result = match self.exchange(local, stream).await {
            Ok(remote) => self.validate(&remote),
            Err(e) => Err(e),
        };
        drop(nonce);

        if result.is_ok() {
            tracing::trace!(peer = %peer.id(), addr = %peer.remote_addr(), "Version handshake complete");
        }
        result
    }
}
