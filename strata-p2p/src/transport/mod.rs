//! Transports.
//!
//! A transport owns the listening socket and the lifecycle of every peer
//! connected through it:
//!
//! ```text
//! Connecting -> Handshaking -> Rejected
//!                           -> Registered -> Decoding -> Closed
//! ```
//!
//! Decoding repeats once per delivered message; every exit from it is
//! terminal for the connection.

mod connection;
pub mod tcp;

use std::fmt;
use std::net::SocketAddr;

use async_trait::async_trait;

use crate::error::P2pResult;
use crate::peer::{ConnectionDirection, PeerId};

pub use tcp::TcpTransport;

/// Uniform transport capability.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Bind the listener and start accepting connections in the background.
    async fn listen_and_accept(&self) -> P2pResult<()>;

    /// Open an outbound connection.
    async fn dial(&self, addr: SocketAddr) -> P2pResult<PeerId>;

    /// Stop accepting and close every peer.
    async fn close(&self) -> P2pResult<()>;
}

/// Why a registered connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The remote end closed the stream between messages.
    RemoteClosed,
    /// The peer or the transport was closed locally.
    LocalClosed,
    /// Another connection already holds this address.
    Duplicate,
    /// The decoder rejected the byte stream.
    Decode(String),
    /// Reading from the socket failed.
    Io(String),
    /// The application stopped consuming messages.
    SinkClosed,
}

impl DisconnectReason {
    /// Whether the connection ended without a failure.
    pub fn is_clean(&self) -> bool {
        matches!(self, DisconnectReason::RemoteClosed | DisconnectReason::LocalClosed)
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::RemoteClosed => write!(f, "closed by remote"),
            DisconnectReason::LocalClosed => write!(f, "closed locally"),
            DisconnectReason::Duplicate => write!(f, "duplicate address"),
            DisconnectReason::Decode(e) => write!(f, "decode error: {}", e),
            DisconnectReason::Io(e) => write!(f, "I/O error: {}", e),
            DisconnectReason::SinkClosed => write!(f, "message sink closed"),
        }
    }
}

/// Lifecycle notification sent to an observer.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Handshake succeeded and the peer was registered.
    Connected {
        peer_id: PeerId,
        addr: SocketAddr,
        direction: ConnectionDirection,
    },
    /// A connection ended after the handshake.
    Disconnected {
        peer_id: PeerId,
        addr: SocketAddr,
        reason: DisconnectReason,
    },
    /// The handshake rejected the connection.
    HandshakeFailed {
        peer_id: PeerId,
        addr: SocketAddr,
        error: String,
    },
}

impl TransportEvent {
    /// Address of the peer the event refers to.
    pub fn addr(&self) -> SocketAddr {
        match self {
            TransportEvent::Connected { addr, .. }
            | TransportEvent::Disconnected { addr, .. }
            | TransportEvent::HandshakeFailed { addr, .. } => *addr,
        }
    }
}
