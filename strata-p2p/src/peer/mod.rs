//! Remote peers.
//!
//! This module provides:
//! - Peer identification and connection direction
//! - The [`Peer`] capability shared by the registry and the application
//! - [`TcpPeer`], the peer backed by a live TCP stream

pub mod info;
pub mod tcp;

use std::fmt;
use std::net::SocketAddr;

use async_trait::async_trait;

use crate::error::P2pResult;

// Re-export main types
pub use info::{ConnectionDirection, PeerId};
pub use tcp::TcpPeer;

/// A single remote connection.
#[async_trait]
pub trait Peer: Send + Sync + fmt::Debug {
    /// Connection identifier.
    fn id(&self) -> PeerId;

    /// Remote socket address.
    fn remote_addr(&self) -> SocketAddr;

    /// Who initiated the connection.
    fn direction(&self) -> ConnectionDirection;

    /// Check if this is an outbound connection.
    fn is_outbound(&self) -> bool {
        self.direction().is_outbound()
    }

    /// Release the connection.
    ///
    /// Only the first call has an effect. Every pending read on the
    /// connection observes a locally closed connection afterwards.
    fn close(&self) -> P2pResult<()>;

    /// Whether [`close`](Peer::close) has been called.
    fn is_closed(&self) -> bool;

    /// Write raw bytes to the peer.
    async fn send(&self, payload: &[u8]) -> P2pResult<()>;
}
