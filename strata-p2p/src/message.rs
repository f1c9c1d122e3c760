//! Messages delivered to the application layer.

use std::fmt;
use std::net::SocketAddr;

use bytes::Bytes;

/// An opaque payload received from a remote node.
///
/// Only the transport constructs messages, so `from` is always the address
/// of the connection the bytes arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    from: SocketAddr,
    payload: Bytes,
}

impl Message {
    pub(crate) fn new(from: SocketAddr, payload: Bytes) -> Self {
        Self { from, payload }
    }

    /// Address of the peer that sent this message.
    pub fn from(&self) -> SocketAddr {
        self.from
    }

    /// The raw payload.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consume the message, returning its payload.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message(from={}, {} bytes)", self.from, self.payload.len())
    }
}
