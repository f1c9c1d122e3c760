//! P2P error types.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum P2pError {
    /// The listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// `listen_and_accept` was called on a transport that is already listening.
    #[error("Transport is already listening on {addr}")]
    AlreadyListening { addr: SocketAddr },

    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Connection timed out.
    #[error("Connection timeout to {addr}")]
    ConnectionTimeout { addr: SocketAddr },

    /// Handshake failed.
    #[error("Handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// Failed to decode a message.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Peer already connected.
    #[error("Already connected to peer: {addr}")]
    AlreadyConnected { addr: SocketAddr },

    /// Peer not found.
    #[error("Peer not found: {0}")]
    PeerNotFound(SocketAddr),

    /// The peer connection has been closed.
    #[error("Peer connection closed: {0}")]
    PeerClosed(SocketAddr),

    /// The application stopped consuming messages.
    #[error(transparent)]
    SinkClosed(#[from] SinkClosed),

    /// Transport is shutting down.
    #[error("Transport shutting down")]
    Shutdown,
}

/// Handshake rejections.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// Rejected by the handshake strategy.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Invalid network magic bytes.
    #[error("Invalid network magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic { expected: [u8; 4], actual: [u8; 4] },

    /// Protocol version incompatible.
    #[error("Incompatible protocol version: {peer_version} (our version: {our_version})")]
    IncompatibleVersion { peer_version: u32, our_version: u32 },

    /// The remote end is this node.
    #[error("Connected to self")]
    SelfConnection,

    /// Handshake timed out.
    #[error("Handshake timeout")]
    Timeout,

    /// The connection was closed locally while the handshake was running.
    #[error("Connection closed during handshake")]
    Closed,

    /// I/O error while exchanging handshake data.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failures produced by a [`Decoder`](crate::protocol::Decoder).
///
/// Every variant is terminal for the connection it came from.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The stream ended cleanly on a message boundary.
    #[error("Connection closed by peer")]
    Eof,

    /// The stream ended in the middle of a message.
    #[error("Stream ended mid-frame: got {read} of {expected} bytes")]
    Truncated { read: usize, expected: usize },

    /// Frame exceeds maximum allowed size.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Bytes could not be interpreted as a message.
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// I/O error while reading.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// Whether the peer closed the connection cleanly.
    pub fn is_eof(&self) -> bool {
        matches!(self, DecodeError::Eof)
    }
}

/// The message sink has been dropped by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Message sink closed")]
pub struct SinkClosed;

/// Result type for P2P operations.
pub type P2pResult<T> = Result<T, P2pError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_display() {
        let err = P2pError::Bind {
            addr: "127.0.0.1:3000".to_string(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };
        assert_eq!(err.to_string(), "Failed to bind 127.0.0.1:3000: address in use");
    }

    #[test]
    fn test_conversions() {
        let err: P2pError = DecodeError::FrameTooLarge { size: 10, max: 5 }.into();
        assert!(matches!(err, P2pError::Decode(DecodeError::FrameTooLarge { .. })));

        let err: P2pError = SinkClosed.into();
        assert_eq!(err.to_string(), "Message sink closed");

        let err: P2pError = HandshakeError::SelfConnection.into();
        assert!(matches!(err, P2pError::Handshake(_)));
    }

    #[test]
    fn test_decode_eof() {
        assert!(DecodeError::Eof.is_eof());
        assert!(!DecodeError::Malformed("x".into()).is_eof());
    }
}
