//! Pluggable peer-to-peer transport for Strata.
//!
//! This crate accepts and dials TCP connections, runs a pluggable handshake
//! on each, then decodes the byte stream into messages with a pluggable
//! decoder and hands them to the application through a bounded sink. It
//! never interprets message contents.
//!
//! # Architecture
//!
//! Every connection runs in its own tokio task. The registry of connected
//! peers is the only state shared between tasks.
//!
//! ```text
//! TcpTransport::listen_and_accept()
//! ├── Accept Task (accept incoming)
//! ├── Connection Task 1 (handshake, then decode loop)
//! ├── Connection Task 2 (handshake, then decode loop)
//! └── ...               (one per accepted or dialed connection)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use strata_p2p::{LengthPrefixedDecoder, NopHandshake, TcpTransport, TransportConfig};
//!
//! let config = TransportConfig::new("0.0.0.0:3000");
//! let (transport, mut messages) =
//!     TcpTransport::with_channel(config, NopHandshake, LengthPrefixedDecoder::default());
//!
//! transport.listen_and_accept().await?;
//! while let Some(message) = messages.recv().await {
//!     println!("{} sent {} bytes", message.from(), message.payload().len());
//! }
//! ```

pub mod config;
pub mod error;
pub mod message;
pub mod peer;
pub mod protocol;
pub mod registry;
pub mod sink;
pub mod transport;

// Re-export main types
pub use config::{DuplicatePolicy, TransportConfig};
pub use error::{DecodeError, HandshakeError, P2pError, P2pResult, SinkClosed};
pub use message::Message;
pub use peer::{ConnectionDirection, Peer, PeerId, TcpPeer};
pub use protocol::{
    encode_frame, Connection, ConnectionReader, Decoder, Handshake, LengthPrefixedDecoder,
    NopHandshake, RawDecoder, VersionHandshake,
};
pub use registry::{PeerHandle, PeerRegistry};
pub use sink::MessageSink;
pub use transport::{DisconnectReason, TcpTransport, Transport, TransportEvent};
