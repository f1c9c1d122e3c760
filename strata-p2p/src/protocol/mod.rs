//! Pluggable protocol collaborators.
//!
//! This module contains:
//! - The [`Handshake`] capability plus the no-op and version handshakes
//! - The [`Decoder`] capability plus length-prefixed and raw decoders

pub mod framing;
pub mod handshake;

use tokio::io::{AsyncRead, AsyncWrite};

// Re-export main types
pub use framing::{
    encode_frame, Decoder, FrameCodec, LengthPrefixedDecoder, RawDecoder, MAX_FRAME_SIZE,
};
pub use handshake::{Handshake, Hello, NopHandshake, VersionHandshake, NETWORK_MAGIC, PROTOCOL_VERSION};

/// A full-duplex byte stream, as seen by a handshake.
pub trait Connection: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + ?Sized> Connection for T {}

/// The read side of a connection, as seen by a decoder.
pub trait ConnectionReader: AsyncRead + Unpin + Send {}

impl<T: AsyncRead + Unpin + Send + ?Sized> ConnectionReader for T {}
