//! Message decoders.
//!
//! Length-prefixed frames are laid out as:
//! - 4 bytes: big-endian payload length
//! - N bytes: payload

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::AsyncReadExt;
use tokio_util::codec;

use crate::error::DecodeError;
use crate::protocol::ConnectionReader;

/// Maximum frame payload size in bytes (1 MB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Default read buffer size of [`RawDecoder`].
pub const DEFAULT_RAW_BUFFER_SIZE: usize = 1028;

/// Header size: 4 bytes length.
const HEADER_SIZE: usize = 4;

/// Turns a byte stream into discrete message payloads.
///
/// Called repeatedly on the same connection; each call consumes exactly the
/// bytes of one message. Any error ends the connection.
#[async_trait]
pub trait Decoder: Send + Sync {
    /// Read one message payload from `reader`.
    async fn decode(&self, reader: &mut dyn ConnectionReader) -> Result<Bytes, DecodeError>;
}

/// Encode a payload as a length-prefixed frame.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, DecodeError> {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    codec::Encoder::encode(&mut FrameCodec::default(), payload, &mut buf)?;
    Ok(buf.freeze())
}

fn frame_length(header: [u8; HEADER_SIZE], max: usize) -> Result<usize, DecodeError> {
    let length = u32::from_be_bytes(header) as usize;
    if length > max {
        return Err(DecodeError::FrameTooLarge { size: length, max });
    }
    Ok(length)
}

/// Read until `buf` is full or the stream ends. Returns the bytes read.
async fn read_full(reader: &mut dyn ConnectionReader, buf: &mut [u8]) -> Result<usize, DecodeError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Decoder for length-prefixed frames.
#[derive(Debug, Clone, Copy)]
pub struct LengthPrefixedDecoder {
    max_frame_size: usize,
}

impl Default for LengthPrefixedDecoder {
    fn default() -> Self {
        Self::new(MAX_FRAME_SIZE)
    }
}

impl LengthPrefixedDecoder {
    /// Create a decoder rejecting frames larger than `max_frame_size`.
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Largest accepted payload.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

#[async_trait]
impl Decoder for LengthPrefixedDecoder {
    async fn decode(&self, reader: &mut dyn ConnectionReader) -> Result<Bytes, DecodeError> {
        let mut header = [0u8; HEADER_SIZE];
        match read_full(reader, &mut header).await? {
            0 => return Err(DecodeError::Eof),
            HEADER_SIZE => {}
            read => {
                return Err(DecodeError::Truncated {
                    read,
                    expected: HEADER_SIZE,
                })
            }
        }

        let length = frame_length(header, self.max_frame_size)?;
        let mut payload = BytesMut::zeroed(length);
        let read = read_full(reader, &mut payload).await?;
        if read < length {
            return Err(DecodeError::Truncated {
                read,
                expected: length,
            });
        }

        Ok(payload.freeze())
    }
}

/// Delivers whatever a single read returns, up to the buffer size.
///
/// Performs no framing: message boundaries follow TCP segmentation.
#[derive(Debug, Clone, Copy)]
pub struct RawDecoder {
    buffer_size: usize,
}

impl Default for RawDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_RAW_BUFFER_SIZE)
    }
}

impl RawDecoder {
    /// Create a decoder reading at most `buffer_size` bytes per message.
    pub fn new(buffer_size: usize) -> Self {
        Self { buffer_size }
    }
}

#[async_trait]
impl Decoder for RawDecoder {
    async fn decode(&self, reader: &mut dyn ConnectionReader) -> Result<Bytes, DecodeError> {
        let mut buf = BytesMut::zeroed(self.buffer_size);
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Err(DecodeError::Eof);
        }
        buf.truncate(n);
        Ok(buf.freeze())
    }
}

/// `tokio_util` encoder for length-prefixed frames, for applications that
/// drive a `FramedWrite` on the sending side.
#[derive(Debug)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(MAX_FRAME_SIZE)
    }
}

impl FrameCodec {
    /// Create a codec with the given frame size limit.
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl codec::Encoder<&[u8]> for FrameCodec {
    type Error = DecodeError;

    fn encode(&mut self, payload: &[u8], dst: &mut BytesMut) -> Result<(), DecodeError> {
        if payload.len() > self.max_frame_size || payload.len() > u32::MAX as usize {
            return Err(DecodeError::FrameTooLarge {
                size: payload.len(),
                max: self.max_frame_size,
            });
        }

        dst.reserve(HEADER_SIZE + payload.len());
        dst.put_u32(payload.len() as u32);
        dst.put_slice(payload);
        Ok(())
    }
}
