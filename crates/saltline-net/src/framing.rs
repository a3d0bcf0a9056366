//! Length-prefixed framing over async byte streams.
//!
//! Wire format per frame: `u32 big-endian length ‖ payload`. A payload
//! may be empty; a zero length prefix is a legal frame, distinct from
//! stream closure. The salt preamble is the one thing on the wire that
//! is *not* framed — 16 raw bytes exchanged before the first frame.

use bytes::{BufMut, Bytes, BytesMut};
use saltline_proto::{LENGTH_PREFIX_SIZE, MAX_FRAME_LEN, ProtocolError, SALT_SIZE};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::NetError;

/// Reads whole frames from the read half of a stream.
pub struct FramedReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> FramedReader<R> {
    /// Wrap the read half of a stream.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Receive one whole frame payload.
    ///
    /// Blocks until a complete frame has been read. Returns `Ok(None)`
    /// when the peer has closed the stream — whether before the length
    /// prefix or mid-frame; a short read is never surfaced as a partial
    /// payload.
    ///
    /// # Errors
    ///
    /// - `Protocol(FrameTooLarge)` if the length prefix exceeds
    ///   [`MAX_FRAME_LEN`]; rejected before any allocation
    /// - `Io` for stream failures other than clean closure
    pub async fn recv(&mut self) -> Result<Option<Bytes>, NetError> {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        match self.inner.read_exact(&mut prefix).await {
            Ok(_) => {},
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_be_bytes(prefix) as usize;
        if len > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLarge { len, max: MAX_FRAME_LEN }.into());
        }

        let mut payload = BytesMut::zeroed(len);
        match self.inner.read_exact(&mut payload).await {
            Ok(_) => {},
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        tracing::trace!(len, "received frame");
        Ok(Some(payload.freeze()))
    }
}

/// Writes whole frames to the write half of a stream.
pub struct FramedWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FramedWriter<W> {
    /// Wrap the write half of a stream.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Send one payload as a single frame.
    ///
    /// The length prefix and payload are assembled into one buffer and
    /// written with a single `write_all`, so a frame is atomic from the
    /// caller's perspective. Callers must still serialize concurrent
    /// `send`s on the same connection externally.
    ///
    /// # Errors
    ///
    /// - `Protocol(FrameTooLarge)` if the payload exceeds [`MAX_FRAME_LEN`]
    /// - `Io` for stream failures
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), NetError> {
        if payload.len() > MAX_FRAME_LEN {
            return Err(
                ProtocolError::FrameTooLarge { len: payload.len(), max: MAX_FRAME_LEN }.into()
            );
        }

        let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
        buf.put_u32(payload.len() as u32);
        buf.put_slice(payload);

        self.inner.write_all(&buf).await?;
        self.inner.flush().await?;

        tracing::trace!(len = payload.len(), "sent frame");
        Ok(())
    }
}

/// Write the 16-byte salt preamble.
///
/// The initiating peer sends this immediately upon connection
/// establishment, before any framed message.
pub async fn write_preamble<W: AsyncWrite + Unpin>(
    writer: &mut W,
    salt: &[u8; SALT_SIZE],
) -> Result<(), NetError> {
    writer.write_all(salt).await?;
    writer.flush().await?;
    Ok(())
}

/// Read exactly the 16-byte salt preamble.
///
/// # Errors
///
/// - `ClosedDuringHandshake` if the peer closes before all 16 bytes arrive
pub async fn read_preamble<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<[u8; SALT_SIZE], NetError> {
    let mut salt = [0u8; SALT_SIZE];
    match reader.read_exact(&mut salt).await {
        Ok(_) => Ok(salt),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(NetError::ClosedDuringHandshake)
        },
        Err(e) => Err(e.into()),
    }
}
