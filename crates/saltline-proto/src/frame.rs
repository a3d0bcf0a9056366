//! Frame payloads: explicit kind tag plus body.
//!
//! A `Frame` here is the *payload* of one transport frame — the bytes
//! between the length prefix and the next frame. Encoding and decoding
//! enforce the size limit at both ends, mirroring the validation the
//! receiver performs before allocating.

use bytes::{BufMut, Bytes};

use crate::{Result, errors::ProtocolError};

/// Size of the transport's length prefix (u32 big-endian).
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Maximum frame payload length (16 MiB).
///
/// Bounds memory use against a malicious or corrupted peer; receivers
/// reject larger length prefixes before allocating.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Salt length on the wire (preamble and rekey bodies).
pub const SALT_SIZE: usize = 16;

/// ASCII marker opening every rekey body.
pub const REKEY_MARKER: &[u8; 9] = b"__REKEY__";

/// Exact length of a rekey body: marker plus salt.
const REKEY_BODY_LEN: usize = REKEY_MARKER.len() + SALT_SIZE;

/// Frame payload type tag.
///
/// Serialized as the first byte of every frame payload. Unknown values
/// are rejected with [`ProtocolError::UnknownFrameKind`]; there is no
/// default interpretation for an unrecognized tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    /// AEAD envelope carrying one encrypted application message.
    Ciphertext = 0,
    /// Key-rotation announcement carrying a new salt in the clear.
    Rekey = 1,
}

impl FrameKind {
    /// Parse a kind byte, rejecting unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ciphertext),
            1 => Some(Self::Rekey),
            _ => None,
        }
    }
}

/// One frame payload: a kind tag and its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: FrameKind,
    body: Bytes,
}

impl Frame {
    /// Build a ciphertext frame around an AEAD envelope.
    pub fn ciphertext(envelope: impl Into<Bytes>) -> Self {
        Self { kind: FrameKind::Ciphertext, body: envelope.into() }
    }

    /// Build a rekey frame announcing a new salt.
    pub fn rekey(salt: &[u8; SALT_SIZE]) -> Self {
        let mut body = Vec::with_capacity(REKEY_BODY_LEN);
        body.extend_from_slice(REKEY_MARKER);
        body.extend_from_slice(salt);
        Self { kind: FrameKind::Rekey, body: Bytes::from(body) }
    }

    /// The frame's kind tag.
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// The frame body (everything after the kind byte).
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Extract the salt from a rekey frame, validating the body strictly.
    ///
    /// # Errors
    ///
    /// - `MalformedRekey` if this is not a rekey frame, or the body is not
    ///   exactly the marker followed by a 16-byte salt
    pub fn rekey_salt(&self) -> Result<[u8; SALT_SIZE]> {
        if self.kind != FrameKind::Rekey
            || self.body.len() != REKEY_BODY_LEN
            || &self.body[..REKEY_MARKER.len()] != REKEY_MARKER
        {
            return Err(ProtocolError::MalformedRekey { len: self.body.len() });
        }

        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&self.body[REKEY_MARKER.len()..]);
        Ok(salt)
    }

    /// Total encoded payload length (kind byte plus body).
    pub fn encoded_len(&self) -> usize {
        1 + self.body.len()
    }

    /// Encode into a buffer as `kind ‖ body`.
    ///
    /// The transport's length prefix is not written here; the caller
    /// frames the result.
    ///
    /// # Errors
    ///
    /// - `FrameTooLarge` if the encoded payload exceeds [`MAX_FRAME_LEN`]
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.encoded_len() > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLarge {
                len: self.encoded_len(),
                max: MAX_FRAME_LEN,
            });
        }

        dst.put_u8(self.kind as u8);
        dst.put_slice(&self.body);
        Ok(())
    }

    /// Encode into a fresh byte vector.
    ///
    /// # Errors
    ///
    /// - `FrameTooLarge` if the encoded payload exceeds [`MAX_FRAME_LEN`]
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decode one frame payload as delivered by the transport.
    ///
    /// # Errors
    ///
    /// - `EmptyFrame` if the payload has no kind byte
    /// - `UnknownFrameKind` for an unrecognized tag
    /// - `FrameTooLarge` if the payload exceeds [`MAX_FRAME_LEN`]
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLarge { len: payload.len(), max: MAX_FRAME_LEN });
        }

        let Some((&kind_byte, body)) = payload.split_first() else {
            return Err(ProtocolError::EmptyFrame);
        };

        let kind = FrameKind::from_u8(kind_byte)
            .ok_or(ProtocolError::UnknownFrameKind { kind: kind_byte })?;

        Ok(Self { kind, body: Bytes::copy_from_slice(body) })
    }
}
