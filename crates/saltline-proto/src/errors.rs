//! Error types for wire-format parsing and validation.

use thiserror::Error;

/// Errors raised while encoding or decoding frame payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Frame payload had no kind byte.
    ///
    /// Zero-length payloads are legal at the transport layer but carry no
    /// type tag, so the session layer cannot interpret them.
    #[error("empty frame payload")]
    EmptyFrame,

    /// Frame carried a kind byte this implementation does not know.
    ///
    /// Fatal: the kind byte is first-class protocol surface, so an
    /// unknown value means a broken or hostile peer, not ciphertext.
    #[error("unknown frame kind: {kind:#04x}")]
    UnknownFrameKind {
        /// The unrecognized kind byte.
        kind: u8,
    },

    /// Rekey body was not exactly the marker followed by a salt.
    ///
    /// Fatal for the connection: a peer that emits a broken rekey frame
    /// can no longer be assumed to share our key schedule.
    #[error("malformed rekey payload: {len} bytes")]
    MalformedRekey {
        /// Length of the offending body.
        len: usize,
    },

    /// Frame payload exceeds [`MAX_FRAME_LEN`](crate::MAX_FRAME_LEN).
    #[error("frame too large: {len} bytes, max {max}")]
    FrameTooLarge {
        /// Claimed or actual payload length.
        len: usize,
        /// The protocol maximum.
        max: usize,
    },
}
