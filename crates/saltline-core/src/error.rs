//! Error types for the session layer.
//!
//! Two severities matter to a driver: per-message errors, after which the
//! session continues, and fatal errors, after which the connection is no
//! longer trustworthy. [`SessionError::is_fatal`] encodes the split so
//! drivers never have to pattern-match policy themselves.

use saltline_crypto::CryptoError;
use saltline_proto::ProtocolError;
use thiserror::Error;

/// Errors surfaced by [`Session`](crate::Session) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Key derivation rejected its parameters.
    ///
    /// Fatal: without a derived key there is no session. Never falls back
    /// to an unauthenticated mode.
    #[error("key derivation failed")]
    KeyDerivation,

    /// An inbound envelope failed authentication.
    ///
    /// Recoverable: the message is reported as failed and the session
    /// continues. Expected briefly around an epoch transition when a
    /// ciphertext crosses a rekey frame on the wire.
    #[error("message authentication failed")]
    Authentication,

    /// An inbound ciphertext frame was structurally too short.
    ///
    /// Recoverable per message.
    #[error("malformed frame: {len} bytes, need at least {min}")]
    MalformedFrame {
        /// Actual envelope length.
        len: usize,
        /// Minimum structural length.
        min: usize,
    },

    /// An outbound message would exceed the frame size limit.
    ///
    /// Recoverable: the message is rejected, the session is unaffected.
    #[error("message too large: {len} bytes, max {max}")]
    MessageTooLarge {
        /// Encoded frame payload length the message would need.
        len: usize,
        /// The protocol maximum.
        max: usize,
    },

    /// The peer violated the protocol.
    ///
    /// Fatal for the connection: empty or unknown-kind frames, oversized
    /// length claims, and malformed rekey bodies all mean the peer is
    /// broken or hostile.
    #[error("protocol violation: {0}")]
    ProtocolViolation(#[from] ProtocolError),
}

impl SessionError {
    /// Whether this error ends the connection.
    ///
    /// Non-fatal errors describe a single failed message; the session
    /// keeps running and later frames may still decrypt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::KeyDerivation | Self::ProtocolViolation(_))
    }
}

impl From<CryptoError> for SessionError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::KeyDerivation => Self::KeyDerivation,
            CryptoError::Authentication => Self::Authentication,
            CryptoError::MalformedEnvelope { len, min } => Self::MalformedFrame { len, min },
        }
    }
}
