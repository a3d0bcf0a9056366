//! Error types for Saltline cryptographic operations.

use thiserror::Error;

/// Errors from key derivation and envelope operations.
///
/// Failures here never fall back to a weaker mode: a derivation or
/// authentication failure yields an error and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The key derivation function rejected its parameters.
    ///
    /// Fatal. With the fixed protocol parameters this indicates a broken
    /// build or library, not bad peer input.
    #[error("key derivation failed")]
    KeyDerivation,

    /// The authentication tag did not verify.
    ///
    /// The envelope was forged, corrupted, or encrypted under a different
    /// key (e.g. a stale epoch). Recoverable per message.
    #[error("envelope authentication failed")]
    Authentication,

    /// The envelope is too short to contain a nonce and tag.
    ///
    /// Recoverable per message.
    #[error("malformed envelope: {len} bytes, need at least {min}")]
    MalformedEnvelope {
        /// Actual envelope length.
        len: usize,
        /// Minimum structural length (nonce + tag).
        min: usize,
    },
}
