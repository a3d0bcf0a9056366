//! Saltline Cryptographic Primitives
//!
//! Cryptographic building blocks for Saltline: password-based key
//! derivation and the authenticated envelope format. Deterministic
//! variants take caller-provided randomness so tests can pin nonces.
//!
//! # Key Lifecycle
//!
//! Both peers know a shared passphrase out of band. A non-secret 16-byte
//! salt, exchanged in the clear, makes the derived key unique per epoch.
//! Rotating the key ("rekey") is nothing more than picking a fresh salt
//! and deriving again:
//!
//! ```text
//! Passphrase (shared out of band)
//!        │
//!        ▼
//! PBKDF2-HMAC-SHA256 ◄── Salt (16 bytes, per epoch, sent in clear)
//!        │
//!        ▼
//! Session Key (128-bit, one per epoch)
//!        │
//!        ▼
//! AES-128-GCM → Envelope: nonce(12) ‖ tag(16) ‖ ciphertext
//! ```
//!
//! The derivation parameters (16-byte output, 200,000 iterations,
//! SHA-256) are wire-compatibility constants: two peers disagreeing on
//! any of them derive different keys from the same passphrase and salt.
//!
//! # Security
//!
//! - PBKDF2 with a high iteration count slows offline brute force of the
//!   passphrase; the salt defeats precomputation.
//! - AES-GCM provides confidentiality and integrity in one pass. A failed
//!   tag check yields an error and no plaintext, never partial output.
//! - Nonces are 12 random bytes per encryption. A (key, nonce) pair is
//!   never reused: collision probability is negligible over a session's
//!   message volume, and every rekey replaces the key anyway.
//! - Key material is zeroized on drop.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod envelope;
mod error;
mod kdf;

pub use envelope::{ENVELOPE_OVERHEAD, NONCE_SIZE, TAG_SIZE, decrypt, encrypt, seal};
pub use error::CryptoError;
pub use kdf::{KEY_SIZE, PBKDF2_ITERATIONS, SALT_SIZE, SessionKey, derive_key, generate_salt};
