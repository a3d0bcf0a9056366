//! Saltline Wire Format
//!
//! Defines what travels inside each transport frame. The transport layer
//! delivers opaque length-prefixed payloads; this crate gives every
//! payload an explicit type so nothing is ever guessed from content.
//!
//! # Wire Layout
//!
//! ```text
//! preamble (once, initiator → responder, outside framing):
//!   salt: 16 raw bytes
//!
//! frame (length-prefixed by the transport):
//!   length:  u32 big-endian            ── transport layer
//!   kind:    u8 (0 = ciphertext, 1 = rekey)
//!   body:    kind-dependent bytes
//!
//! ciphertext body:  AEAD envelope (nonce ‖ tag ‖ ciphertext)
//! rekey body:       "__REKEY__" (9 ASCII bytes) ‖ new salt (16 bytes)
//! ```
//!
//! The leading kind byte is first-class protocol surface: a ciphertext
//! that happens to begin with the rekey marker is still a ciphertext,
//! because classification never looks at the body. Unknown kinds and
//! empty payloads are protocol violations, not data.
//!
//! Frame payloads are bounded by [`MAX_FRAME_LEN`] so a malicious or
//! corrupted peer cannot force unbounded allocation.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod errors;
mod frame;

pub use errors::ProtocolError;
pub use frame::{
    Frame, FrameKind, LENGTH_PREFIX_SIZE, MAX_FRAME_LEN, REKEY_MARKER, SALT_SIZE,
};

/// Convenience alias for protocol results.
pub type Result<T> = std::result::Result<T, ProtocolError>;
