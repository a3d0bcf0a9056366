//! Saltline Session Protocol
//!
//! The control layer between the framed transport and the AEAD engine.
//! A [`Session`] owns the key schedule for one two-party connection:
//! it seals outgoing messages, classifies and opens incoming frames, and
//! drives the in-band rekey handshake that rotates the key without
//! renegotiating the passphrase.
//!
//! # Architecture: Action-Based State Machine
//!
//! `Session` is sans-IO. Methods mutate state and return
//! [`SessionAction`]s (frame payloads to put on the wire) or
//! [`SessionEvent`]s (what an inbound frame meant); a driver — the
//! `saltline-net` peer loop, or a test — performs the I/O. This keeps the
//! protocol logic synchronous, deterministic, and testable without
//! sockets.
//!
//! # Epochs
//!
//! A session is an ordered sequence of key epochs. Each epoch is one
//! (salt, session key) pair; transitions are announced by a rekey frame
//! carrying the next salt in the clear. Either peer may rotate at any
//! time — rekey is unilateral and unacknowledged, exactly like the
//! initial salt exchange.
//!
//! ```text
//! ┌──────────────┐ preamble salt  ┌────────┐ rekey frame ┌────────┐
//! │ initiate /   │───────────────>│ epoch 0│────────────>│ epoch 1│ ...
//! │ respond      │                └────────┘             └────────┘
//! └──────────────┘                 seal / open each message under
//!                                  the current epoch's key
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod session;

pub use error::SessionError;
pub use session::{
    DEFAULT_REKEY_AFTER, Session, SessionAction, SessionConfig, SessionEvent,
};
