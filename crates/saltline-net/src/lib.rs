//! Saltline Framed Transport and Peer Connection
//!
//! Turns a reliable, ordered, bidirectional byte stream into discrete
//! frames, and runs one Saltline session over it.
//!
//! # Layers
//!
//! - [`FramedReader`] / [`FramedWriter`]: length-prefixed framing. Each
//!   message travels as a 4-byte big-endian length followed by exactly
//!   that many payload bytes; the receiver reconstructs exact message
//!   boundaries no matter how the stream chunks them.
//! - [`Peer`]: the connection driver. It performs the 16-byte salt
//!   preamble exchange, owns the [`Session`](saltline_core::Session),
//!   runs a background receive loop, and delivers [`PeerEvent`]s over a
//!   channel.
//!
//! # Concurrency
//!
//! Per connection there are exactly two kinds of activity: the one
//! background receive-loop task blocking on `recv()`, and caller-driven
//! sends. They operate on independent halves of the duplex stream and
//! never block each other. Sends are serialized by an async writer lock
//! held across seal-and-write, so an application send racing a rekey can
//! neither interleave bytes on the wire nor reorder frames relative to
//! the epoch they were sealed under.
//!
//! No operation here has a timeout or cancellation contract: `recv()`
//! blocks until data or closure. Callers needing deadlines wrap the
//! stream before handing it in.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod framing;
mod peer;

pub use error::NetError;
pub use framing::{FramedReader, FramedWriter, read_preamble, write_preamble};
pub use peer::{CloseReason, Listener, Peer, PeerConfig, PeerEvent};
