//! Error types for the transport layer.

use saltline_core::SessionError;
use saltline_proto::ProtocolError;
use thiserror::Error;

/// Errors from framing, the preamble exchange, and peer operations.
#[derive(Debug, Error)]
pub enum NetError {
    /// Underlying stream I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame violated the wire format (e.g. oversized length prefix).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session layer rejected the operation.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The peer closed the connection before the salt preamble arrived.
    #[error("connection closed during handshake")]
    ClosedDuringHandshake,
}
