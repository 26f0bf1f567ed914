//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// CBOR serialization failed.
    #[error("CBOR encode failed: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed (malformed bytes or unknown event).
    #[error("CBOR decode failed: {0}")]
    CborDecode(String),

    /// Encoded event exceeds [`crate::codec::MAX_EVENT_SIZE`].
    #[error("event too large: {size} bytes (max {max})")]
    EventTooLarge {
        /// Size of the rejected buffer.
        size: usize,
        /// Configured maximum.
        max: usize,
    },
}
