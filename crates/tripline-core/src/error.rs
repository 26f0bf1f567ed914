//! Error types for the sync core.
//!
//! Strongly-typed errors per concern: transport failures, message sync misuse
//! and rejected route edits. None of these are fatal to the session; the
//! caller surfaces them as notices.

use thiserror::Error;
use tripline_proto::ProtocolError;

/// Errors reported by a [`crate::Transport`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be started or was lost.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Send attempted on a closed transport.
    #[error("transport closed")]
    Closed,

    /// Event could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl TransportError {
    /// Returns true if a later attempt may succeed.
    ///
    /// Encoding failures are deterministic and never transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Closed)
    }
}

/// Errors from [`crate::MessageSyncEngine`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Send attempted with no thread open.
    #[error("no thread is open")]
    NoActiveThread,

    /// Message content was empty after trimming.
    #[error("message is empty")]
    EmptyMessage,
}

/// Errors from [`crate::MapSyncEngine`] edits.
///
/// A rejected edit never mutates the route and never broadcasts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// The route is displayed read-only.
    #[error("route is read-only")]
    ReadOnly,

    /// Index does not address an interior waypoint.
    #[error("waypoint index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Interior sequence length.
        len: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_are_transient() {
        assert!(TransportError::Connection("reset".into()).is_transient());
        assert!(TransportError::Closed.is_transient());
    }

    #[test]
    fn encoding_errors_are_fatal() {
        let err = TransportError::from(ProtocolError::CborEncode("bad".into()));
        assert!(!err.is_transient());
    }
}
