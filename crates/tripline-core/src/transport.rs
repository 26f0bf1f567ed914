//! Transport abstraction.
//!
//! The [`Transport`] trait is the only place bytes leave the client. It is
//! synchronous and fire-and-forget: `open` starts connecting and returns
//! immediately, and the outcome arrives later as a `connect` or
//! `connect_error` inbound event. Inbound events are delivered by whoever
//! drives the session, never by the transport calling back into it.

use tripline_proto::OutboundEvent;

use crate::error::TransportError;

/// One persistent bidirectional connection.
pub trait Transport {
    /// Start connecting to `endpoint` with `credential`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the attempt cannot even be started (malformed
    /// endpoint, no runtime). Connection failures are reported asynchronously.
    fn open(&mut self, endpoint: &str, credential: &str) -> Result<(), TransportError>;

    /// Hand an event to the connection. No acknowledgement is implied.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is gone or the event cannot be
    /// encoded.
    fn send(&mut self, event: &OutboundEvent) -> Result<(), TransportError>;

    /// Tear the connection down. Idempotent.
    ///
    /// No event of the closed connection may reach the session afterwards,
    /// including its own `disconnect`. A later `open` starts from a clean
    /// event stream.
    fn close(&mut self);
}
