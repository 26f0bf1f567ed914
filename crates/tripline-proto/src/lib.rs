//! Tripline wire protocol.
//!
//! Every message crossing the connection is a named event with a typed
//! payload. Events are split by direction: [`InboundEvent`] is what the server
//! (or the transport itself) delivers to the client, [`OutboundEvent`] is what
//! the client emits. [`EventName`] is the shared key used by listener
//! registries on the client side.
//!
//! Events are CBOR-encoded as `{"event": <name>, "data": <payload>}` with
//! camelCase payload fields. See [`codec`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod errors;
pub mod event;
pub mod ids;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use event::{Direction, EventName, InboundEvent, OutboundEvent};
pub use ids::{CommunityId, MessageId, ThreadId, Timestamp, TripId, UserId};
