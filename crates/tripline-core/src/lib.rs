//! Tripline core
//!
//! Sans-IO state machines for the real-time synchronization layer. Nothing in
//! this crate performs I/O or reads the clock directly: time comes from an
//! [`Environment`], bytes leave through a [`Transport`], and engines return
//! [`SyncAction`]s for the caller to execute.
//!
//! # Components
//!
//! - [`ConnectionManager`]: the one connection per session, with an ordered
//!   listener registry and fire-and-forget emit
//! - [`PresenceTracker`]: set of online peers
//! - [`MessageSyncEngine`]: optimistic send and reconciliation for chat threads
//! - [`MapSyncEngine`]: optimistic, last-writer-wins route editing

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod action;
pub mod connection;
pub mod env;
pub mod error;
pub mod map;
pub mod messages;
pub mod presence;
pub mod transport;

pub use action::{Notice, SyncAction};
pub use connection::{
    ConnectionHandle, ConnectionManager, ConnectionState, Listener, Subscription,
};
pub use env::Environment;
pub use error::{MapError, SyncError, TransportError};
pub use map::{MapSyncEngine, Route, SquadMembership};
pub use messages::{
    ConfirmedMessage, Draft, Membership, Message, MessageSyncEngine, PendingMessage,
    Reconciliation, SyncConfig, TempId, ThreadBuffer, ThreadKey, ThreadList,
};
pub use presence::PresenceTracker;
pub use transport::Transport;
