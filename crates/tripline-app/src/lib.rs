//! Application layer for Tripline
//!
//! Wires the sans-IO engines of `tripline-core` to a session lifecycle and a
//! generic runtime, so the same orchestration runs in production and in
//! deterministic simulation.
//!
//! # Components
//!
//! - [`Session`]: owns the one [`tripline_core::ConnectionManager`] of a login
//!   and mounts/unmounts the message and map surfaces on top of it
//! - [`SessionState`]: state handed to every listener
//! - [`Command`]: user operations fed to a session
//! - [`Driver`]: trait for platform-specific I/O abstraction
//! - [`Directory`]: REST collaborators (thread list, history, read receipts)
//! - [`Runtime`]: generic orchestration loop using Driver and Directory

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod channel;
mod command;
mod config;
mod directory;
mod driver;
mod env;
mod error;
mod runtime;
mod session;
mod state;
#[cfg(feature = "transport")]
mod transport;

pub use channel::{ChannelDriver, EventSource};
pub use command::Command;
pub use config::SessionConfig;
pub use directory::Directory;
pub use driver::{Driver, Input};
pub use env::SystemEnv;
pub use error::SessionError;
pub use runtime::Runtime;
pub use session::Session;
pub use state::SessionState;
#[cfg(feature = "transport")]
pub use transport::{WsEvents, WsTransport};
