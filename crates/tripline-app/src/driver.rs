//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] decouples the [`crate::Runtime`] from where inputs come
//! from and where results go. A frontend implements it over its input
//! devices and its realtime transport; the harness implements it over
//! scripted inputs and an in-process relay.

use std::future::Future;

use tripline_core::SyncAction;
use tripline_proto::InboundEvent;

use crate::{Command, SessionState};

/// One input to the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// A user operation.
    Command(Command),
    /// An event delivered by the realtime transport.
    Event(InboundEvent),
}

/// Abstracts I/O for the session runtime.
///
/// The runtime is single-threaded: listeners are shared `Rc`s, so nothing
/// here is required to be `Send`.
pub trait Driver {
    /// Platform-specific error type.
    type Error: std::error::Error + 'static;

    /// Wait for the next input.
    ///
    /// Returns `None` when the frontend is shutting down.
    fn next_input(&mut self) -> impl Future<Output = Result<Option<Input>, Self::Error>>;

    /// Present a UI-facing action (render, route redraw, notice).
    ///
    /// # Errors
    ///
    /// Returns an error if the frontend can no longer present.
    fn present(&mut self, state: &SessionState, action: &SyncAction) -> Result<(), Self::Error>;
}
