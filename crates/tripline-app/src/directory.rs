//! REST collaborators behind one narrow seam.

use std::future::Future;

use tripline_core::{ConfirmedMessage, ThreadKey};
use tripline_proto::{ThreadId, payloads::dm::ThreadSummary};

/// Request/response services the sync layer depends on.
///
/// The thread list, message history and read receipts are served over REST,
/// not over the realtime connection. Production wires an HTTP client here;
/// the simulation harness uses an in-memory store.
pub trait Directory {
    /// Implementation-specific error type.
    type Error: std::error::Error + 'static;

    /// Conversation summaries of the local user, most recent first.
    fn fetch_threads(&mut self) -> impl Future<Output = Result<Vec<ThreadSummary>, Self::Error>>;

    /// Stored messages of `thread`, oldest first.
    fn fetch_history(
        &mut self,
        thread: &ThreadKey,
    ) -> impl Future<Output = Result<Vec<ConfirmedMessage>, Self::Error>>;

    /// Record that the local user has read `thread`.
    fn mark_read(&mut self, thread: &ThreadId) -> impl Future<Output = Result<(), Self::Error>>;
}
