//! Side effects requested by the sync engines.
//!
//! Engines never perform I/O. They return [`SyncAction`]s and the session
//! executes them: emits go to the connection, everything else goes to the
//! REST directory or the UI.

use tripline_proto::{OutboundEvent, ThreadId, payloads::map::Waypoint};

use crate::messages::ThreadKey;

/// Actions produced by the engines.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    /// Emit an event on the connection (dropped if disconnected).
    Emit(OutboundEvent),

    /// Load message history for a newly opened thread.
    FetchHistory {
        /// Thread whose history to fetch.
        thread: ThreadKey,
    },

    /// Re-fetch thread summaries (unread counts, previews).
    RefreshThreads,

    /// Tell the read-receipt service the thread has been read.
    MarkRead {
        /// Thread that was read.
        thread: ThreadId,
    },

    /// The rendered route changed; redraw the path through these points.
    RouteChanged {
        /// Start, interior waypoints, end.
        points: Vec<Waypoint>,
    },

    /// Show a transient notification.
    Notify(Notice),

    /// Visible message or thread state changed.
    Render,
}

/// Transient user-facing notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A peer replaced the shared route.
    RouteUpdated {
        /// Peer who made the change.
        by: String,
    },

    /// Connection or server error.
    ConnectionError {
        /// Error description.
        message: String,
    },

    /// A user action was rejected locally.
    Rejected {
        /// Why it was rejected.
        reason: String,
    },
}
