//! User operations.

use tripline_core::{Draft, ThreadKey};
use tripline_proto::{
    ThreadId, TripId,
    payloads::map::{Coordinate, Waypoint},
};

/// Operations a frontend asks the session to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Open the session connection.
    Login {
        /// Auth token; `None` while the auth provider has none yet.
        credential: Option<String>,
    },
    /// Tear down everything and close the connection.
    Logout,

    /// The chat surface appeared.
    MountMessages,
    /// The chat surface went away.
    UnmountMessages,
    /// Open a thread on the chat surface.
    OpenThread(ThreadKey),
    /// Close the open thread.
    CloseThread,
    /// Send a message to the open thread.
    Send(Draft),
    /// Mark a conversation as read.
    MarkRead(ThreadId),
    /// The conversation list was shown or hidden.
    SetListVisible(bool),

    /// The map surface appeared for a trip.
    MountMap {
        /// Trip being displayed.
        trip_id: TripId,
        /// Fixed origin.
        start: Waypoint,
        /// Fixed destination.
        end: Waypoint,
        /// Stored interior stops.
        waypoints: Vec<Waypoint>,
        /// Whether local edits are rejected.
        read_only: bool,
    },
    /// The map surface went away.
    UnmountMap,
    /// Append a stop.
    AddWaypoint(Coordinate),
    /// Remove the stop at an interior index.
    DeleteWaypoint(usize),
    /// Remove the last stop.
    UndoWaypoint,
    /// Allow or forbid local route edits.
    SetReadOnly(bool),
}
