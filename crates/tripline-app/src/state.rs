//! State shared with connection listeners.
//!
//! [`SessionState`] is the context type of the session's
//! [`tripline_core::ConnectionManager`]. Every listener receives it as
//! `&mut SessionState` at call time, so handlers always see the live engines
//! and never a copy captured at registration.

use tripline_core::{MapSyncEngine, MessageSyncEngine, PresenceTracker, SyncAction};
use tripline_proto::UserId;

/// Everything listeners may read or mutate.
#[derive(Debug)]
pub struct SessionState {
    pub(crate) user_id: UserId,
    pub(crate) presence: PresenceTracker,
    pub(crate) messages: Option<MessageSyncEngine>,
    pub(crate) map: Option<MapSyncEngine>,
    /// Actions produced by listeners and operations, awaiting the flush.
    pub(crate) outbox: Vec<SyncAction>,
}

impl SessionState {
    /// Fresh state for `user_id`: nobody online, no surface mounted.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            presence: PresenceTracker::new(),
            messages: None,
            map: None,
            outbox: Vec::new(),
        }
    }

    /// Authenticated local user.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Online peers.
    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    /// Message engine, while the chat surface is mounted.
    pub fn messages(&self) -> Option<&MessageSyncEngine> {
        self.messages.as_ref()
    }

    /// Map engine, while the map surface is mounted.
    pub fn map(&self) -> Option<&MapSyncEngine> {
        self.map.as_ref()
    }

    pub(crate) fn push(&mut self, actions: impl IntoIterator<Item = SyncAction>) {
        self.outbox.extend(actions);
    }
}
