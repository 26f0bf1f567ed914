//! Session-wide set of online peers.

use std::collections::HashSet;

use tripline_proto::{
    UserId,
    payloads::session::{PresenceStatus, UserStatus},
};

/// Online peers as reported by `user_status` events.
///
/// Mutated only by [`PresenceTracker::apply`] and cleared by
/// [`PresenceTracker::reset`] when a new connection comes up. Nothing is
/// carried across connection lifetimes: the server re-announces presence after
/// every connect.
#[derive(Debug, Clone, Default)]
pub struct PresenceTracker {
    online: HashSet<UserId>,
}

impl PresenceTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a presence event. Idempotent in both directions.
    ///
    /// Returns whether the set changed.
    pub fn apply(&mut self, update: &UserStatus) -> bool {
        let changed = match update.status {
            PresenceStatus::Online => self.online.insert(update.user_id.clone()),
            PresenceStatus::Offline => self.online.remove(&update.user_id),
        };
        if changed {
            tracing::trace!(peer = %update.user_id, status = ?update.status, "presence changed");
        }
        changed
    }

    /// Forget every peer.
    pub fn reset(&mut self) {
        self.online.clear();
    }

    /// Whether `peer` is online.
    pub fn is_online(&self, peer: &UserId) -> bool {
        self.online.contains(peer)
    }

    /// Online peers, sorted.
    pub fn online_peers(&self) -> Vec<UserId> {
        let mut peers: Vec<UserId> = self.online.iter().cloned().collect();
        peers.sort_unstable();
        peers
    }

    /// Number of online peers.
    pub fn len(&self) -> usize {
        self.online.len()
    }

    /// Whether no peer is online.
    pub fn is_empty(&self) -> bool {
        self.online.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(user: &str, status: PresenceStatus) -> UserStatus {
        UserStatus { user_id: UserId::new(user), status }
    }

    #[test]
    fn online_then_offline() {
        let mut presence = PresenceTracker::new();
        let u2 = UserId::new("u2");

        assert!(presence.apply(&status("u2", PresenceStatus::Online)));
        assert!(presence.is_online(&u2));

        assert!(presence.apply(&status("u2", PresenceStatus::Offline)));
        assert!(!presence.is_online(&u2));
    }

    #[test]
    fn repeated_events_are_idempotent() {
        let mut presence = PresenceTracker::new();

        assert!(presence.apply(&status("u2", PresenceStatus::Online)));
        assert!(!presence.apply(&status("u2", PresenceStatus::Online)));
        assert_eq!(presence.len(), 1);

        assert!(!presence.apply(&status("u3", PresenceStatus::Offline)));
        assert_eq!(presence.len(), 1);
    }

    #[test]
    fn online_peers_are_sorted() {
        let mut presence = PresenceTracker::new();
        for user in ["u9", "u1", "u5"] {
            presence.apply(&status(user, PresenceStatus::Online));
        }
        assert_eq!(
            presence.online_peers(),
            vec![UserId::new("u1"), UserId::new("u5"), UserId::new("u9")]
        );
    }

    #[test]
    fn reset_forgets_everyone() {
        let mut presence = PresenceTracker::new();
        presence.apply(&status("u2", PresenceStatus::Online));
        presence.reset();
        assert!(presence.is_empty());
    }
}
