//! Connection-scoped payloads: errors, disconnects and presence.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Payload of `connect_error` and `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    /// Human-readable description from the server or transport.
    pub message: String,
}

/// Payload of `disconnect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectNotice {
    /// Reason reported by the transport.
    pub reason: String,
}

/// Online/offline state of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    /// Peer has at least one live connection.
    Online,
    /// Peer has no live connection.
    Offline,
}

/// Payload of `user_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatus {
    /// Peer whose status changed.
    pub user_id: UserId,
    /// New status.
    pub status: PresenceStatus,
}
