//! Session configuration.

use std::time::Duration;

use tripline_core::{SyncConfig, messages::DEFAULT_RECONCILE_WINDOW};
use tripline_proto::UserId;

/// Settings fixed for the lifetime of a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Realtime endpoint URL.
    pub endpoint: String,
    /// Tolerance when matching a pending message to its echo.
    pub reconcile_window: Duration,
    /// Authenticated local user.
    pub user_id: UserId,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:4000/realtime".to_string(),
            reconcile_window: DEFAULT_RECONCILE_WINDOW,
            user_id: UserId::new("anonymous"),
        }
    }
}

impl SessionConfig {
    /// Configuration for `user_id` with defaults elsewhere.
    pub fn for_user(user_id: impl Into<UserId>) -> Self {
        Self { user_id: user_id.into(), ..Self::default() }
    }

    /// Message engine tunables derived from this configuration.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig { reconcile_window: self.reconcile_window }
    }
}
