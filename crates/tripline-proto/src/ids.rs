//! Opaque identifiers and timestamps.
//!
//! Server-assigned ids are opaque strings. They are wrapped in distinct
//! newtypes so a thread id can never be passed where a user id is expected.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Raw identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

opaque_id!(
    /// User (peer) identifier.
    UserId
);

opaque_id!(
    /// Direct-message conversation identifier.
    ThreadId
);

opaque_id!(
    /// Community chat room identifier.
    CommunityId
);

opaque_id!(
    /// Trip identifier. A trip's shared map is one squad room.
    TripId
);

opaque_id!(
    /// Server-assigned message identifier.
    MessageId
);

/// Wall-clock time in milliseconds since the Unix epoch.
///
/// Client and server timestamps share this representation so reconciliation
/// can compare them directly.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Timestamp from milliseconds since the Unix epoch.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the Unix epoch.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Absolute distance between two timestamps.
    pub fn abs_diff(self, other: Self) -> Duration {
        Duration::from_millis(self.0.abs_diff(other.0))
    }

    /// Timestamp advanced by `delta`, saturating at `u64::MAX`.
    #[must_use]
    pub fn saturating_add(self, delta: Duration) -> Self {
        let millis = u64::try_from(delta.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abs_diff_is_symmetric() {
        let a = Timestamp::from_millis(1_000);
        let b = Timestamp::from_millis(1_300);
        assert_eq!(a.abs_diff(b), Duration::from_millis(300));
        assert_eq!(b.abs_diff(a), Duration::from_millis(300));
    }

    #[test]
    fn saturating_add_clamps() {
        let t = Timestamp::from_millis(u64::MAX - 1);
        assert_eq!(t.saturating_add(Duration::from_secs(1)), Timestamp::from_millis(u64::MAX));
    }

    #[test]
    fn ids_are_distinct_types_with_same_text() {
        let user = UserId::new("u1");
        let thread = ThreadId::from("u1");
        assert_eq!(user.as_str(), thread.as_str());
        assert_eq!(user.to_string(), "u1");
    }
}
