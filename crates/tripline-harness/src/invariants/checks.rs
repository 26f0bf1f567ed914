//! Standard invariant checks.
//!
//! These invariants capture behavioural properties that must always hold,
//! whatever sequence of operations and deliveries led to the snapshot.

use std::collections::HashSet;

use super::{EntrySnapshot, Invariant, InvariantResult, SystemSnapshot, Violation};

/// Upper bound of listeners per event: session, chat surface and map surface.
pub const MAX_LISTENERS_PER_EVENT: usize = 3;

/// Each server id appears at most once in a buffer.
pub struct UniqueConfirmedIds;

impl Invariant for UniqueConfirmedIds {
    fn name(&self) -> &'static str {
        "unique_confirmed_ids"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in &state.sessions {
            let Some(buffer) = &session.buffer else { continue };
            let mut seen = HashSet::new();
            for entry in buffer {
                if let EntrySnapshot::Confirmed(id) = entry
                    && !seen.insert(id)
                {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("{:?}: id {id} appears twice", session.user),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Each temp id appears at most once in a buffer.
pub struct UniquePendingIds;

impl Invariant for UniquePendingIds {
    fn name(&self) -> &'static str {
        "unique_pending_ids"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in &state.sessions {
            let Some(buffer) = &session.buffer else { continue };
            let mut seen = HashSet::new();
            for entry in buffer {
                if let EntrySnapshot::Pending(temp) = entry
                    && !seen.insert(*temp)
                {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("{:?}: {temp} appears twice", session.user),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Mount/unmount cycles never accumulate listeners.
///
/// At most one listener per owner and event, so no event can have more than
/// [`MAX_LISTENERS_PER_EVENT`].
pub struct ListenerBound;

impl Invariant for ListenerBound {
    fn name(&self) -> &'static str {
        "listener_bound"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in &state.sessions {
            let Some(listeners) = &session.listeners else { continue };
            if let Some((name, count)) =
                listeners.iter().find(|(_, count)| **count > MAX_LISTENERS_PER_EVENT)
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("{:?}: {count} listeners on {name}", session.user),
                });
            }
        }
        Ok(())
    }
}

/// Route endpoints are fixed and framed around the interior stops.
pub struct RouteEndpointsFixed;

impl Invariant for RouteEndpointsFixed {
    fn name(&self) -> &'static str {
        "route_endpoints_fixed"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in &state.sessions {
            let Some(route) = &session.route else { continue };
            let framed = route.rendered.len() == route.interior + 2
                && route.rendered.first() == Some(&route.start)
                && route.rendered.last() == Some(&route.end);
            if !framed {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{:?}: rendered {} points for {} stops",
                        session.user,
                        route.rendered.len(),
                        route.interior
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tripline_core::TempId;
    use tripline_proto::{EventName, MessageId};

    use super::*;
    use crate::invariants::SessionSnapshot;

    #[test]
    fn duplicate_confirmed_id_is_reported() {
        let snapshot = SystemSnapshot::single(SessionSnapshot {
            buffer: Some(vec![
                EntrySnapshot::Confirmed(MessageId::new("m1")),
                EntrySnapshot::Pending(TempId::new(1)),
                EntrySnapshot::Confirmed(MessageId::new("m1")),
            ]),
            ..SessionSnapshot::default()
        });

        let violation = UniqueConfirmedIds.check(&snapshot).unwrap_err();
        assert_eq!(violation.invariant, "unique_confirmed_ids");
        assert!(UniquePendingIds.check(&snapshot).is_ok());
    }

    #[test]
    fn leaked_listeners_are_reported() {
        let snapshot = SystemSnapshot::single(SessionSnapshot {
            listeners: Some(BTreeMap::from([(EventName::ReceiveDm, 4)])),
            ..SessionSnapshot::default()
        });
        assert!(ListenerBound.check(&snapshot).is_err());
    }
}
