//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture what a session exposes at one point in time. Invariants
//! run against snapshots rather than live sessions so every check sees one
//! consistent state.

use std::collections::BTreeMap;

use tripline_app::{Session, SessionState};
use tripline_core::{Environment, Message, TempId, Transport};
use tripline_proto::{EventName, MessageId, UserId, payloads::map::Waypoint};

/// Snapshot of every simulated session.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Per-session snapshots.
    pub sessions: Vec<SessionSnapshot>,
}

impl SystemSnapshot {
    /// Snapshot with no sessions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot of one session.
    pub fn single(session: SessionSnapshot) -> Self {
        Self { sessions: vec![session] }
    }

    /// Add a session snapshot.
    pub fn add_session(&mut self, session: SessionSnapshot) {
        self.sessions.push(session);
    }
}

/// One buffer entry, reduced to its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySnapshot {
    /// Unconfirmed record.
    Pending(TempId),
    /// Confirmed record.
    Confirmed(MessageId),
}

/// Snapshot of one session's observable state.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Local user.
    pub user: Option<UserId>,
    /// Whether the connection is up.
    pub connected: bool,
    /// Listener count per event. `None` when taken from listener context only.
    pub listeners: Option<BTreeMap<EventName, usize>>,
    /// Active thread buffer, if a thread is open.
    pub buffer: Option<Vec<EntrySnapshot>>,
    /// Rendered route, if the map is mounted.
    pub route: Option<RouteSnapshot>,
}

/// Route as rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSnapshot {
    /// Fixed origin.
    pub start: Waypoint,
    /// Fixed destination.
    pub end: Waypoint,
    /// Interior stop count.
    pub interior: usize,
    /// Rendered points.
    pub rendered: Vec<Waypoint>,
}

impl SessionSnapshot {
    /// Snapshot from the listener context (no connection details).
    pub fn from_state(state: &SessionState) -> Self {
        let buffer = state.messages().and_then(|engine| engine.buffer()).map(|buffer| {
            buffer
                .messages()
                .iter()
                .map(|m| match m {
                    Message::Pending(p) => EntrySnapshot::Pending(p.temp_id),
                    Message::Confirmed(c) => EntrySnapshot::Confirmed(c.id.clone()),
                })
                .collect()
        });

        let route = state.map().map(|engine| {
            let route = engine.route();
            RouteSnapshot {
                start: route.start().clone(),
                end: route.end().clone(),
                interior: route.waypoints().len(),
                rendered: route.rendered_points(),
            }
        });

        Self {
            user: Some(state.user_id().clone()),
            connected: false,
            listeners: None,
            buffer,
            route,
        }
    }

    /// Full snapshot of a session, including its listener registry.
    pub fn from_session<T: Transport, E: Environment>(session: &Session<T, E>) -> Self {
        let connection = session.connection();
        let listeners = EventName::ALL
            .iter()
            .map(|name| (*name, connection.listener_count(*name)))
            .filter(|(_, count)| *count > 0)
            .collect();

        Self {
            connected: connection.is_connected(),
            listeners: Some(listeners),
            ..Self::from_state(session.state())
        }
    }
}
