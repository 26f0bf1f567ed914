//! Shared trip route editing.
//!
//! A route is `[start, ...waypoints, end]`. The endpoints come from the trip
//! and never change here; only the interior sequence is edited and exchanged.
//! Every local edit broadcasts the whole interior sequence and every remote
//! update replaces it wholesale, so the last writer wins.

use tripline_proto::{
    OutboundEvent, TripId, UserId,
    payloads::map::{Coordinate, MapAction, MapUpdate, TripRef, Waypoint},
};

use crate::{
    action::{Notice, SyncAction},
    error::MapError,
};

/// A trip route with fixed endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    start: Waypoint,
    waypoints: Vec<Waypoint>,
    end: Waypoint,
}

impl Route {
    /// Route from `start` to `end` with no stops.
    pub fn new(start: Waypoint, end: Waypoint) -> Self {
        Self { start, waypoints: Vec::new(), end }
    }

    /// Fixed origin.
    pub fn start(&self) -> &Waypoint {
        &self.start
    }

    /// Fixed destination.
    pub fn end(&self) -> &Waypoint {
        &self.end
    }

    /// Interior stops.
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Start, interior stops and end, in travel order.
    pub fn rendered_points(&self) -> Vec<Waypoint> {
        let mut points = Vec::with_capacity(self.waypoints.len() + 2);
        points.push(self.start.clone());
        points.extend(self.waypoints.iter().cloned());
        points.push(self.end.clone());
        points
    }
}

/// Squad room subscription of the mounted map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquadMembership {
    /// Join not sent yet; waits for the connection.
    Pending,
    /// Join emitted on the live connection.
    Joined,
}

/// Route synchronization for one trip.
#[derive(Debug)]
pub struct MapSyncEngine {
    user_id: UserId,
    trip_id: TripId,
    read_only: bool,
    route: Route,
    membership: SquadMembership,
}

impl MapSyncEngine {
    /// Engine for `trip_id` between the trip's fixed endpoints.
    pub fn new(user_id: UserId, trip_id: TripId, start: Waypoint, end: Waypoint) -> Self {
        Self {
            user_id,
            trip_id,
            read_only: false,
            route: Route::new(start, end),
            membership: SquadMembership::Pending,
        }
    }

    /// Trip being edited.
    pub fn trip_id(&self) -> &TripId {
        &self.trip_id
    }

    /// Current route.
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Squad room subscription.
    pub fn membership(&self) -> SquadMembership {
        self.membership
    }

    /// Whether local edits are rejected.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Allow or forbid local edits. Remote updates still apply.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Seed the interior stops from stored trip data without broadcasting.
    pub fn load(&mut self, waypoints: Vec<Waypoint>) -> Vec<SyncAction> {
        self.route.waypoints = waypoints;
        vec![self.route_changed()]
    }

    /// The map surface appeared: join the squad room.
    pub fn mount(&mut self, connected: bool) -> Vec<SyncAction> {
        let mut actions = Vec::new();
        if connected {
            actions.extend(self.join());
        }
        actions.push(self.route_changed());
        actions
    }

    /// The map surface went away: leave the squad room.
    pub fn unmount(&mut self, connected: bool) -> Vec<SyncAction> {
        let was_joined = self.membership == SquadMembership::Joined;
        self.membership = SquadMembership::Pending;
        if was_joined && connected {
            tracing::debug!(trip = %self.trip_id, "leaving squad");
            vec![SyncAction::Emit(OutboundEvent::LeaveSquad(self.trip_ref()))]
        } else {
            Vec::new()
        }
    }

    /// Connection came up: join if not joined yet.
    pub fn handle_connected(&mut self) -> Vec<SyncAction> {
        self.join()
    }

    /// Connection dropped: the server forgot the squad room.
    pub fn handle_disconnected(&mut self) {
        self.membership = SquadMembership::Pending;
    }

    fn join(&mut self) -> Vec<SyncAction> {
        if self.membership == SquadMembership::Joined {
            return Vec::new();
        }
        self.membership = SquadMembership::Joined;
        tracing::debug!(trip = %self.trip_id, "joining squad");
        vec![SyncAction::Emit(OutboundEvent::JoinSquad(self.trip_ref()))]
    }

    /// Append a stop at `at`, labelled by its position.
    pub fn add_waypoint(&mut self, at: Coordinate) -> Result<Vec<SyncAction>, MapError> {
        self.ensure_editable()?;
        let label = format!("Stop {}", self.route.waypoints.len() + 1);
        self.route.waypoints.push(Waypoint::new(at, label));
        Ok(self.broadcast())
    }

    /// Remove the interior stop at `index`.
    pub fn delete_waypoint(&mut self, index: usize) -> Result<Vec<SyncAction>, MapError> {
        self.ensure_editable()?;
        let len = self.route.waypoints.len();
        if index >= len {
            return Err(MapError::IndexOutOfRange { index, len });
        }
        self.route.waypoints.remove(index);
        Ok(self.broadcast())
    }

    /// Remove the last interior stop. No-op on an empty sequence.
    pub fn undo_last(&mut self) -> Result<Vec<SyncAction>, MapError> {
        self.ensure_editable()?;
        if self.route.waypoints.pop().is_none() {
            return Ok(Vec::new());
        }
        Ok(self.broadcast())
    }

    /// A peer replaced the route.
    pub fn apply_remote(&mut self, update: &MapUpdate) -> Vec<SyncAction> {
        if let Some(trip) = &update.trip_id
            && trip != &self.trip_id
        {
            tracing::trace!(%trip, "map update for another trip");
            return Vec::new();
        }

        self.route.waypoints.clone_from(&update.waypoints);
        let mut actions = vec![self.route_changed()];
        if let Some(by) = &update.updated_by
            && by != self.user_id.as_str()
        {
            actions.push(SyncAction::Notify(Notice::RouteUpdated { by: by.clone() }));
        }
        tracing::debug!(trip = %self.trip_id, stops = self.route.waypoints.len(), "route replaced");
        actions
    }

    fn ensure_editable(&self) -> Result<(), MapError> {
        if self.read_only { Err(MapError::ReadOnly) } else { Ok(()) }
    }

    fn broadcast(&self) -> Vec<SyncAction> {
        vec![
            SyncAction::Emit(OutboundEvent::MapAction(MapAction {
                trip_id: self.trip_id.clone(),
                waypoints: self.route.waypoints.clone(),
            })),
            self.route_changed(),
        ]
    }

    fn route_changed(&self) -> SyncAction {
        SyncAction::RouteChanged { points: self.route.rendered_points() }
    }

    fn trip_ref(&self) -> TripRef {
        TripRef { trip_id: self.trip_id.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MapSyncEngine {
        MapSyncEngine::new(
            UserId::new("u1"),
            TripId::new("t1"),
            Waypoint::new(Coordinate::new(48.85, 2.35), "Paris"),
            Waypoint::new(Coordinate::new(43.30, 5.37), "Marseille"),
        )
    }

    fn broadcast_of(actions: &[SyncAction]) -> Option<&[Waypoint]> {
        actions.iter().find_map(|a| match a {
            SyncAction::Emit(OutboundEvent::MapAction(action)) => Some(&action.waypoints[..]),
            _ => None,
        })
    }

    #[test]
    fn add_labels_and_broadcasts_whole_sequence() {
        let mut map = engine();
        map.add_waypoint(Coordinate::new(47.0, 3.0)).unwrap();
        let actions = map.add_waypoint(Coordinate::new(45.76, 4.83)).unwrap();

        let sent = broadcast_of(&actions).unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].label, "Stop 2");
    }

    #[test]
    fn rendered_points_keep_endpoints() {
        let mut map = engine();
        map.add_waypoint(Coordinate::new(45.76, 4.83)).unwrap();

        let points = map.route().rendered_points();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].label, "Paris");
        assert_eq!(points[2].label, "Marseille");
    }

    #[test]
    fn delete_out_of_range_is_rejected() {
        let mut map = engine();
        map.add_waypoint(Coordinate::new(45.76, 4.83)).unwrap();

        assert_eq!(map.delete_waypoint(1), Err(MapError::IndexOutOfRange { index: 1, len: 1 }));
        assert_eq!(map.route().waypoints().len(), 1);
    }

    #[test]
    fn undo_on_empty_is_noop() {
        let mut map = engine();
        assert_eq!(map.undo_last(), Ok(Vec::new()));
    }

    #[test]
    fn read_only_rejects_every_edit() {
        let mut map = engine();
        map.add_waypoint(Coordinate::new(45.76, 4.83)).unwrap();
        map.set_read_only(true);

        assert_eq!(map.add_waypoint(Coordinate::new(1.0, 1.0)), Err(MapError::ReadOnly));
        assert_eq!(map.delete_waypoint(0), Err(MapError::ReadOnly));
        assert_eq!(map.undo_last(), Err(MapError::ReadOnly));
        assert_eq!(map.route().waypoints().len(), 1);
    }

    #[test]
    fn remote_update_replaces_and_names_peer() {
        let mut map = engine();
        map.add_waypoint(Coordinate::new(45.76, 4.83)).unwrap();

        let actions = map.apply_remote(&MapUpdate {
            trip_id: Some(TripId::new("t1")),
            waypoints: vec![
                Waypoint::new(Coordinate::new(46.0, 4.0), "Stop 1"),
                Waypoint::new(Coordinate::new(44.0, 4.5), "Stop 2"),
            ],
            updated_by: Some("Ana".into()),
        });

        assert_eq!(map.route().waypoints().len(), 2);
        assert!(actions.contains(&SyncAction::Notify(Notice::RouteUpdated { by: "Ana".into() })));
    }

    #[test]
    fn own_echo_does_not_notify() {
        let mut map = engine();
        let actions = map.apply_remote(&MapUpdate {
            trip_id: None,
            waypoints: vec![],
            updated_by: Some("u1".into()),
        });
        assert!(!actions.iter().any(|a| matches!(a, SyncAction::Notify(_))));
    }

    #[test]
    fn update_for_other_trip_is_discarded() {
        let mut map = engine();
        map.add_waypoint(Coordinate::new(45.76, 4.83)).unwrap();

        let actions = map.apply_remote(&MapUpdate {
            trip_id: Some(TripId::new("t2")),
            waypoints: vec![],
            updated_by: None,
        });

        assert!(actions.is_empty());
        assert_eq!(map.route().waypoints().len(), 1);
    }

    #[test]
    fn squad_join_waits_for_connection() {
        let mut map = engine();
        let actions = map.mount(false);
        assert!(broadcast_of(&actions).is_none());
        assert_eq!(map.membership(), SquadMembership::Pending);

        let actions = map.handle_connected();
        assert_eq!(
            actions,
            [SyncAction::Emit(OutboundEvent::JoinSquad(TripRef { trip_id: TripId::new("t1") }))]
        );
        assert!(map.handle_connected().is_empty());

        let actions = map.unmount(true);
        assert_eq!(
            actions,
            [SyncAction::Emit(OutboundEvent::LeaveSquad(TripRef { trip_id: TripId::new("t1") }))]
        );
    }
}
