//! Shared trip-route payloads.

use serde::{Deserialize, Serialize};

use crate::TripId;

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Coordinate {
    /// Coordinate from latitude and longitude.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A labelled stop on a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Display label.
    pub label: String,
}

impl Waypoint {
    /// Waypoint at `coordinate` with `label`.
    pub fn new(coordinate: Coordinate, label: impl Into<String>) -> Self {
        Self { lat: coordinate.lat, lng: coordinate.lng, label: label.into() }
    }

    /// Position without the label.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Payload of `join_squad` and `leave_squad`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRef {
    /// Trip whose squad room to join or leave.
    pub trip_id: TripId,
}

/// Payload of `map_action`: the full interior waypoint sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapAction {
    /// Trip being edited.
    pub trip_id: TripId,
    /// Interior waypoints, excluding the fixed start and end.
    pub waypoints: Vec<Waypoint>,
}

/// Payload of `map_update`: a peer's full interior waypoint sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapUpdate {
    /// Trip the update belongs to. Older servers omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<TripId>,
    /// Interior waypoints, excluding the fixed start and end.
    pub waypoints: Vec<Waypoint>,
    /// Peer who made the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}
