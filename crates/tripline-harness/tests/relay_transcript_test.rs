//! Wire-level transcript of a short multi-peer session.
//!
//! Pins down which events cross the connection and in which order, so a
//! change to join timing, echo handling or presence shows up as a diff.

use tripline_app::Command;
use tripline_core::{Draft, ThreadKey};
use tripline_harness::SimCluster;
use tripline_proto::{
    TripId,
    payloads::map::{Coordinate, Waypoint},
};

#[tokio::test]
async fn two_peer_session_transcript() {
    let mut cluster = SimCluster::new(0, 42);
    cluster.add_peer("alice");
    cluster.add_peer("bob");

    cluster.login("alice").await.unwrap();
    cluster.login("bob").await.unwrap();
    cluster.run("alice", Command::MountMessages).await.unwrap();
    cluster.run("alice", Command::OpenThread(ThreadKey::direct("t1", "bob"))).await.unwrap();
    cluster.run("alice", Command::Send(Draft::text("hi"))).await.unwrap();
    cluster
        .run("alice", Command::MountMap {
            trip_id: TripId::new("trip-1"),
            start: Waypoint::new(Coordinate::new(0.0, 0.0), "start"),
            end: Waypoint::new(Coordinate::new(1.0, 1.0), "end"),
            waypoints: Vec::new(),
            read_only: false,
        })
        .await
        .unwrap();
    cluster.run("alice", Command::AddWaypoint(Coordinate::new(0.5, 0.5))).await.unwrap();
    cluster.drop_connection("bob", "ping timeout");
    cluster.settle().await.unwrap();

    insta::assert_snapshot!(cluster.relay().transcript().join("\n"), @r"
    alice <- connect
    bob <- connect
    bob <- user_status
    alice <- user_status
    alice -> join_dm_conversation
    alice -> send_dm
    alice <- receive_dm
    bob <- receive_dm
    alice -> join_squad
    alice -> map_action
    bob <- disconnect
    alice <- user_status
    ");
}
