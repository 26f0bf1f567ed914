//! Runtime loop behaviour with scripted and channel-fed drivers.

use tokio::sync::mpsc;
use tripline_app::{ChannelDriver, Command, Runtime, Session, SessionConfig};
use tripline_core::{Draft, Notice, SyncAction, ThreadKey};
use tripline_harness::{
    InvariantRegistry, MessageStore, SimDirectory, SimDriver, SimEnv, SimLink, SimTransport,
    TransportOp,
};
use tripline_proto::{
    InboundEvent, OutboundEvent, TripId, UserId,
    payloads::map::{Coordinate, Waypoint},
};

fn login() -> Command {
    Command::Login { credential: Some("token".into()) }
}

fn parts() -> (Session<SimTransport, SimEnv>, SimLink, SimDirectory) {
    let (transport, link) = SimTransport::pair();
    let session = Session::new(transport, SimEnv::new(0, 9), SessionConfig::for_user("alice"));
    let directory = SimDirectory::new(UserId::new("alice"), MessageStore::shared());
    (session, link, directory)
}

#[tokio::test]
async fn run_executes_the_script_and_logs_out() {
    let (session, link, directory) = parts();
    let driver = SimDriver::new().with_invariants(InvariantRegistry::standard());
    driver.push_command(login());
    driver.push_event(InboundEvent::Connect);
    driver.push_command(Command::MountMessages);
    driver.push_command(Command::OpenThread(ThreadKey::direct("t1", "bob")));
    driver.push_command(Command::Send(Draft::text("hi")));

    let runtime = Runtime::new(driver.clone(), directory.clone(), session);
    let session = runtime.run().await.unwrap();

    let names: Vec<&str> = link.sent().iter().map(|e| e.name().as_str()).collect();
    assert_eq!(names, ["join_dm_conversation", "send_dm", "leave_dm_conversation"]);
    assert_eq!(link.ops().last(), Some(&TransportOp::Close));
    assert_eq!(directory.calls(), ["fetch_threads", "fetch_history:dm:t1"]);

    assert!(!session.is_connected());
    assert_eq!(session.connection().total_listeners(), 0);
    assert!(!driver.has_pending());
    assert!(driver.take_presented().contains(&SyncAction::Render));
}

#[tokio::test]
async fn directory_failures_do_not_stop_the_loop() {
    let (session, _link, directory) = parts();
    directory.set_failing(true);
    let driver = SimDriver::new();
    driver.push_command(login());
    driver.push_event(InboundEvent::Connect);
    driver.push_command(Command::MountMessages);
    driver.push_command(Command::OpenThread(ThreadKey::community("hikers")));
    driver.push_command(Command::MarkRead("t1".into()));

    let runtime = Runtime::new(driver.clone(), directory.clone(), session);
    runtime.run().await.unwrap();

    assert_eq!(
        directory.calls(),
        ["fetch_threads", "fetch_history:community:hikers", "mark_read:t1"]
    );
    assert!(driver.notices().is_empty());
}

#[tokio::test]
async fn refused_connection_is_reported() {
    let (session, link, directory) = parts();
    link.refuse_open(true);
    let driver = SimDriver::new();
    driver.push_command(login());

    let runtime = Runtime::new(driver.clone(), directory, session);
    let session = runtime.run().await.unwrap();

    assert!(matches!(driver.notices().as_slice(), [Notice::ConnectionError { .. }]));
    assert_eq!(link.open_count(), 0);
    assert!(!session.is_connected());
}

#[tokio::test]
async fn commands_while_unmounted_are_rejected() {
    let (session, _link, directory) = parts();
    let driver = SimDriver::new();
    driver.push_command(login());
    driver.push_command(Command::UndoWaypoint);
    driver.push_command(Command::CloseThread);

    let runtime = Runtime::new(driver.clone(), directory, session);
    runtime.run().await.unwrap();

    let reasons: Vec<String> = driver
        .notices()
        .into_iter()
        .filter_map(|n| match n {
            Notice::Rejected { reason } => Some(reason),
            _ => None,
        })
        .collect();
    assert_eq!(reasons, ["map surface is not mounted", "chat surface is not mounted"]);
}

#[tokio::test]
async fn channel_driver_feeds_the_runtime() {
    let (session, link, directory) = parts();
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel::<InboundEvent>();
    let (presented_tx, mut presented_rx) = mpsc::unbounded_channel();

    command_tx.send(login()).unwrap();
    command_tx
        .send(Command::MountMap {
            trip_id: TripId::new("trip-1"),
            start: Waypoint::new(Coordinate::new(0.0, 0.0), "start"),
            end: Waypoint::new(Coordinate::new(2.0, 2.0), "end"),
            waypoints: Vec::new(),
            read_only: false,
        })
        .unwrap();
    command_tx.send(Command::AddWaypoint(Coordinate::new(1.0, 1.0))).unwrap();
    drop(command_tx);
    drop(event_tx);

    let driver = ChannelDriver::new(command_rx, event_rx, presented_tx);
    Runtime::new(driver, directory, session).run().await.unwrap();

    let mut routes = Vec::new();
    while let Ok(action) = presented_rx.try_recv() {
        if let SyncAction::RouteChanged { points } = action {
            routes.push(points.len());
        }
    }
    assert_eq!(routes, [2, 3]);
    // never connected: emits were dropped, not queued
    assert!(!link.sent().iter().any(|e| matches!(e, OutboundEvent::MapAction(_))));
}
