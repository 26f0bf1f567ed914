//! Listener registry symmetry across mount and unmount cycles.

use std::{cell::Cell, rc::Rc};

use tripline_app::{Session, SessionConfig, SessionState};
use tripline_core::{Listener, ThreadKey};
use tripline_harness::{
    InvariantRegistry, SessionSnapshot, SimEnv, SimLink, SimTransport, SystemSnapshot,
};
use tripline_proto::{
    EventName, InboundEvent, MessageId, ThreadId, Timestamp, TripId, UserId,
    payloads::{
        MessageKind,
        dm::DirectMessage,
        map::{Coordinate, MapUpdate, Waypoint},
        session::{PresenceStatus, UserStatus},
    },
};

fn connected(user: &str) -> (Session<SimTransport, SimEnv>, SimLink) {
    let (transport, link) = SimTransport::pair();
    let mut session = Session::new(transport, SimEnv::new(0, 5), SessionConfig::for_user(user));
    session.login(Some("token")).unwrap();
    session.handle_event(&InboundEvent::Connect);
    session.take_actions();
    (session, link)
}

fn mount_map(session: &mut Session<SimTransport, SimEnv>) {
    session.mount_map(
        TripId::new("trip-1"),
        Waypoint::new(Coordinate::new(0.0, 0.0), "start"),
        Waypoint::new(Coordinate::new(1.0, 1.0), "end"),
        Vec::new(),
        false,
    );
}

fn counts(session: &Session<SimTransport, SimEnv>) -> Vec<usize> {
    EventName::ALL.iter().map(|name| session.connection().listener_count(*name)).collect()
}

fn dm(id: &str, content: &str) -> InboundEvent {
    InboundEvent::ReceiveDm(DirectMessage {
        id: MessageId::new(id),
        conversation_id: ThreadId::new("t1"),
        sender_id: UserId::new("bob"),
        content: content.into(),
        kind: MessageKind::Text,
        created_at: Timestamp::from_millis(0),
        reply_to: None,
    })
}

#[test]
fn mount_cycles_restore_the_registry() {
    let (mut session, _link) = connected("alice");
    let baseline = counts(&session);
    let registry = InvariantRegistry::standard();

    for _ in 0..10 {
        session.mount_messages();
        mount_map(&mut session);
        let snapshot = SystemSnapshot::single(SessionSnapshot::from_session(&session));
        assert!(registry.check_all(&snapshot).is_ok());

        session.unmount_map();
        session.unmount_messages();
        session.take_actions();
        assert_eq!(counts(&session), baseline);
    }
}

#[test]
fn remount_replaces_the_previous_subscription() {
    let (mut session, _link) = connected("alice");
    session.mount_messages();
    session.mount_messages();
    mount_map(&mut session);
    mount_map(&mut session);

    let connection = session.connection();
    assert_eq!(connection.listener_count(EventName::ReceiveDm), 1);
    assert_eq!(connection.listener_count(EventName::MapUpdate), 1);
    // session, chat surface and map surface
    assert_eq!(connection.listener_count(EventName::Connect), 3);
}

#[test]
fn unmounted_surface_receives_nothing() {
    let (mut session, _link) = connected("alice");
    session.mount_messages();
    session.open_thread(ThreadKey::direct("t1", "bob")).unwrap();
    session.handle_event(&dm("m1", "before"));
    session.take_actions();
    assert_eq!(session.state().messages().unwrap().messages().len(), 1);

    session.unmount_messages();
    session.handle_event(&dm("m2", "after"));
    session.take_actions();
    assert_eq!(session.connection().listener_count(EventName::ReceiveDm), 0);

    session.mount_messages();
    assert!(session.state().messages().unwrap().buffer().is_none());
}

#[test]
fn removed_listener_is_not_called_again() {
    let (mut session, _link) = connected("alice");
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    let listener: Listener<SessionState> =
        Rc::new(move |_: &mut SessionState, _: &InboundEvent| counter.set(counter.get() + 1));

    let update = InboundEvent::MapUpdate(MapUpdate {
        trip_id: Some(TripId::new("trip-1")),
        waypoints: Vec::new(),
        updated_by: Some("bob".into()),
    });

    session.on(EventName::MapUpdate, Rc::clone(&listener));
    session.handle_event(&update);
    assert_eq!(hits.get(), 1);

    assert!(session.off(EventName::MapUpdate, &listener));
    assert!(!session.off(EventName::MapUpdate, &listener));
    session.handle_event(&update);
    assert_eq!(hits.get(), 1);
}

#[test]
fn logout_releases_every_listener() {
    let (mut session, link) = connected("alice");
    session.mount_messages();
    mount_map(&mut session);
    session.take_actions();
    session.handle_event(&InboundEvent::UserStatus(UserStatus {
        user_id: UserId::new("bob"),
        status: PresenceStatus::Online,
    }));
    assert!(session.state().presence().is_online(&UserId::new("bob")));

    session.logout();
    session.take_actions();

    assert_eq!(session.connection().total_listeners(), 0);
    assert!(session.state().presence().is_empty());
    assert!(!link.is_open());
}
