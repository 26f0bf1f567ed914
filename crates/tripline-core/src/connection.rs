//! Connection manager and listener registry.
//!
//! One [`ConnectionManager`] exists per authenticated session. It is created
//! on login, injected into whatever needs it, and torn down on logout. Screens
//! come and go on top of it; they never own it.
//!
//! # State Machine
//!
//! ```text
//!                 connect()                 `connect` event
//! ┌──────────────┐────────>┌────────────┐──────────────>┌───────────┐
//! │ Disconnected │         │ Connecting │               │ Connected │
//! └──────────────┘<────────└────────────┘               └───────────┘
//!        ^      `connect_error`                               │
//!        └────────────────────────────────────────────────────┘
//!                      `disconnect` / disconnect()
//! ```
//!
//! # Listeners
//!
//! Listeners are registered per [`EventName`] and delivered in registration
//! order. Removal is by reference equality on the `Rc`, so a surface that
//! registers on every mount and deregisters on every unmount never disturbs
//! other subscribers. A listener receives the live session state as `&mut C`
//! on every call instead of capturing a copy of it.

use std::{collections::BTreeMap, fmt, rc::Rc};

use tripline_proto::{EventName, InboundEvent, OutboundEvent};

use crate::transport::Transport;

/// Callback invoked with the live session state and the inbound event.
pub type Listener<C> = Rc<dyn Fn(&mut C, &InboundEvent)>;

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport, or the transport dropped.
    Disconnected,
    /// Transport opened, waiting for `connect`.
    Connecting,
    /// `connect` received; emits are sent.
    Connected,
}

/// Identity of one opened transport.
///
/// Returned by [`ConnectionManager::connect`]. Repeated calls while a
/// transport is live return the same handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle {
    id: u64,
}

impl ConnectionHandle {
    /// Sequence number of the transport within this manager.
    pub fn id(self) -> u64 {
        self.id
    }
}

/// Owns the transport and the listener registry.
///
/// Generic over the transport `T` and the listener context `C` (the state
/// listeners are allowed to mutate).
pub struct ConnectionManager<T: Transport, C> {
    transport: T,
    state: ConnectionState,
    handle: Option<ConnectionHandle>,
    next_handle: u64,
    listeners: BTreeMap<EventName, Vec<Listener<C>>>,
    /// Events synthesized locally (open/send failures), awaiting dispatch.
    deferred: Vec<InboundEvent>,
}

impl<T: Transport, C> fmt::Debug for ConnectionManager<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: BTreeMap<EventName, usize> =
            self.listeners.iter().map(|(name, list)| (*name, list.len())).collect();
        f.debug_struct("ConnectionManager")
            .field("state", &self.state)
            .field("handle", &self.handle)
            .field("listeners", &counts)
            .field("deferred", &self.deferred.len())
            .finish_non_exhaustive()
    }
}

impl<T: Transport, C> ConnectionManager<T, C> {
    /// Create a manager around `transport`. Nothing is opened yet.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
            handle: None,
            next_handle: 1,
            listeners: BTreeMap::new(),
            deferred: Vec::new(),
        }
    }

    /// Open the connection, or return the live one.
    ///
    /// Idempotent: while a transport is connecting or connected this returns
    /// its handle without opening a second one. Returns `None` when no
    /// credential is available yet; callers treat that as "not ready", not as
    /// a failure. An open that cannot be started is reported through the
    /// `connect_error` listeners on the next [`Self::dispatch_deferred`].
    pub fn connect(
        &mut self,
        endpoint: &str,
        credential: Option<&str>,
    ) -> Option<ConnectionHandle> {
        if let Some(handle) = self.handle
            && self.state != ConnectionState::Disconnected
        {
            return Some(handle);
        }

        let credential = credential.filter(|c| !c.is_empty())?;

        if self.handle.take().is_some() {
            // Previous transport dropped; replace it rather than stacking a second one.
            self.transport.close();
        }

        if let Err(e) = self.transport.open(endpoint, credential) {
            tracing::warn!(%endpoint, error = %e, "transport open failed");
            self.state = ConnectionState::Disconnected;
            self.deferred.push(InboundEvent::connect_error(e.to_string()));
            return None;
        }

        let handle = ConnectionHandle { id: self.next_handle };
        self.next_handle += 1;
        self.handle = Some(handle);
        self.state = ConnectionState::Connecting;
        tracing::debug!(%endpoint, handle = handle.id, "transport opening");
        Some(handle)
    }

    /// Close the transport (explicit logout).
    ///
    /// The listener registry is left alone: every subscriber releases its own
    /// registrations.
    pub fn disconnect(&mut self) {
        if self.handle.take().is_some() {
            self.transport.close();
            tracing::debug!("transport closed");
        }
        self.state = ConnectionState::Disconnected;
        self.deferred.clear();
    }

    /// Register `listener` for `name`.
    ///
    /// Registering the same `Rc` twice for one name is a no-op, so delivery is
    /// never duplicated.
    pub fn on(&mut self, name: EventName, listener: Listener<C>) {
        let list = self.listeners.entry(name).or_default();
        if list.iter().any(|l| Rc::ptr_eq(l, &listener)) {
            tracing::trace!(event = %name, "listener already registered");
            return;
        }
        list.push(listener);
    }

    /// Deregister exactly `listener` from `name`.
    ///
    /// Returns whether it was registered.
    pub fn off(&mut self, name: EventName, listener: &Listener<C>) -> bool {
        let Some(list) = self.listeners.get_mut(&name) else {
            return false;
        };
        let Some(index) = list.iter().position(|l| Rc::ptr_eq(l, listener)) else {
            return false;
        };
        list.remove(index);
        if list.is_empty() {
            self.listeners.remove(&name);
        }
        true
    }

    /// Send `event` if connected.
    ///
    /// Fire-and-forget. While not connected the event is dropped rather than
    /// queued. Returns whether the event was handed to the transport.
    pub fn emit(&mut self, event: &OutboundEvent) -> bool {
        if self.state != ConnectionState::Connected {
            tracing::warn!(event = %event.name(), state = ?self.state, "dropping emit while not connected");
            return false;
        }

        match self.transport.send(event) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(event = %event.name(), error = %e, "emit failed");
                self.deferred.push(InboundEvent::error(e.to_string()));
                false
            },
        }
    }

    /// Whether emits are currently sent.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Handle of the live transport. `None` when logged out.
    pub fn handle(&self) -> Option<ConnectionHandle> {
        self.handle
    }

    /// Listeners registered for `name`.
    pub fn listener_count(&self, name: EventName) -> usize {
        self.listeners.get(&name).map_or(0, Vec::len)
    }

    /// Listeners registered across all names.
    pub fn total_listeners(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The underlying transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Apply lifecycle transitions for `event`, then deliver it to every
    /// listener registered for its name, in registration order.
    ///
    /// Events arriving while logged out are dropped.
    pub fn dispatch(&mut self, ctx: &mut C, event: &InboundEvent) {
        if self.handle.is_none() {
            tracing::debug!(event = %event.name(), "dropping event with no open transport");
            return;
        }

        match event {
            InboundEvent::Connect => {
                self.state = ConnectionState::Connected;
                tracing::info!("connected");
            },
            InboundEvent::ConnectError(notice) => {
                self.state = ConnectionState::Disconnected;
                tracing::warn!(message = %notice.message, "connect error");
            },
            InboundEvent::Disconnect(notice) => {
                self.state = ConnectionState::Disconnected;
                tracing::info!(reason = %notice.reason, "disconnected");
            },
            _ => {},
        }

        self.deliver(ctx, event);
    }

    /// Deliver locally synthesized events (open and send failures).
    ///
    /// Returns how many events were delivered.
    pub fn dispatch_deferred(&mut self, ctx: &mut C) -> usize {
        let mut delivered = 0;
        while !self.deferred.is_empty() {
            let events = std::mem::take(&mut self.deferred);
            for event in &events {
                self.deliver(ctx, event);
                delivered += 1;
            }
        }
        delivered
    }

    fn deliver(&self, ctx: &mut C, event: &InboundEvent) {
        // Snapshot so delivery order is fixed even if the registry changes later.
        let Some(listeners) = self.listeners.get(&event.name()).cloned() else {
            return;
        };
        for listener in listeners {
            listener(ctx, event);
        }
    }
}

/// Registrations made by one subscriber, released together.
///
/// A surface creates a `Subscription` on mount and calls
/// [`Subscription::release`] on unmount, which deregisters exactly the `Rc`s
/// it registered. Every `on` is therefore matched by one `off`.
#[must_use = "dropping a Subscription without release() leaks its listeners"]
pub struct Subscription<C> {
    entries: Vec<(EventName, Listener<C>)>,
}

impl<C> Default for Subscription<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Subscription<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<EventName> = self.entries.iter().map(|(name, _)| *name).collect();
        f.debug_struct("Subscription").field("events", &names).finish()
    }
}

impl<C> Subscription<C> {
    /// Empty subscription.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Register `listener` for `name` on `connection` and remember it.
    pub fn on<T: Transport>(
        &mut self,
        connection: &mut ConnectionManager<T, C>,
        name: EventName,
        listener: Listener<C>,
    ) {
        connection.on(name, Rc::clone(&listener));
        self.entries.push((name, listener));
    }

    /// Deregister everything this subscription registered.
    ///
    /// Returns how many registrations were removed.
    pub fn release<T: Transport>(self, connection: &mut ConnectionManager<T, C>) -> usize {
        self.entries.into_iter().filter(|(name, listener)| connection.off(*name, listener)).count()
    }

    /// Number of registrations held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::TransportError;

    #[derive(Default)]
    struct RecordingTransport {
        opens: usize,
        sent: Vec<OutboundEvent>,
        closes: usize,
        refuse_open: bool,
    }

    impl Transport for RecordingTransport {
        fn open(&mut self, _endpoint: &str, _credential: &str) -> Result<(), TransportError> {
            if self.refuse_open {
                return Err(TransportError::Connection("refused".into()));
            }
            self.opens += 1;
            Ok(())
        }

        fn send(&mut self, event: &OutboundEvent) -> Result<(), TransportError> {
            self.sent.push(event.clone());
            Ok(())
        }

        fn close(&mut self) {
            self.closes += 1;
        }
    }

    type Log = Vec<&'static str>;

    fn manager() -> ConnectionManager<RecordingTransport, Log> {
        ConnectionManager::new(RecordingTransport::default())
    }

    fn tag(label: &'static str) -> Listener<Log> {
        Rc::new(move |log: &mut Log, _event: &InboundEvent| log.push(label))
    }

    fn leave_c1() -> OutboundEvent {
        OutboundEvent::LeaveDmConversation(tripline_proto::payloads::dm::ConversationRef {
            conversation_id: "c1".into(),
        })
    }

    #[test]
    fn connect_without_credential_is_not_ready() {
        let mut conn = manager();
        assert_eq!(conn.connect("ws://x", None), None);
        assert_eq!(conn.connect("ws://x", Some("")), None);
        assert_eq!(conn.transport().opens, 0);
    }

    #[test]
    fn connect_is_idempotent() {
        let mut conn = manager();
        let first = conn.connect("ws://x", Some("token"));
        let second = conn.connect("ws://x", Some("token"));

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(conn.transport().opens, 1);

        let mut log = Log::new();
        conn.dispatch(&mut log, &InboundEvent::Connect);
        assert_eq!(conn.connect("ws://x", Some("token")), first);
        assert_eq!(conn.transport().opens, 1);
    }

    #[test]
    fn reconnect_after_drop_replaces_transport() {
        let mut conn = manager();
        let first = conn.connect("ws://x", Some("token"));
        let mut log = Log::new();
        conn.dispatch(&mut log, &InboundEvent::disconnect("ping timeout"));

        let second = conn.connect("ws://x", Some("token"));
        assert_ne!(first, second);
        assert_eq!(conn.transport().opens, 2);
        assert_eq!(conn.transport().closes, 1);
    }

    #[test]
    fn open_failure_is_reported_as_connect_error() {
        let mut conn =
            ConnectionManager::new(RecordingTransport { refuse_open: true, ..Default::default() });
        conn.on(EventName::ConnectError, tag("error"));

        assert_eq!(conn.connect("ws://x", Some("token")), None);

        let mut log = Log::new();
        assert_eq!(conn.dispatch_deferred(&mut log), 1);
        assert_eq!(log, ["error"]);
    }

    #[test]
    fn delivery_follows_registration_order() {
        let mut conn = manager();
        let _ = conn.connect("ws://x", Some("token"));
        conn.on(EventName::Connect, tag("a"));
        conn.on(EventName::Connect, tag("b"));
        conn.on(EventName::Connect, tag("c"));

        let mut log = Log::new();
        conn.dispatch(&mut log, &InboundEvent::Connect);
        assert_eq!(log, ["a", "b", "c"]);
    }

    #[test]
    fn off_removes_exactly_that_instance() {
        let mut conn = manager();
        let _ = conn.connect("ws://x", Some("token"));
        let a = tag("a");
        let b = tag("b");
        conn.on(EventName::Connect, Rc::clone(&a));
        conn.on(EventName::Connect, Rc::clone(&b));

        assert!(conn.off(EventName::Connect, &a));
        assert!(!conn.off(EventName::Connect, &a));

        let mut log = Log::new();
        conn.dispatch(&mut log, &InboundEvent::Connect);
        assert_eq!(log, ["b"]);
    }

    #[test]
    fn registering_same_instance_twice_delivers_once() {
        let mut conn = manager();
        let _ = conn.connect("ws://x", Some("token"));
        let a = tag("a");
        conn.on(EventName::Connect, Rc::clone(&a));
        conn.on(EventName::Connect, Rc::clone(&a));

        assert_eq!(conn.listener_count(EventName::Connect), 1);
    }

    #[test]
    fn emit_is_dropped_until_connected() {
        let mut conn = manager();
        let _ = conn.connect("ws://x", Some("token"));
        assert!(!conn.emit(&leave_c1()));

        let mut log = Log::new();
        conn.dispatch(&mut log, &InboundEvent::Connect);
        assert!(conn.emit(&leave_c1()));
        assert_eq!(conn.transport().sent.len(), 1);
    }

    #[test]
    fn events_after_logout_are_dropped() {
        let mut conn = manager();
        let _ = conn.connect("ws://x", Some("token"));
        conn.on(EventName::Connect, tag("a"));
        conn.disconnect();

        let mut log = Log::new();
        conn.dispatch(&mut log, &InboundEvent::Connect);
        assert!(log.is_empty());
        assert!(!conn.is_connected());
    }

    #[test]
    fn subscription_release_is_symmetric() {
        let mut conn = manager();
        let other = tag("other");
        conn.on(EventName::ReceiveDm, Rc::clone(&other));

        let mut sub = Subscription::new();
        sub.on(&mut conn, EventName::ReceiveDm, tag("mine"));
        sub.on(&mut conn, EventName::Connect, tag("mine"));
        assert_eq!(conn.total_listeners(), 3);

        assert_eq!(sub.release(&mut conn), 2);
        assert_eq!(conn.total_listeners(), 1);
        assert_eq!(conn.listener_count(EventName::ReceiveDm), 1);
    }

    #[test]
    fn listener_sees_live_state() {
        let mut conn: ConnectionManager<RecordingTransport, RefCell<u32>> =
            ConnectionManager::new(RecordingTransport::default());
        let _ = conn.connect("ws://x", Some("token"));
        conn.on(
            EventName::Connect,
            Rc::new(|count: &mut RefCell<u32>, _: &InboundEvent| *count.get_mut() += 1),
        );

        let mut count = RefCell::new(0);
        conn.dispatch(&mut count, &InboundEvent::Connect);
        *count.get_mut() += 10;
        conn.dispatch(&mut count, &InboundEvent::Connect);
        assert_eq!(count.into_inner(), 12);
    }
}
