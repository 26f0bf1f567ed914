//! Session orchestration.
//!
//! A [`Session`] exists per authenticated user. It owns the single
//! [`ConnectionManager`] and the [`SessionState`] handed to listeners, and it
//! mounts surfaces on top of them.
//!
//! # Subscriptions
//!
//! | Owner | Registered | Released | Events |
//! |---|---|---|---|
//! | session | login | logout | `connect`, `user_status`, `connect_error`, `error` |
//! | chat surface | mount | unmount | `connect`, `disconnect`, `receive_dm`, `receive_community_message` |
//! | map surface | mount | unmount | `connect`, `disconnect`, `map_update` |
//!
//! Each owner holds a [`Subscription`] and releases exactly what it
//! registered, so repeated mount/unmount cycles never accumulate listeners.
//! Remounting a mounted surface releases the old subscription first.
//!
//! # Flushing
//!
//! Engines and listeners only queue [`SyncAction`]s. [`Session::take_actions`]
//! sends queued emits on the connection, delivers locally synthesized events
//! (open and send failures) and returns the remaining actions for the runtime
//! to execute.

use std::rc::Rc;

use tripline_core::{
    ConfirmedMessage, ConnectionHandle, ConnectionManager, Draft, Environment, Listener,
    MapSyncEngine, MessageSyncEngine, Notice, Subscription, SyncAction, ThreadKey, Transport,
};
use tripline_proto::{
    EventName, InboundEvent, ThreadId, TripId,
    payloads::{
        dm::ThreadSummary,
        map::{Coordinate, Waypoint},
    },
};

use crate::{Command, SessionConfig, SessionError, SessionState};

/// One authenticated session.
pub struct Session<T: Transport, E: Environment> {
    env: E,
    config: SessionConfig,
    connection: ConnectionManager<T, SessionState>,
    state: SessionState,
    session_sub: Option<Subscription<SessionState>>,
    messages_sub: Option<Subscription<SessionState>>,
    map_sub: Option<Subscription<SessionState>>,
}

impl<T: Transport, E: Environment> Session<T, E> {
    /// Create a session. Nothing is connected until [`Self::login`].
    pub fn new(transport: T, env: E, config: SessionConfig) -> Self {
        let state = SessionState::new(config.user_id.clone());
        Self {
            env,
            config,
            connection: ConnectionManager::new(transport),
            state,
            session_sub: None,
            messages_sub: None,
            map_sub: None,
        }
    }

    /// Listener context.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The session connection.
    pub fn connection(&self) -> &ConnectionManager<T, SessionState> {
        &self.connection
    }

    /// The session connection, mutably.
    pub fn connection_mut(&mut self) -> &mut ConnectionManager<T, SessionState> {
        &mut self.connection
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether emits currently reach the server.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Register an extra listener (for surfaces outside this crate).
    pub fn on(&mut self, name: EventName, listener: Listener<SessionState>) {
        self.connection.on(name, listener);
    }

    /// Deregister a listener registered with [`Self::on`].
    pub fn off(&mut self, name: EventName, listener: &Listener<SessionState>) -> bool {
        self.connection.off(name, listener)
    }

    /// Apply a user operation.
    pub fn execute(&mut self, command: Command) -> Result<(), SessionError> {
        match command {
            Command::Login { credential } => {
                self.login(credential.as_deref());
                Ok(())
            },
            Command::Logout => {
                self.logout();
                Ok(())
            },
            Command::MountMessages => {
                self.mount_messages();
                Ok(())
            },
            Command::UnmountMessages => {
                self.unmount_messages();
                Ok(())
            },
            Command::OpenThread(key) => self.open_thread(key),
            Command::CloseThread => self.close_thread(),
            Command::Send(draft) => self.send_message(draft),
            Command::MarkRead(thread) => self.mark_read(&thread),
            Command::SetListVisible(visible) => self.set_list_visible(visible),
            Command::MountMap { trip_id, start, end, waypoints, read_only } => {
                self.mount_map(trip_id, start, end, waypoints, read_only);
                Ok(())
            },
            Command::UnmountMap => {
                self.unmount_map();
                Ok(())
            },
            Command::AddWaypoint(at) => self.add_waypoint(at),
            Command::DeleteWaypoint(index) => self.delete_waypoint(index),
            Command::UndoWaypoint => self.undo_waypoint(),
            Command::SetReadOnly(read_only) => self.set_read_only(read_only),
        }
    }

    /// Connect with `credential` and subscribe the session-wide listeners.
    ///
    /// Returns `None` while no credential is available, or when the transport
    /// refused to open (reported through a `connect_error` notice). Calling it
    /// again during a live session returns the same handle and registers
    /// nothing.
    pub fn login(&mut self, credential: Option<&str>) -> Option<ConnectionHandle> {
        let credential = credential.filter(|c| !c.is_empty())?;
        if self.session_sub.is_none() {
            self.session_sub = Some(session_listeners(&mut self.connection));
            tracing::info!(user = %self.state.user_id, "logged in");
        }
        self.connection.connect(&self.config.endpoint, Some(credential))
    }

    /// Unmount every surface, release all subscriptions and close the
    /// connection.
    pub fn logout(&mut self) {
        self.unmount_messages();
        self.unmount_map();
        self.flush_emits();

        if let Some(sub) = self.session_sub.take() {
            sub.release(&mut self.connection);
        }
        self.connection.disconnect();
        self.state.presence.reset();
        tracing::info!(user = %self.state.user_id, "logged out");
    }

    /// Deliver an inbound event to the listeners.
    pub fn handle_event(&mut self, event: &InboundEvent) {
        self.connection.dispatch(&mut self.state, event);
    }

    /// Flush queued emits and return the actions for the runtime.
    pub fn take_actions(&mut self) -> Vec<SyncAction> {
        let mut ready = Vec::new();
        loop {
            self.connection.dispatch_deferred(&mut self.state);
            let queued = std::mem::take(&mut self.state.outbox);
            if queued.is_empty() {
                break;
            }
            for action in queued {
                match action {
                    SyncAction::Emit(event) => {
                        self.connection.emit(&event);
                    },
                    other => ready.push(other),
                }
            }
        }
        ready
    }

    fn flush_emits(&mut self) {
        let rest = self.take_actions();
        self.state.push(rest);
    }

    /// Mount the chat surface.
    pub fn mount_messages(&mut self) {
        if let Some(old) = self.messages_sub.take() {
            tracing::debug!("remounting chat surface");
            old.release(&mut self.connection);
        }
        let engine = MessageSyncEngine::new(self.state.user_id.clone(), self.config.sync_config());
        self.state.messages = Some(engine);
        self.messages_sub = Some(message_listeners(&mut self.connection));
        self.state.push([SyncAction::RefreshThreads, SyncAction::Render]);
    }

    /// Unmount the chat surface, leaving its room.
    pub fn unmount_messages(&mut self) {
        if let Some(sub) = self.messages_sub.take() {
            sub.release(&mut self.connection);
        }
        if let Some(mut engine) = self.state.messages.take() {
            let actions = engine.close();
            self.state.push(actions);
        }
    }

    fn messages_mut(&mut self) -> Result<&mut MessageSyncEngine, SessionError> {
        self.state.messages.as_mut().ok_or(SessionError::NotMounted("chat"))
    }

    /// Open `key` on the chat surface.
    pub fn open_thread(&mut self, key: ThreadKey) -> Result<(), SessionError> {
        let connected = self.connection.is_connected();
        let actions = self.messages_mut()?.open(key, connected);
        self.state.push(actions);
        Ok(())
    }

    /// Close the open thread.
    pub fn close_thread(&mut self) -> Result<(), SessionError> {
        let actions = self.messages_mut()?.close();
        self.state.push(actions);
        Ok(())
    }

    /// Send `draft` to the open thread.
    pub fn send_message(&mut self, draft: Draft) -> Result<(), SessionError> {
        if self.session_sub.is_none() {
            return Err(SessionError::LoggedOut);
        }
        let now = self.env.now();
        let actions = self.messages_mut()?.send(draft, now)?;
        self.state.push(actions);
        Ok(())
    }

    /// Mark `thread` as read.
    pub fn mark_read(&mut self, thread: &ThreadId) -> Result<(), SessionError> {
        let actions = self.messages_mut()?.mark_read(thread);
        self.state.push(actions);
        Ok(())
    }

    /// Show or hide the conversation list.
    pub fn set_list_visible(&mut self, visible: bool) -> Result<(), SessionError> {
        let actions = self.messages_mut()?.set_visible(visible);
        self.state.push(actions);
        Ok(())
    }

    /// Conversation list fetched by the directory.
    pub fn apply_thread_list(&mut self, threads: Vec<ThreadSummary>) {
        if let Some(engine) = self.state.messages.as_mut() {
            let actions = engine.apply_thread_list(threads);
            self.state.push(actions);
        }
    }

    /// History fetched by the directory.
    pub fn load_history(&mut self, thread: &ThreadKey, history: Vec<ConfirmedMessage>) {
        if let Some(engine) = self.state.messages.as_mut() {
            let actions = engine.load_history(thread, history);
            self.state.push(actions);
        }
    }

    /// Mount the map surface for `trip_id`.
    pub fn mount_map(
        &mut self,
        trip_id: TripId,
        start: Waypoint,
        end: Waypoint,
        waypoints: Vec<Waypoint>,
        read_only: bool,
    ) {
        if self.map_sub.is_some() {
            tracing::debug!("remounting map surface");
            self.unmount_map();
        }
        let mut engine = MapSyncEngine::new(self.state.user_id.clone(), trip_id, start, end);
        engine.set_read_only(read_only);
        engine.load(waypoints);

        let connected = self.connection.is_connected();
        let actions = engine.mount(connected);
        self.state.map = Some(engine);
        self.state.push(actions);
        self.map_sub = Some(map_listeners(&mut self.connection));
    }

    /// Unmount the map surface, leaving its squad room.
    pub fn unmount_map(&mut self) {
        if let Some(sub) = self.map_sub.take() {
            sub.release(&mut self.connection);
        }
        let connected = self.connection.is_connected();
        if let Some(mut engine) = self.state.map.take() {
            let actions = engine.unmount(connected);
            self.state.push(actions);
        }
    }

    fn map_mut(&mut self) -> Result<&mut MapSyncEngine, SessionError> {
        self.state.map.as_mut().ok_or(SessionError::NotMounted("map"))
    }

    /// Append a stop to the route.
    pub fn add_waypoint(&mut self, at: Coordinate) -> Result<(), SessionError> {
        let actions = self.map_mut()?.add_waypoint(at)?;
        self.state.push(actions);
        Ok(())
    }

    /// Remove the stop at `index`.
    pub fn delete_waypoint(&mut self, index: usize) -> Result<(), SessionError> {
        let actions = self.map_mut()?.delete_waypoint(index)?;
        self.state.push(actions);
        Ok(())
    }

    /// Remove the last stop.
    pub fn undo_waypoint(&mut self) -> Result<(), SessionError> {
        let actions = self.map_mut()?.undo_last()?;
        self.state.push(actions);
        Ok(())
    }

    /// Allow or forbid local route edits.
    pub fn set_read_only(&mut self, read_only: bool) -> Result<(), SessionError> {
        self.map_mut()?.set_read_only(read_only);
        Ok(())
    }

    /// Queue a notice for a rejected operation.
    pub fn reject(&mut self, err: &SessionError) {
        tracing::debug!(error = %err, "operation rejected");
        self.state.push([SyncAction::Notify(Notice::Rejected { reason: err.to_string() })]);
    }
}

fn session_listeners<T: Transport>(
    connection: &mut ConnectionManager<T, SessionState>,
) -> Subscription<SessionState> {
    let mut sub = Subscription::new();

    sub.on(
        connection,
        EventName::Connect,
        Rc::new(|state: &mut SessionState, _: &InboundEvent| state.presence.reset()),
    );
    sub.on(
        connection,
        EventName::UserStatus,
        Rc::new(|state: &mut SessionState, event: &InboundEvent| {
            if let InboundEvent::UserStatus(status) = event {
                state.presence.apply(status);
            }
        }),
    );

    let report: Listener<SessionState> = Rc::new(|state: &mut SessionState, event: &InboundEvent| {
        if let InboundEvent::ConnectError(notice) | InboundEvent::Error(notice) = event {
            state.push([SyncAction::Notify(Notice::ConnectionError {
                message: notice.message.clone(),
            })]);
        }
    });
    sub.on(connection, EventName::ConnectError, Rc::clone(&report));
    sub.on(connection, EventName::Error, report);

    sub
}

fn message_listeners<T: Transport>(
    connection: &mut ConnectionManager<T, SessionState>,
) -> Subscription<SessionState> {
    let mut sub = Subscription::new();

    sub.on(
        connection,
        EventName::Connect,
        Rc::new(|state: &mut SessionState, _: &InboundEvent| {
            if let Some(engine) = state.messages.as_mut() {
                let actions = engine.handle_connected();
                state.outbox.extend(actions);
            }
        }),
    );
    sub.on(
        connection,
        EventName::Disconnect,
        Rc::new(|state: &mut SessionState, _: &InboundEvent| {
            if let Some(engine) = state.messages.as_mut() {
                engine.handle_disconnected();
            }
        }),
    );
    sub.on(
        connection,
        EventName::ReceiveDm,
        Rc::new(|state: &mut SessionState, event: &InboundEvent| {
            if let InboundEvent::ReceiveDm(msg) = event
                && let Some(engine) = state.messages.as_mut()
            {
                let actions = engine.handle_direct(msg);
                state.outbox.extend(actions);
            }
        }),
    );
    sub.on(
        connection,
        EventName::ReceiveCommunityMessage,
        Rc::new(|state: &mut SessionState, event: &InboundEvent| {
            if let InboundEvent::ReceiveCommunityMessage(msg) = event
                && let Some(engine) = state.messages.as_mut()
            {
                let actions = engine.handle_community(msg);
                state.outbox.extend(actions);
            }
        }),
    );

    sub
}

fn map_listeners<T: Transport>(
    connection: &mut ConnectionManager<T, SessionState>,
) -> Subscription<SessionState> {
    let mut sub = Subscription::new();

    sub.on(
        connection,
        EventName::Connect,
        Rc::new(|state: &mut SessionState, _: &InboundEvent| {
            if let Some(engine) = state.map.as_mut() {
                let actions = engine.handle_connected();
                state.outbox.extend(actions);
            }
        }),
    );
    sub.on(
        connection,
        EventName::Disconnect,
        Rc::new(|state: &mut SessionState, _: &InboundEvent| {
            if let Some(engine) = state.map.as_mut() {
                engine.handle_disconnected();
            }
        }),
    );
    sub.on(
        connection,
        EventName::MapUpdate,
        Rc::new(|state: &mut SessionState, event: &InboundEvent| {
            if let InboundEvent::MapUpdate(update) = event
                && let Some(engine) = state.map.as_mut()
            {
                let actions = engine.apply_remote(update);
                state.outbox.extend(actions);
            }
        }),
    );

    sub
}
