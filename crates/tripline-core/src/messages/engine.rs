//! Optimistic send and reconciliation for chat threads.
//!
//! The engine owns the buffer of the thread being read, its room membership
//! and the conversation list. It is driven by three kinds of input:
//!
//! - user operations ([`MessageSyncEngine::open`], [`MessageSyncEngine::send`], ...)
//! - inbound events routed by the session
//! - REST results (history, thread list) delivered by the runtime
//!
//! Every call returns [`SyncAction`]s; the engine itself never emits.
//!
//! # Room fencing
//!
//! Scoped events and history responses are compared against the active
//! [`ThreadKey`]. Anything for another room never touches the buffer, which is
//! what keeps rapid thread switching from mixing threads.

use std::time::Duration;

use tripline_proto::{
    OutboundEvent, ThreadId, Timestamp, UserId,
    payloads::{
        community::{CommunityMessage, SendCommunityMessage},
        dm::{DirectMessage, SendDm, ThreadSummary},
    },
};

use super::{
    buffer::{Reconciliation, ThreadBuffer},
    record::{ConfirmedMessage, Draft, Message, PendingMessage, TempId},
    room::{Membership, ThreadKey},
    threads::ThreadList,
};
use crate::{action::SyncAction, error::SyncError};

/// Default tolerance between a pending record's client timestamp and its
/// echo's server timestamp.
pub const DEFAULT_RECONCILE_WINDOW: Duration = Duration::from_secs(10);

/// Tunables of the message engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Maximum clock distance for a pending record to match its echo.
    pub reconcile_window: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { reconcile_window: DEFAULT_RECONCILE_WINDOW }
    }
}

/// Message synchronization for one session.
#[derive(Debug)]
pub struct MessageSyncEngine {
    user_id: UserId,
    config: SyncConfig,
    membership: Membership,
    buffer: Option<ThreadBuffer>,
    threads: ThreadList,
    next_temp: u64,
}

impl MessageSyncEngine {
    /// Engine for the local user `user_id`.
    pub fn new(user_id: UserId, config: SyncConfig) -> Self {
        Self {
            user_id,
            config,
            membership: Membership::Idle,
            buffer: None,
            threads: ThreadList::new(),
            next_temp: 1,
        }
    }

    /// Local user.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Engine tunables.
    pub fn config(&self) -> SyncConfig {
        self.config
    }

    /// Thread being read.
    pub fn active(&self) -> Option<&ThreadKey> {
        self.buffer.as_ref().map(ThreadBuffer::key)
    }

    /// Room membership of the active thread.
    pub fn membership(&self) -> Membership {
        self.membership
    }

    /// Buffer of the active thread.
    pub fn buffer(&self) -> Option<&ThreadBuffer> {
        self.buffer.as_ref()
    }

    /// Messages of the active thread, empty when none is open.
    pub fn messages(&self) -> &[Message] {
        match &self.buffer {
            Some(buffer) => buffer.messages(),
            None => &[],
        }
    }

    /// Conversation list.
    pub fn threads(&self) -> &ThreadList {
        &self.threads
    }

    /// Open `key`, leaving the previously open room first.
    ///
    /// The join is emitted only while `connected`; otherwise the room waits in
    /// [`Membership::Joining`] for [`Self::handle_connected`]. Opening the
    /// thread that is already active does nothing.
    pub fn open(&mut self, key: ThreadKey, connected: bool) -> Vec<SyncAction> {
        if self.active() == Some(&key) {
            return Vec::new();
        }

        let mut actions = self.leave_active();

        tracing::debug!(thread = %key, connected, "opening thread");
        self.buffer = Some(ThreadBuffer::new(key.clone()));
        self.transition(Membership::Joining);
        if connected {
            actions.push(SyncAction::Emit(key.join_event()));
            self.transition(Membership::Joined);
        }

        actions.push(SyncAction::FetchHistory { thread: key });
        actions.push(SyncAction::Render);
        actions
    }

    /// Leave the active room and drop its buffer.
    pub fn close(&mut self) -> Vec<SyncAction> {
        if self.buffer.is_none() {
            return Vec::new();
        }
        let mut actions = self.leave_active();
        actions.push(SyncAction::Render);
        actions
    }

    fn leave_active(&mut self) -> Vec<SyncAction> {
        let Some(previous) = self.buffer.take() else {
            return Vec::new();
        };

        let mut actions = Vec::new();
        if self.membership == Membership::Joined {
            self.transition(Membership::Leaving);
            actions.push(SyncAction::Emit(previous.key().leave_event()));
        }
        self.transition(Membership::Idle);
        tracing::debug!(thread = %previous.key(), "left thread");
        actions
    }

    fn transition(&mut self, next: Membership) {
        tracing::trace!(from = ?self.membership, to = ?next, "membership");
        self.membership = next;
    }

    /// Connection came up: join the room that is waiting for it.
    pub fn handle_connected(&mut self) -> Vec<SyncAction> {
        if self.membership != Membership::Joining {
            return Vec::new();
        }
        let Some(key) = self.active().cloned() else {
            return Vec::new();
        };
        self.transition(Membership::Joined);
        vec![SyncAction::Emit(key.join_event())]
    }

    /// Connection dropped: the server forgot the room, rejoin on reconnect.
    pub fn handle_disconnected(&mut self) {
        if self.membership == Membership::Joined {
            self.transition(Membership::Joining);
        }
    }

    /// Append a pending record and emit it.
    ///
    /// While disconnected the emit is dropped by the connection but the
    /// pending record stays in the buffer.
    pub fn send(&mut self, draft: Draft, now: Timestamp) -> Result<Vec<SyncAction>, SyncError> {
        if draft.is_empty() {
            return Err(SyncError::EmptyMessage);
        }
        let temp_id = TempId::new(self.next_temp);
        let Some(buffer) = self.buffer.as_mut() else {
            return Err(SyncError::NoActiveThread);
        };
        self.next_temp += 1;

        let event = match buffer.key() {
            ThreadKey::Direct { thread, peer } => OutboundEvent::SendDm(SendDm {
                receiver_id: peer.clone(),
                message: draft.content.clone(),
                kind: draft.kind,
                conversation_id: thread.clone(),
                reply_to: draft.reply_to.clone(),
            }),
            ThreadKey::Community(id) => {
                OutboundEvent::SendCommunityMessage(SendCommunityMessage {
                    community_id: id.clone(),
                    message: draft.content.clone(),
                    kind: draft.kind,
                    image_url: draft.image_url.clone(),
                })
            },
        };

        let index = buffer.push_pending(PendingMessage {
            temp_id,
            author: self.user_id.clone(),
            content: draft.content,
            kind: draft.kind,
            sent_at: now,
            reply_to: draft.reply_to,
            image_url: draft.image_url,
        });
        tracing::debug!(thread = %buffer.key(), %temp_id, index, "pending message added");

        Ok(vec![SyncAction::Emit(event), SyncAction::Render])
    }

    /// A `receive_dm` arrived.
    pub fn handle_direct(&mut self, msg: &DirectMessage) -> Vec<SyncAction> {
        let thread = &msg.conversation_id;
        let own = msg.sender_id == self.user_id;
        let window = self.config.reconcile_window;

        let mut actions = Vec::new();
        match self.buffer.as_mut() {
            Some(buffer) if buffer.key().is_direct(thread) => {
                if buffer.reconcile(ConfirmedMessage::from(msg), window)
                    != Reconciliation::Duplicate
                {
                    actions.push(SyncAction::Render);
                }
                self.threads.note_message(thread, None, &msg.content, msg.created_at, false);
            },
            _ => {
                tracing::trace!(%thread, "message for inactive thread");
                let peer = (!own).then_some(&msg.sender_id);
                self.threads.note_message(thread, peer, &msg.content, msg.created_at, !own);
                actions.push(SyncAction::Render);
            },
        }

        if self.threads.request_refresh() {
            actions.push(SyncAction::RefreshThreads);
        }
        actions
    }

    /// A `receive_community_message` arrived.
    ///
    /// Community rooms are not part of the conversation list, so only the
    /// active buffer is affected.
    pub fn handle_community(&mut self, msg: &CommunityMessage) -> Vec<SyncAction> {
        let window = self.config.reconcile_window;
        match self.buffer.as_mut() {
            Some(buffer) if buffer.key().is_community(&msg.community_id) => {
                match buffer.reconcile(ConfirmedMessage::from(msg), window) {
                    Reconciliation::Duplicate => Vec::new(),
                    _ => vec![SyncAction::Render],
                }
            },
            _ => {
                tracing::trace!(community = %msg.community_id, "message for inactive room");
                Vec::new()
            },
        }
    }

    /// History for `thread` arrived from the directory.
    ///
    /// Ignored unless `thread` is still the active thread.
    pub fn load_history(
        &mut self,
        thread: &ThreadKey,
        history: Vec<ConfirmedMessage>,
    ) -> Vec<SyncAction> {
        let window = self.config.reconcile_window;
        match self.buffer.as_mut() {
            Some(buffer) if buffer.key() == thread => {
                buffer.rebuild(history, window);
                vec![SyncAction::Render]
            },
            _ => {
                tracing::debug!(%thread, "discarding history for inactive thread");
                Vec::new()
            },
        }
    }

    /// Clear the unread counter of `thread` and notify the read-receipt
    /// service.
    pub fn mark_read(&mut self, thread: &ThreadId) -> Vec<SyncAction> {
        self.threads.mark_read(thread);
        vec![SyncAction::MarkRead { thread: thread.clone() }, SyncAction::Render]
    }

    /// Fresh conversation list from the directory.
    pub fn apply_thread_list(&mut self, threads: Vec<ThreadSummary>) -> Vec<SyncAction> {
        let reading = self.active().and_then(ThreadKey::thread_id).cloned();
        self.threads.replace(threads, reading.as_ref());
        vec![SyncAction::Render]
    }

    /// The conversation list was shown or hidden.
    pub fn set_visible(&mut self, visible: bool) -> Vec<SyncAction> {
        if self.threads.set_visible(visible) {
            vec![SyncAction::RefreshThreads]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use tripline_proto::{CommunityId, MessageId, payloads::MessageKind};

    use super::*;

    fn engine() -> MessageSyncEngine {
        MessageSyncEngine::new(UserId::new("u1"), SyncConfig::default())
    }

    fn dm(id: &str, thread: &str, sender: &str, content: &str, at: u64) -> DirectMessage {
        DirectMessage {
            id: MessageId::new(id),
            conversation_id: ThreadId::new(thread),
            sender_id: UserId::new(sender),
            content: content.into(),
            kind: MessageKind::Text,
            created_at: Timestamp::from_millis(at),
            reply_to: None,
        }
    }

    fn emits(actions: &[SyncAction]) -> Vec<OutboundEvent> {
        actions
            .iter()
            .filter_map(|a| match a {
                SyncAction::Emit(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn switching_threads_leaves_before_joining() {
        let mut engine = engine();
        let a = ThreadKey::direct("c1", "u2");
        let b = ThreadKey::direct("c2", "u3");
        engine.open(a.clone(), true);

        let actions = engine.open(b.clone(), true);

        assert_eq!(emits(&actions), [a.leave_event(), b.join_event()]);
        assert_eq!(engine.membership(), Membership::Joined);
        assert!(actions.contains(&SyncAction::FetchHistory { thread: b }));
    }

    #[test]
    fn reopening_active_thread_is_noop() {
        let mut engine = engine();
        let a = ThreadKey::direct("c1", "u2");
        engine.open(a.clone(), true);
        assert!(engine.open(a, true).is_empty());
    }

    #[test]
    fn join_waits_for_connection() {
        let mut engine = engine();
        let a = ThreadKey::community("paris");

        let actions = engine.open(a.clone(), false);
        assert!(emits(&actions).is_empty());
        assert_eq!(engine.membership(), Membership::Joining);

        assert_eq!(emits(&engine.handle_connected()), [a.join_event()]);
        engine.handle_disconnected();
        assert_eq!(engine.membership(), Membership::Joining);
        assert_eq!(emits(&engine.handle_connected()), [a.join_event()]);
    }

    #[test]
    fn send_without_thread_fails() {
        let mut engine = engine();
        assert_eq!(
            engine.send(Draft::text("hi"), Timestamp::from_millis(1)),
            Err(SyncError::NoActiveThread)
        );
    }

    #[test]
    fn empty_draft_is_rejected() {
        let mut engine = engine();
        engine.open(ThreadKey::direct("c1", "u2"), true);
        assert_eq!(
            engine.send(Draft::text("   "), Timestamp::from_millis(1)),
            Err(SyncError::EmptyMessage)
        );
        assert!(engine.messages().is_empty());
    }

    #[test]
    fn send_then_echo_leaves_one_confirmed() {
        let mut engine = engine();
        engine.open(ThreadKey::direct("c1", "u2"), true);

        let actions = engine.send(Draft::text("Hello"), Timestamp::from_millis(1_000)).unwrap();
        assert!(matches!(
            &emits(&actions)[..],
            [OutboundEvent::SendDm(SendDm { receiver_id, .. })] if receiver_id.as_str() == "u2"
        ));
        assert_eq!(engine.messages()[0].temp_id(), Some(TempId::new(1)));

        engine.handle_direct(&dm("m42", "c1", "u1", "Hello", 1_300));

        assert_eq!(engine.messages().len(), 1);
        assert_eq!(engine.messages()[0].confirmed_id(), Some(&MessageId::new("m42")));
    }

    #[test]
    fn inactive_thread_message_bumps_unread_only() {
        let mut engine = engine();
        engine.open(ThreadKey::direct("c1", "u2"), true);

        let actions = engine.handle_direct(&dm("m7", "c9", "u5", "psst", 2_000));

        assert!(engine.messages().is_empty());
        assert!(actions.contains(&SyncAction::RefreshThreads));
        let summary = engine.threads().get(&ThreadId::new("c9")).unwrap();
        assert_eq!(summary.unread, 1);
        assert_eq!(summary.participant, UserId::new("u5"));
    }

    #[test]
    fn hidden_list_defers_refresh() {
        let mut engine = engine();
        engine.set_visible(false);

        let actions = engine.handle_direct(&dm("m7", "c9", "u5", "psst", 2_000));
        assert!(!actions.contains(&SyncAction::RefreshThreads));

        assert_eq!(engine.set_visible(true), [SyncAction::RefreshThreads]);
    }

    #[test]
    fn stale_history_is_discarded() {
        let mut engine = engine();
        let a = ThreadKey::direct("c1", "u2");
        let b = ThreadKey::direct("c2", "u3");
        engine.open(a.clone(), true);
        engine.open(b, true);

        let history = vec![ConfirmedMessage::from(&dm("m1", "c1", "u2", "old", 10))];
        assert!(engine.load_history(&a, history).is_empty());
        assert!(engine.messages().is_empty());
    }

    #[test]
    fn community_messages_are_fenced_by_room() {
        let mut engine = engine();
        engine.open(ThreadKey::community("paris"), true);

        let msg = |room: &str| CommunityMessage {
            id: MessageId::new("m1"),
            community_id: CommunityId::new(room),
            sender_id: UserId::new("u4"),
            content: "bonjour".into(),
            kind: MessageKind::Text,
            image_url: None,
            created_at: Timestamp::from_millis(5),
        };

        assert!(engine.handle_community(&msg("rome")).is_empty());
        assert_eq!(engine.handle_community(&msg("paris")), [SyncAction::Render]);
        assert!(engine.handle_community(&msg("paris")).is_empty());
        assert_eq!(engine.messages().len(), 1);
    }

    #[test]
    fn thread_list_keeps_active_thread_read() {
        let mut engine = engine();
        engine.open(ThreadKey::direct("c1", "u2"), true);

        let listed = ThreadSummary { unread: 4, ..ThreadSummary::new("c1".into(), "u2".into()) };
        engine.apply_thread_list(vec![listed]);

        assert_eq!(engine.threads().unread_total(), 0);
    }

    #[test]
    fn mark_read_requests_receipt() {
        let mut engine = engine();
        let c1 = ThreadId::new("c1");
        let listed = ThreadSummary { unread: 2, ..ThreadSummary::new(c1.clone(), "u2".into()) };
        engine.apply_thread_list(vec![listed]);

        let actions = engine.mark_read(&c1);

        assert!(actions.contains(&SyncAction::MarkRead { thread: c1 }));
        assert_eq!(engine.threads().unread_total(), 0);
    }
}
