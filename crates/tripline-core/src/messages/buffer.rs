//! Ordered message buffer of the active thread.
//!
//! # Reconciliation
//!
//! A confirmed message is merged with three rules, in order:
//!
//! 1. If its server id is already in the buffer, nothing changes. This runs
//!    first so a replayed echo cannot consume another pending record.
//! 2. Otherwise the earliest pending record with the same author, identical
//!    content and a client timestamp within the window is replaced in place.
//!    The message keeps its position in the thread.
//! 3. Otherwise the message is appended.
//!
//! # Invariants
//!
//! - Each server id appears at most once.
//! - Each [`TempId`] appears at most once.

use std::{collections::HashSet, time::Duration};

use tripline_proto::MessageId;

use super::{
    record::{ConfirmedMessage, Message, PendingMessage, TempId},
    room::ThreadKey,
};

/// Outcome of [`ThreadBuffer::reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Server id already present; buffer unchanged.
    Duplicate,
    /// A pending record was replaced in place.
    Replaced {
        /// Position of the replaced record.
        index: usize,
        /// Local id that was confirmed.
        temp_id: TempId,
    },
    /// No pending record matched; appended at the end.
    Appended {
        /// Position of the new record.
        index: usize,
    },
}

/// Messages of one thread in display order.
#[derive(Debug, Clone)]
pub struct ThreadBuffer {
    key: ThreadKey,
    messages: Vec<Message>,
}

impl ThreadBuffer {
    /// Empty buffer for `key`.
    pub fn new(key: ThreadKey) -> Self {
        Self { key, messages: Vec::new() }
    }

    /// Thread this buffer belongs to.
    pub fn key(&self) -> &ThreadKey {
        &self.key
    }

    /// Messages in display order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the buffer holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of unconfirmed messages.
    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_pending()).count()
    }

    /// Whether a confirmed message with `id` is present.
    pub fn contains_id(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|m| m.confirmed_id() == Some(id))
    }

    /// Append a locally sent message. Returns its position.
    pub fn push_pending(&mut self, pending: PendingMessage) -> usize {
        self.messages.push(Message::Pending(pending));
        self.messages.len() - 1
    }

    /// Merge a server-confirmed message.
    pub fn reconcile(&mut self, confirmed: ConfirmedMessage, window: Duration) -> Reconciliation {
        if self.contains_id(&confirmed.id) {
            tracing::trace!(thread = %self.key, id = %confirmed.id, "duplicate echo ignored");
            return Reconciliation::Duplicate;
        }

        let matched = self.messages.iter().position(|m| match m {
            Message::Pending(p) => p.matches(&confirmed, window),
            Message::Confirmed(_) => false,
        });

        if let Some(index) = matched
            && let Some(temp_id) = self.messages[index].temp_id()
        {
            tracing::debug!(thread = %self.key, %temp_id, id = %confirmed.id, "pending confirmed");
            self.messages[index] = Message::Confirmed(confirmed);
            return Reconciliation::Replaced { index, temp_id };
        }

        self.messages.push(Message::Confirmed(confirmed));
        Reconciliation::Appended { index: self.messages.len() - 1 }
    }

    /// Replace the contents with `history`, keeping what history does not
    /// cover.
    ///
    /// History is deduplicated by id. Live messages that arrived after the
    /// history snapshot are appended after it, and pending records whose echo
    /// is not in the history stay pending. A pending record whose echo is in
    /// the history is dropped in favour of the confirmed copy; each history
    /// entry confirms at most one pending record.
    pub fn rebuild(&mut self, history: Vec<ConfirmedMessage>, window: Duration) {
        let previous = std::mem::take(&mut self.messages);

        let mut seen: HashSet<MessageId> = HashSet::new();
        for msg in history {
            if seen.insert(msg.id.clone()) {
                self.messages.push(Message::Confirmed(msg));
            }
        }
        let history_len = self.messages.len();

        let mut claimed = vec![false; history_len];
        for msg in previous {
            match msg {
                Message::Confirmed(c) => {
                    if seen.insert(c.id.clone()) {
                        self.messages.push(Message::Confirmed(c));
                    }
                },
                Message::Pending(p) => {
                    let echo = self.messages[..history_len].iter().enumerate().position(
                        |(i, m)| {
                            !claimed[i]
                                && matches!(m, Message::Confirmed(c) if p.matches(c, window))
                        },
                    );
                    match echo {
                        Some(i) => claimed[i] = true,
                        None => self.messages.push(Message::Pending(p)),
                    }
                },
            }
        }

        tracing::debug!(
            thread = %self.key,
            len = self.messages.len(),
            pending = self.pending_count(),
            "history loaded"
        );
    }
}
