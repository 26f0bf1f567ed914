//! In-memory REST directory backed by the relay's message store.

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

use thiserror::Error;
use tripline_app::Directory;
use tripline_core::{ConfirmedMessage, ThreadKey};
use tripline_proto::{
    CommunityId, ThreadId, UserId,
    payloads::{
        community::CommunityMessage,
        dm::{DirectMessage, ThreadSummary},
    },
};

/// Messages stored by the relay, shared with every directory.
pub type SharedStore = Rc<RefCell<MessageStore>>;

/// Server-side persistence of the simulation.
#[derive(Debug, Default)]
pub struct MessageStore {
    direct: BTreeMap<ThreadId, Vec<DirectMessage>>,
    participants: BTreeMap<ThreadId, BTreeSet<UserId>>,
    community: BTreeMap<CommunityId, Vec<CommunityMessage>>,
    /// Messages of each thread already read by each user.
    read: BTreeMap<(UserId, ThreadId), usize>,
}

impl MessageStore {
    /// Empty shared store.
    pub fn shared() -> SharedStore {
        Rc::new(RefCell::new(Self::default()))
    }

    /// Persist a direct message between `sender` and `receiver`.
    pub fn record_direct(&mut self, msg: DirectMessage, receiver: &UserId) {
        let members = self.participants.entry(msg.conversation_id.clone()).or_default();
        members.insert(msg.sender_id.clone());
        members.insert(receiver.clone());
        self.direct.entry(msg.conversation_id.clone()).or_default().push(msg);
    }

    /// Persist a community message.
    pub fn record_community(&mut self, msg: CommunityMessage) {
        self.community.entry(msg.community_id.clone()).or_default().push(msg);
    }

    /// Stored messages of a thread.
    pub fn history(&self, thread: &ThreadKey) -> Vec<ConfirmedMessage> {
        match thread {
            ThreadKey::Direct { thread, .. } => self
                .direct
                .get(thread)
                .map(|msgs| msgs.iter().map(ConfirmedMessage::from).collect())
                .unwrap_or_default(),
            ThreadKey::Community(id) => self
                .community
                .get(id)
                .map(|msgs| msgs.iter().map(ConfirmedMessage::from).collect())
                .unwrap_or_default(),
        }
    }

    /// Conversation summaries of `user`, most recent first.
    pub fn threads_of(&self, user: &UserId) -> Vec<ThreadSummary> {
        let mut threads: Vec<ThreadSummary> = self
            .participants
            .iter()
            .filter(|(_, members)| members.contains(user))
            .filter_map(|(thread, members)| {
                let peer = members.iter().find(|m| *m != user).unwrap_or(user).clone();
                let msgs = self.direct.get(thread)?;
                let last = msgs.last()?;
                let read = self.read.get(&(user.clone(), thread.clone())).copied().unwrap_or(0);
                let unread = msgs.iter().skip(read).filter(|m| &m.sender_id != user).count();
                Some(ThreadSummary {
                    id: thread.clone(),
                    participant: peer,
                    unread: u32::try_from(unread).unwrap_or(u32::MAX),
                    last_message: Some(last.content.clone()),
                    last_activity: Some(last.created_at),
                })
            })
            .collect();
        threads.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        threads
    }

    /// Record that `user` has read everything in `thread`.
    pub fn mark_read(&mut self, user: &UserId, thread: &ThreadId) {
        let count = self.direct.get(thread).map_or(0, Vec::len);
        self.read.insert((user.clone(), thread.clone()), count);
    }
}

/// Failure injected into a [`SimDirectory`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("directory unavailable")]
pub struct DirectoryUnavailable;

/// [`Directory`] for one simulated user.
#[derive(Debug, Clone)]
pub struct SimDirectory {
    user: UserId,
    store: SharedStore,
    failing: Rc<RefCell<bool>>,
    calls: Rc<RefCell<Vec<String>>>,
}

impl SimDirectory {
    /// Directory of `user` over `store`.
    pub fn new(user: UserId, store: SharedStore) -> Self {
        Self {
            user,
            store,
            failing: Rc::new(RefCell::new(false)),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Make every request fail until reset.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.borrow_mut() = failing;
    }

    /// Requests served so far, as `fetch_threads`, `fetch_history:<thread>`
    /// or `mark_read:<thread>`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) -> Result<(), DirectoryUnavailable> {
        self.calls.borrow_mut().push(call);
        if *self.failing.borrow() { Err(DirectoryUnavailable) } else { Ok(()) }
    }
}

impl Directory for SimDirectory {
    type Error = DirectoryUnavailable;

    async fn fetch_threads(&mut self) -> Result<Vec<ThreadSummary>, Self::Error> {
        self.record("fetch_threads".to_string())?;
        Ok(self.store.borrow().threads_of(&self.user))
    }

    async fn fetch_history(
        &mut self,
        thread: &ThreadKey,
    ) -> Result<Vec<ConfirmedMessage>, Self::Error> {
        self.record(format!("fetch_history:{thread}"))?;
        Ok(self.store.borrow().history(thread))
    }

    async fn mark_read(&mut self, thread: &ThreadId) -> Result<(), Self::Error> {
        self.record(format!("mark_read:{thread}"))?;
        self.store.borrow_mut().mark_read(&self.user, thread);
        Ok(())
    }
}
