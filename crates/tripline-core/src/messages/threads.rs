//! Thread summaries shown in the conversation list.

use tripline_proto::{ThreadId, Timestamp, UserId, payloads::dm::ThreadSummary};

/// Conversation list, most recent first.
///
/// The authoritative list comes from the REST directory. Between refreshes the
/// engine patches it locally so unread counts and previews move as messages
/// arrive. Refreshes requested while the list is hidden are deferred until it
/// is shown again.
#[derive(Debug, Clone)]
pub struct ThreadList {
    threads: Vec<ThreadSummary>,
    visible: bool,
    refresh_deferred: bool,
}

impl Default for ThreadList {
    fn default() -> Self {
        Self { threads: Vec::new(), visible: true, refresh_deferred: false }
    }
}

impl ThreadList {
    /// Empty, visible list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Summaries in display order.
    pub fn threads(&self) -> &[ThreadSummary] {
        &self.threads
    }

    /// Summary of `thread`.
    pub fn get(&self, thread: &ThreadId) -> Option<&ThreadSummary> {
        self.threads.iter().find(|t| &t.id == thread)
    }

    /// Sum of unread counters.
    pub fn unread_total(&self) -> u32 {
        self.threads.iter().map(|t| t.unread).sum()
    }

    /// Whether the list is on screen.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether a refresh was skipped while hidden.
    pub fn has_deferred_refresh(&self) -> bool {
        self.refresh_deferred
    }

    /// Replace with a freshly fetched list.
    ///
    /// The thread being read stays at zero unread.
    pub fn replace(&mut self, threads: Vec<ThreadSummary>, reading: Option<&ThreadId>) {
        self.threads = threads;
        if let Some(reading) = reading
            && let Some(t) = self.threads.iter_mut().find(|t| &t.id == reading)
        {
            t.unread = 0;
        }
    }

    /// Ask for a refresh. Returns whether to fetch now.
    pub fn request_refresh(&mut self) -> bool {
        if self.visible {
            return true;
        }
        self.refresh_deferred = true;
        false
    }

    /// Show or hide the list. Returns whether a deferred refresh is now due.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        self.visible = visible;
        if visible && self.refresh_deferred {
            self.refresh_deferred = false;
            return true;
        }
        false
    }

    /// Zero the unread counter of `thread`. Returns whether it changed.
    pub fn mark_read(&mut self, thread: &ThreadId) -> bool {
        match self.threads.iter_mut().find(|t| &t.id == thread) {
            Some(t) if t.unread > 0 => {
                t.unread = 0;
                true
            },
            _ => false,
        }
    }

    /// Record an arriving message and move its thread to the top.
    ///
    /// `participant` seeds the summary when the thread is not listed yet;
    /// `None` means the participant is unknown and an unlisted thread is left
    /// for the next refresh.
    pub fn note_message(
        &mut self,
        thread: &ThreadId,
        participant: Option<&UserId>,
        preview: &str,
        at: Timestamp,
        unread: bool,
    ) {
        let position = self.threads.iter().position(|t| &t.id == thread);
        let mut summary = match (position, participant) {
            (Some(i), _) => self.threads.remove(i),
            (None, Some(peer)) => ThreadSummary::new(thread.clone(), peer.clone()),
            (None, None) => return,
        };

        if unread {
            summary.unread = summary.unread.saturating_add(1);
        }
        summary.last_message = Some(preview.to_string());
        summary.last_activity = Some(at);
        self.threads.insert(0, summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, unread: u32) -> ThreadSummary {
        ThreadSummary { unread, ..ThreadSummary::new(ThreadId::new(id), UserId::new("peer")) }
    }

    #[test]
    fn hidden_refresh_is_deferred_until_shown() {
        let mut list = ThreadList::new();
        list.set_visible(false);

        assert!(!list.request_refresh());
        assert!(list.has_deferred_refresh());
        assert!(list.set_visible(true));
        assert!(!list.set_visible(true));
    }

    #[test]
    fn replace_keeps_reading_thread_at_zero() {
        let mut list = ThreadList::new();
        let c1 = ThreadId::new("c1");
        list.replace(vec![summary("c1", 3), summary("c2", 2)], Some(&c1));

        assert_eq!(list.get(&c1).map(|t| t.unread), Some(0));
        assert_eq!(list.unread_total(), 2);
    }

    #[test]
    fn incoming_message_moves_thread_to_top() {
        let mut list = ThreadList::new();
        list.replace(vec![summary("c1", 0), summary("c2", 0)], None);

        let c2 = ThreadId::new("c2");
        list.note_message(&c2, None, "yo", Timestamp::from_millis(9), true);

        assert_eq!(list.threads()[0].id, c2);
        assert_eq!(list.threads()[0].unread, 1);
        assert_eq!(list.threads()[0].last_message.as_deref(), Some("yo"));
    }

    #[test]
    fn unknown_thread_needs_a_participant() {
        let mut list = ThreadList::new();
        let c9 = ThreadId::new("c9");

        list.note_message(&c9, None, "?", Timestamp::from_millis(1), true);
        assert!(list.get(&c9).is_none());

        list.note_message(&c9, Some(&UserId::new("u7")), "hey", Timestamp::from_millis(2), true);
        assert_eq!(list.get(&c9).map(|t| t.participant.as_str()), Some("u7"));
    }
}
