//! Message records held in a thread buffer.

use std::{fmt, time::Duration};

use tripline_proto::{
    MessageId, Timestamp, UserId,
    payloads::{MessageKind, community::CommunityMessage, dm::DirectMessage},
};

/// Client-generated identifier of an unconfirmed message.
///
/// Unique within one engine. Kept apart from [`MessageId`] so a local id can
/// never be mistaken for a server id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(u64);

impl TempId {
    /// Wrap a sequence number.
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Sequence number.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tmp-{}", self.0)
    }
}

/// What the user typed, before it becomes a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    /// Message content.
    pub content: String,
    /// Content type.
    pub kind: MessageKind,
    /// Message being replied to.
    pub reply_to: Option<MessageId>,
    /// URL of an already-uploaded image (community rooms only).
    pub image_url: Option<String>,
}

impl Draft {
    /// Plain text draft.
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), kind: MessageKind::Text, reply_to: None, image_url: None }
    }

    /// Image draft with a caption.
    pub fn image(caption: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            content: caption.into(),
            kind: MessageKind::Image,
            reply_to: None,
            image_url: Some(url.into()),
        }
    }

    /// Mark the draft as a reply to `id`.
    #[must_use]
    pub fn replying_to(mut self, id: MessageId) -> Self {
        self.reply_to = Some(id);
        self
    }

    /// Whether there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.image_url.is_none()
    }
}

/// A locally sent message awaiting its server echo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    /// Local id.
    pub temp_id: TempId,
    /// Local user.
    pub author: UserId,
    /// Message content.
    pub content: String,
    /// Content type.
    pub kind: MessageKind,
    /// Client clock at send time.
    pub sent_at: Timestamp,
    /// Message being replied to.
    pub reply_to: Option<MessageId>,
    /// Attached image.
    pub image_url: Option<String>,
}

impl PendingMessage {
    /// Whether `confirmed` is the server echo of this message.
    ///
    /// Same author, exactly equal content, and timestamps no further apart
    /// than `window`.
    pub fn matches(&self, confirmed: &ConfirmedMessage, window: Duration) -> bool {
        self.author == confirmed.author
            && self.content == confirmed.content
            && self.sent_at.abs_diff(confirmed.sent_at) <= window
    }
}

/// A message acknowledged by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedMessage {
    /// Server id.
    pub id: MessageId,
    /// Author.
    pub author: UserId,
    /// Message content.
    pub content: String,
    /// Content type.
    pub kind: MessageKind,
    /// Server timestamp.
    pub sent_at: Timestamp,
    /// Message being replied to.
    pub reply_to: Option<MessageId>,
    /// Attached image.
    pub image_url: Option<String>,
}

impl From<&DirectMessage> for ConfirmedMessage {
    fn from(msg: &DirectMessage) -> Self {
        Self {
            id: msg.id.clone(),
            author: msg.sender_id.clone(),
            content: msg.content.clone(),
            kind: msg.kind,
            sent_at: msg.created_at,
            reply_to: msg.reply_to.clone(),
            image_url: None,
        }
    }
}

impl From<&CommunityMessage> for ConfirmedMessage {
    fn from(msg: &CommunityMessage) -> Self {
        Self {
            id: msg.id.clone(),
            author: msg.sender_id.clone(),
            content: msg.content.clone(),
            kind: msg.kind,
            sent_at: msg.created_at,
            reply_to: None,
            image_url: msg.image_url.clone(),
        }
    }
}

/// One entry of a thread buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Sent locally, not yet echoed.
    Pending(PendingMessage),
    /// Echoed or loaded from history.
    Confirmed(ConfirmedMessage),
}

impl Message {
    /// Author of the message.
    pub fn author(&self) -> &UserId {
        match self {
            Self::Pending(p) => &p.author,
            Self::Confirmed(c) => &c.author,
        }
    }

    /// Message content.
    pub fn content(&self) -> &str {
        match self {
            Self::Pending(p) => &p.content,
            Self::Confirmed(c) => &c.content,
        }
    }

    /// Client time for pending messages, server time for confirmed ones.
    pub fn sent_at(&self) -> Timestamp {
        match self {
            Self::Pending(p) => p.sent_at,
            Self::Confirmed(c) => c.sent_at,
        }
    }

    /// Whether the server has not echoed this message yet.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Server id, once confirmed.
    pub fn confirmed_id(&self) -> Option<&MessageId> {
        match self {
            Self::Pending(_) => None,
            Self::Confirmed(c) => Some(&c.id),
        }
    }

    /// Local id, while pending.
    pub fn temp_id(&self) -> Option<TempId> {
        match self {
            Self::Pending(p) => Some(p.temp_id),
            Self::Confirmed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(content: &str, at: u64) -> PendingMessage {
        PendingMessage {
            temp_id: TempId::new(1),
            author: UserId::new("u1"),
            content: content.into(),
            kind: MessageKind::Text,
            sent_at: Timestamp::from_millis(at),
            reply_to: None,
            image_url: None,
        }
    }

    fn confirmed(author: &str, content: &str, at: u64) -> ConfirmedMessage {
        ConfirmedMessage {
            id: MessageId::new("m1"),
            author: UserId::new(author),
            content: content.into(),
            kind: MessageKind::Text,
            sent_at: Timestamp::from_millis(at),
            reply_to: None,
            image_url: None,
        }
    }

    #[test]
    fn temp_id_display() {
        assert_eq!(TempId::new(7).to_string(), "tmp-7");
    }

    #[test]
    fn match_requires_author_content_and_window() {
        let window = Duration::from_secs(10);
        let p = pending("Hello", 1_000);

        assert!(p.matches(&confirmed("u1", "Hello", 1_300), window));
        assert!(p.matches(&confirmed("u1", "Hello", 11_000), window));
        assert!(!p.matches(&confirmed("u1", "Hello", 11_001), window));
        assert!(!p.matches(&confirmed("u2", "Hello", 1_300), window));
        assert!(!p.matches(&confirmed("u1", "Hello ", 1_300), window));
    }

    #[test]
    fn whitespace_draft_is_empty() {
        assert!(Draft::text("  \n").is_empty());
        assert!(!Draft::image("", "https://cdn/x.png").is_empty());
    }
}
