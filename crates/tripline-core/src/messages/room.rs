//! Thread keys and room membership.

use std::fmt;

use tripline_proto::{
    CommunityId, OutboundEvent, ThreadId, UserId,
    payloads::{community::CommunityRef, dm::ConversationRef},
};

/// A chat room the engine can open.
///
/// Direct conversations and community rooms share the engine; only the event
/// names and payloads differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ThreadKey {
    /// One-to-one conversation.
    Direct {
        /// Conversation id.
        thread: ThreadId,
        /// The other participant (receiver of sends).
        peer: UserId,
    },
    /// Community room.
    Community(CommunityId),
}

impl ThreadKey {
    /// Direct conversation with `peer`.
    pub fn direct(thread: impl Into<ThreadId>, peer: impl Into<UserId>) -> Self {
        Self::Direct { thread: thread.into(), peer: peer.into() }
    }

    /// Community room.
    pub fn community(id: impl Into<CommunityId>) -> Self {
        Self::Community(id.into())
    }

    /// Conversation id for direct threads.
    pub fn thread_id(&self) -> Option<&ThreadId> {
        match self {
            Self::Direct { thread, .. } => Some(thread),
            Self::Community(_) => None,
        }
    }

    /// Whether this key is the direct conversation `thread`.
    pub fn is_direct(&self, thread: &ThreadId) -> bool {
        self.thread_id() == Some(thread)
    }

    /// Whether this key is the community room `id`.
    pub fn is_community(&self, id: &CommunityId) -> bool {
        matches!(self, Self::Community(c) if c == id)
    }

    /// Event that subscribes to this room.
    pub fn join_event(&self) -> OutboundEvent {
        match self {
            Self::Direct { thread, .. } => {
                OutboundEvent::JoinDmConversation(ConversationRef { conversation_id: thread.clone() })
            },
            Self::Community(id) => {
                OutboundEvent::JoinCommunity(CommunityRef { community_id: id.clone() })
            },
        }
    }

    /// Event that unsubscribes from this room.
    pub fn leave_event(&self) -> OutboundEvent {
        match self {
            Self::Direct { thread, .. } => {
                OutboundEvent::LeaveDmConversation(ConversationRef { conversation_id: thread.clone() })
            },
            Self::Community(id) => {
                OutboundEvent::LeaveCommunity(CommunityRef { community_id: id.clone() })
            },
        }
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct { thread, .. } => write!(f, "dm:{thread}"),
            Self::Community(id) => write!(f, "community:{id}"),
        }
    }
}

/// Server-side room subscription of the active thread.
///
/// ```text
/// Idle ──open──> Joining ──connected──> Joined ──close──> Leaving ──> Idle
///                   ^                      │
///                   └─────disconnect───────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Membership {
    /// No room open.
    #[default]
    Idle,
    /// Room open locally; join not sent yet because the connection is down.
    Joining,
    /// Join emitted on the live connection.
    Joined,
    /// Leave emitted; no further events are accepted for the room.
    Leaving,
}
