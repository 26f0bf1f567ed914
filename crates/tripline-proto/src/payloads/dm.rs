//! Direct-message payloads.

use serde::{Deserialize, Serialize};

use super::MessageKind;
use crate::{MessageId, ThreadId, Timestamp, UserId};

/// Payload of `join_dm_conversation` and `leave_dm_conversation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRef {
    /// Conversation room to join or leave.
    pub conversation_id: ThreadId,
}

/// Payload of `send_dm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendDm {
    /// The other participant of the conversation.
    pub receiver_id: UserId,
    /// Message content.
    pub message: String,
    /// Content type.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Conversation the message belongs to.
    pub conversation_id: ThreadId,
    /// Message being replied to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
}

/// Payload of `receive_dm`: a server-confirmed direct message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    /// Server-assigned id.
    pub id: MessageId,
    /// Conversation the message belongs to.
    pub conversation_id: ThreadId,
    /// Author.
    pub sender_id: UserId,
    /// Message content.
    #[serde(rename = "message")]
    pub content: String,
    /// Content type.
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    /// Server timestamp.
    pub created_at: Timestamp,
    /// Message being replied to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
}

/// One row of the thread list served by the REST directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    /// Conversation id.
    pub id: ThreadId,
    /// The other participant.
    pub participant: UserId,
    /// Messages not yet read by the local user.
    #[serde(default)]
    pub unread: u32,
    /// Preview of the most recent message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    /// Timestamp of the most recent message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<Timestamp>,
}

impl ThreadSummary {
    /// Summary with no messages yet.
    pub fn new(id: ThreadId, participant: UserId) -> Self {
        Self { id, participant, unread: 0, last_message: None, last_activity: None }
    }
}
