//! Community chat payloads.

use serde::{Deserialize, Serialize};

use super::MessageKind;
use crate::{CommunityId, MessageId, Timestamp, UserId};

/// Payload of `join_community` and `leave_community`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityRef {
    /// Community room to join or leave.
    pub community_id: CommunityId,
}

/// Payload of `send_community_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCommunityMessage {
    /// Target community.
    pub community_id: CommunityId,
    /// Message content.
    pub message: String,
    /// Content type.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// URL of an already-uploaded image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Payload of `receive_community_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityMessage {
    /// Server-assigned id.
    pub id: MessageId,
    /// Community the message was posted to.
    pub community_id: CommunityId,
    /// Author.
    pub sender_id: UserId,
    /// Message content.
    #[serde(rename = "message")]
    pub content: String,
    /// Content type.
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    /// URL of the attached image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Server timestamp.
    pub created_at: Timestamp,
}
