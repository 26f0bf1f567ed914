//! Named events in both directions.
//!
//! # Invariants
//!
//! Each variant of [`InboundEvent`] and [`OutboundEvent`] maps to exactly one
//! [`EventName`], and the serde tag of the variant equals
//! [`EventName::as_str`]. Both are enforced by exhaustive matches and checked
//! by the codec tests.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::payloads::{
    community::{CommunityMessage, CommunityRef, SendCommunityMessage},
    dm::{ConversationRef, DirectMessage, SendDm},
    map::{MapAction, MapUpdate, TripRef},
    session::{DisconnectNotice, ErrorNotice, UserStatus},
};

/// Which side produces an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Server or transport to client.
    Inbound,
    /// Client to server.
    Outbound,
}

/// Key identifying an event stream.
///
/// Listener registries are keyed by this rather than by raw strings so a typo
/// in an event name is a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventName {
    /// Transport connected.
    Connect,
    /// Transport failed to connect.
    ConnectError,
    /// Server or transport error.
    Error,
    /// Transport disconnected.
    Disconnect,
    /// Join a direct-message room.
    JoinDmConversation,
    /// Leave a direct-message room.
    LeaveDmConversation,
    /// Send a direct message.
    SendDm,
    /// Confirmed direct message.
    ReceiveDm,
    /// Presence change.
    UserStatus,
    /// Join a community room.
    JoinCommunity,
    /// Leave a community room.
    LeaveCommunity,
    /// Post to a community.
    SendCommunityMessage,
    /// Confirmed community message.
    ReceiveCommunityMessage,
    /// Join a trip's squad room.
    JoinSquad,
    /// Leave a trip's squad room.
    LeaveSquad,
    /// Broadcast a route edit.
    MapAction,
    /// A peer's route edit.
    MapUpdate,
}

impl EventName {
    /// Every event name, in declaration order.
    pub const ALL: [Self; 17] = [
        Self::Connect,
        Self::ConnectError,
        Self::Error,
        Self::Disconnect,
        Self::JoinDmConversation,
        Self::LeaveDmConversation,
        Self::SendDm,
        Self::ReceiveDm,
        Self::UserStatus,
        Self::JoinCommunity,
        Self::LeaveCommunity,
        Self::SendCommunityMessage,
        Self::ReceiveCommunityMessage,
        Self::JoinSquad,
        Self::LeaveSquad,
        Self::MapAction,
        Self::MapUpdate,
    ];

    /// Wire name of the event.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::ConnectError => "connect_error",
            Self::Error => "error",
            Self::Disconnect => "disconnect",
            Self::JoinDmConversation => "join_dm_conversation",
            Self::LeaveDmConversation => "leave_dm_conversation",
            Self::SendDm => "send_dm",
            Self::ReceiveDm => "receive_dm",
            Self::UserStatus => "user_status",
            Self::JoinCommunity => "join_community",
            Self::LeaveCommunity => "leave_community",
            Self::SendCommunityMessage => "send_community_message",
            Self::ReceiveCommunityMessage => "receive_community_message",
            Self::JoinSquad => "join_squad",
            Self::LeaveSquad => "leave_squad",
            Self::MapAction => "map_action",
            Self::MapUpdate => "map_update",
        }
    }

    /// Which side produces this event.
    pub const fn direction(self) -> Direction {
        match self {
            Self::Connect
            | Self::ConnectError
            | Self::Error
            | Self::Disconnect
            | Self::ReceiveDm
            | Self::UserStatus
            | Self::ReceiveCommunityMessage
            | Self::MapUpdate => Direction::Inbound,
            Self::JoinDmConversation
            | Self::LeaveDmConversation
            | Self::SendDm
            | Self::JoinCommunity
            | Self::LeaveCommunity
            | Self::SendCommunityMessage
            | Self::JoinSquad
            | Self::LeaveSquad
            | Self::MapAction => Direction::Outbound,
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events delivered to the client.
///
/// `Connect`, `ConnectError` and `Disconnect` may be synthesized by the
/// transport rather than sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Transport connected.
    Connect,
    /// Transport failed to connect (auth rejection, unreachable endpoint).
    ConnectError(ErrorNotice),
    /// Server or transport error on a live connection.
    Error(ErrorNotice),
    /// Transport disconnected.
    Disconnect(DisconnectNotice),
    /// Confirmed direct message.
    ReceiveDm(DirectMessage),
    /// Presence change.
    UserStatus(UserStatus),
    /// Confirmed community message.
    ReceiveCommunityMessage(CommunityMessage),
    /// A peer's route edit.
    MapUpdate(MapUpdate),
}

impl InboundEvent {
    /// Listener key for this event.
    pub const fn name(&self) -> EventName {
        match self {
            Self::Connect => EventName::Connect,
            Self::ConnectError(_) => EventName::ConnectError,
            Self::Error(_) => EventName::Error,
            Self::Disconnect(_) => EventName::Disconnect,
            Self::ReceiveDm(_) => EventName::ReceiveDm,
            Self::UserStatus(_) => EventName::UserStatus,
            Self::ReceiveCommunityMessage(_) => EventName::ReceiveCommunityMessage,
            Self::MapUpdate(_) => EventName::MapUpdate,
        }
    }

    /// Shorthand for a `connect_error` event.
    pub fn connect_error(message: impl Into<String>) -> Self {
        Self::ConnectError(ErrorNotice { message: message.into() })
    }

    /// Shorthand for an `error` event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorNotice { message: message.into() })
    }

    /// Shorthand for a `disconnect` event.
    pub fn disconnect(reason: impl Into<String>) -> Self {
        Self::Disconnect(DisconnectNotice { reason: reason.into() })
    }
}

/// Events emitted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Join a direct-message room.
    JoinDmConversation(ConversationRef),
    /// Leave a direct-message room.
    LeaveDmConversation(ConversationRef),
    /// Send a direct message.
    SendDm(SendDm),
    /// Join a community room.
    JoinCommunity(CommunityRef),
    /// Leave a community room.
    LeaveCommunity(CommunityRef),
    /// Post to a community.
    SendCommunityMessage(SendCommunityMessage),
    /// Join a trip's squad room.
    JoinSquad(TripRef),
    /// Leave a trip's squad room.
    LeaveSquad(TripRef),
    /// Broadcast the full interior waypoint sequence.
    MapAction(MapAction),
}

impl OutboundEvent {
    /// Event name of this event.
    pub const fn name(&self) -> EventName {
        match self {
            Self::JoinDmConversation(_) => EventName::JoinDmConversation,
            Self::LeaveDmConversation(_) => EventName::LeaveDmConversation,
            Self::SendDm(_) => EventName::SendDm,
            Self::JoinCommunity(_) => EventName::JoinCommunity,
            Self::LeaveCommunity(_) => EventName::LeaveCommunity,
            Self::SendCommunityMessage(_) => EventName::SendCommunityMessage,
            Self::JoinSquad(_) => EventName::JoinSquad,
            Self::LeaveSquad(_) => EventName::LeaveSquad,
            Self::MapAction(_) => EventName::MapAction,
        }
    }

    /// True for room join/leave events.
    pub const fn is_membership(&self) -> bool {
        matches!(
            self,
            Self::JoinDmConversation(_)
                | Self::LeaveDmConversation(_)
                | Self::JoinCommunity(_)
                | Self::LeaveCommunity(_)
                | Self::JoinSquad(_)
                | Self::LeaveSquad(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_names_are_inbound() {
        let events = [
            InboundEvent::Connect,
            InboundEvent::connect_error("refused"),
            InboundEvent::error("boom"),
            InboundEvent::disconnect("transport close"),
        ];
        for event in events {
            assert_eq!(event.name().direction(), Direction::Inbound);
        }
    }

    #[test]
    fn all_names_are_unique() {
        let mut names: Vec<&str> = EventName::ALL.iter().map(|n| n.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EventName::ALL.len());
    }
}
