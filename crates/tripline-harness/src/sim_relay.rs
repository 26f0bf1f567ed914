//! In-process realtime server.
//!
//! Mirrors the behaviour clients rely on:
//!
//! - `connect` is delivered once an opened transport is noticed
//! - presence is broadcast to every other connected peer, and a newcomer is
//!   told who is already online
//! - direct messages get a server id and timestamp, are echoed to the sender
//!   and delivered to the receiver whether or not the receiver joined the
//!   conversation room
//! - community messages go to every member of the room, sender included
//! - route edits go to the other members of the squad room, tagged with the
//!   editor
//!
//! Chaos: with a non-zero duplicate rate, echoes are sometimes delivered
//! twice, as a reconnecting server might.

use std::collections::{BTreeMap, BTreeSet};

use tripline_core::Environment;
use tripline_proto::{
    CommunityId, EventName, InboundEvent, MessageId, OutboundEvent, ThreadId, TripId, UserId,
    payloads::{
        community::CommunityMessage,
        dm::DirectMessage,
        map::{MapUpdate, Waypoint},
        session::{PresenceStatus, UserStatus},
    },
};

use crate::{SimEnv, SimLink, sim_directory::SharedStore};

/// Server-side subscription scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Room {
    /// Direct conversation.
    Direct(ThreadId),
    /// Community room.
    Community(CommunityId),
    /// Trip squad room.
    Squad(TripId),
}

struct Peer {
    link: SimLink,
    connected: bool,
}

/// Deterministic relay server.
pub struct SimRelay {
    env: SimEnv,
    store: SharedStore,
    peers: BTreeMap<UserId, Peer>,
    rooms: BTreeMap<Room, BTreeSet<UserId>>,
    routes: BTreeMap<TripId, Vec<Waypoint>>,
    next_id: u64,
    duplicate_rate: f64,
    transcript: Vec<String>,
}

impl SimRelay {
    /// Relay over `store`, drawing time and chaos from `env`.
    pub fn new(env: SimEnv, store: SharedStore) -> Self {
        Self {
            env,
            store,
            peers: BTreeMap::new(),
            rooms: BTreeMap::new(),
            routes: BTreeMap::new(),
            next_id: 1,
            duplicate_rate: 0.0,
            transcript: Vec::new(),
        }
    }

    /// Redeliver echoes with probability `rate`.
    pub fn set_duplicate_rate(&mut self, rate: f64) {
        self.duplicate_rate = rate;
    }

    /// Register the relay side of `user`'s transport.
    pub fn attach(&mut self, user: UserId, link: SimLink) {
        self.peers.insert(user, Peer { link, connected: false });
    }

    /// Members of `room`.
    pub fn members(&self, room: &Room) -> Vec<UserId> {
        self.rooms.get(room).map(|m| m.iter().cloned().collect()).unwrap_or_default()
    }

    /// Last route broadcast for `trip`.
    pub fn route(&self, trip: &TripId) -> Option<&[Waypoint]> {
        self.routes.get(trip).map(Vec::as_slice)
    }

    /// One line per event handled or delivered, in order.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Drop `user`'s connection from the server side.
    pub fn drop_peer(&mut self, user: &UserId, reason: &str) {
        let Some(peer) = self.peers.get_mut(user) else {
            return;
        };
        if !peer.connected {
            return;
        }
        peer.link.sever();
        peer.link.deliver(InboundEvent::disconnect(reason));
        self.transcript.push(format!("{user} <- disconnect"));
        self.forget(user);
    }

    /// Process lifecycle changes and every event sent so far.
    ///
    /// Returns how many transport operations were handled.
    pub fn pump(&mut self) -> usize {
        let users: Vec<UserId> = self.peers.keys().cloned().collect();
        let mut handled = 0;

        for user in users {
            let Some(link) = self.peers.get(&user).map(|p| p.link.clone()) else {
                continue;
            };

            if link.take_close_request() {
                handled += 1;
                self.forget(&user);
            }
            if link.take_open_request() {
                handled += 1;
                self.welcome(&user);
            }
            for event in link.drain_outgoing() {
                handled += 1;
                self.handle(&user, event);
            }
        }
        handled
    }

    fn welcome(&mut self, user: &UserId) {
        if let Some(peer) = self.peers.get_mut(user) {
            peer.connected = true;
        }
        self.send_to(user, InboundEvent::Connect);

        let online: Vec<UserId> = self
            .peers
            .iter()
            .filter(|(id, p)| p.connected && *id != user)
            .map(|(id, _)| id.clone())
            .collect();
        for other in &online {
            self.send_to(user, presence(other, PresenceStatus::Online));
            self.send_to(other, presence(user, PresenceStatus::Online));
        }
    }

    fn forget(&mut self, user: &UserId) {
        let was_connected =
            self.peers.get_mut(user).is_some_and(|p| std::mem::replace(&mut p.connected, false));
        for members in self.rooms.values_mut() {
            members.remove(user);
        }
        if !was_connected {
            return;
        }
        let online: Vec<UserId> =
            self.peers.iter().filter(|(_, p)| p.connected).map(|(id, _)| id.clone()).collect();
        for other in &online {
            self.send_to(other, presence(user, PresenceStatus::Offline));
        }
    }

    fn handle(&mut self, from: &UserId, event: OutboundEvent) {
        self.transcript.push(format!("{from} -> {}", event.name()));
        match event {
            OutboundEvent::JoinDmConversation(r) => self.join(from, Room::Direct(r.conversation_id)),
            OutboundEvent::LeaveDmConversation(r) => {
                self.leave(from, &Room::Direct(r.conversation_id));
            },
            OutboundEvent::JoinCommunity(r) => self.join(from, Room::Community(r.community_id)),
            OutboundEvent::LeaveCommunity(r) => self.leave(from, &Room::Community(r.community_id)),
            OutboundEvent::JoinSquad(r) => self.join(from, Room::Squad(r.trip_id)),
            OutboundEvent::LeaveSquad(r) => self.leave(from, &Room::Squad(r.trip_id)),
            OutboundEvent::SendDm(send) => {
                let msg = DirectMessage {
                    id: self.assign_id(),
                    conversation_id: send.conversation_id,
                    sender_id: from.clone(),
                    content: send.message,
                    kind: send.kind,
                    created_at: self.env.now(),
                    reply_to: send.reply_to,
                };
                self.store.borrow_mut().record_direct(msg.clone(), &send.receiver_id);

                let event = InboundEvent::ReceiveDm(msg);
                self.echo(from, &event);
                if &send.receiver_id != from {
                    self.send_to(&send.receiver_id, event);
                }
            },
            OutboundEvent::SendCommunityMessage(send) => {
                let msg = CommunityMessage {
                    id: self.assign_id(),
                    community_id: send.community_id,
                    sender_id: from.clone(),
                    content: send.message,
                    kind: send.kind,
                    image_url: send.image_url,
                    created_at: self.env.now(),
                };
                self.store.borrow_mut().record_community(msg.clone());

                let room = Room::Community(msg.community_id.clone());
                let event = InboundEvent::ReceiveCommunityMessage(msg);
                for member in self.members(&room) {
                    if &member == from {
                        self.echo(from, &event);
                    } else {
                        self.send_to(&member, event.clone());
                    }
                }
            },
            OutboundEvent::MapAction(action) => {
                self.routes.insert(action.trip_id.clone(), action.waypoints.clone());
                let room = Room::Squad(action.trip_id.clone());
                let event = InboundEvent::MapUpdate(MapUpdate {
                    trip_id: Some(action.trip_id),
                    waypoints: action.waypoints,
                    updated_by: Some(from.to_string()),
                });
                for member in self.members(&room) {
                    if &member != from {
                        self.send_to(&member, event.clone());
                    }
                }
            },
        }
    }

    fn join(&mut self, user: &UserId, room: Room) {
        self.rooms.entry(room).or_default().insert(user.clone());
    }

    fn leave(&mut self, user: &UserId, room: &Room) {
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(user);
        }
    }

    fn assign_id(&mut self) -> MessageId {
        let id = MessageId::new(format!("m{}", self.next_id));
        self.next_id += 1;
        id
    }

    fn echo(&mut self, to: &UserId, event: &InboundEvent) {
        self.send_to(to, event.clone());
        if self.env.chance(self.duplicate_rate) {
            tracing::trace!(peer = %to, "duplicating echo");
            self.send_to(to, event.clone());
        }
    }

    fn send_to(&mut self, to: &UserId, event: InboundEvent) {
        let Some(peer) = self.peers.get(to) else {
            return;
        };
        if !peer.connected {
            return;
        }
        let name: EventName = event.name();
        peer.link.deliver(event);
        self.transcript.push(format!("{to} <- {name}"));
    }
}

fn presence(user: &UserId, status: PresenceStatus) -> InboundEvent {
    InboundEvent::UserStatus(UserStatus { user_id: user.clone(), status })
}
