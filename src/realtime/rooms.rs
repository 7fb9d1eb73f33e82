use std::collections::HashSet;
use std::fmt;

use axum::extract::ws::Message;
use dashmap::DashMap;

use crate::ws::ConnectionId;

use super::registry::ConnectionRegistry;

/// Default dashboard scope when a subscriber names none.
pub const DEFAULT_DASHBOARD: &str = "overview";

/// A named fan-out scope. One per organization, plus one per
/// organization+dashboard-type pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomId {
    Organization(String),
    Dashboard {
        organization_id: String,
        board: String,
    },
}

impl RoomId {
    pub fn organization(organization_id: &str) -> Self {
        RoomId::Organization(organization_id.to_string())
    }

    pub fn dashboard(organization_id: &str, board: &str) -> Self {
        RoomId::Dashboard {
            organization_id: organization_id.to_string(),
            board: board.to_string(),
        }
    }

    pub fn is_organization(&self) -> bool {
        matches!(self, RoomId::Organization(_))
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomId::Organization(org) => write!(f, "org:{org}"),
            RoomId::Dashboard {
                organization_id,
                board,
            } => write!(f, "dash:{organization_id}:{board}"),
        }
    }
}

/// Groups connections into rooms and fans frames out to their members.
///
/// Rooms are created lazily on first join and removed the moment their
/// membership reaches zero; the reverse index lets a disconnecting
/// connection leave everything in one pass.
#[derive(Debug, Default)]
pub struct RoomManager {
    rooms: DashMap<RoomId, HashSet<ConnectionId>>,
    memberships: DashMap<ConnectionId, HashSet<RoomId>>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room, creating the room if absent.
    /// Re-joining an already-member connection is a no-op.
    pub fn join(&self, room: RoomId, conn_id: ConnectionId) {
        self.rooms.entry(room.clone()).or_default().insert(conn_id);
        self.memberships.entry(conn_id).or_default().insert(room);
    }

    /// Remove a connection from a room; drop the room once empty.
    pub fn leave(&self, room: &RoomId, conn_id: ConnectionId) {
        let now_empty = {
            match self.rooms.get_mut(room) {
                Some(mut members) => {
                    members.remove(&conn_id);
                    members.is_empty()
                }
                None => false,
            }
        };
        if now_empty {
            // Guard re-checks under the removal lock; a concurrent join
            // between the block above and here keeps the room alive.
            self.rooms.remove_if(room, |_, members| members.is_empty());
        }
        if let Some(mut rooms_of) = self.memberships.get_mut(&conn_id) {
            rooms_of.remove(room);
        }
        self.memberships
            .remove_if(&conn_id, |_, rooms_of| rooms_of.is_empty());
    }

    /// Remove a connection from every room it is in. Returns the rooms
    /// it left.
    pub fn leave_all(&self, conn_id: ConnectionId) -> Vec<RoomId> {
        let rooms_of = match self.memberships.remove(&conn_id) {
            Some((_, rooms_of)) => rooms_of,
            None => return Vec::new(),
        };
        let mut left = Vec::with_capacity(rooms_of.len());
        for room in rooms_of {
            let now_empty = {
                match self.rooms.get_mut(&room) {
                    Some(mut members) => {
                        members.remove(&conn_id);
                        members.is_empty()
                    }
                    None => false,
                }
            };
            if now_empty {
                self.rooms.remove_if(&room, |_, members| members.is_empty());
            }
            left.push(room);
        }
        left
    }

    pub fn members_of(&self, room: &RoomId) -> HashSet<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, room: &RoomId) -> bool {
        self.rooms.contains_key(room)
    }

    /// The organization room this connection currently belongs to, if any.
    /// A connection is in at most one.
    pub fn organization_room_of(&self, conn_id: ConnectionId) -> Option<RoomId> {
        self.memberships.get(&conn_id).and_then(|rooms_of| {
            rooms_of.iter().find(|room| room.is_organization()).cloned()
        })
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn organization_room_count(&self) -> usize {
        self.rooms
            .iter()
            .filter(|entry| entry.key().is_organization())
            .count()
    }

    /// Deliver a pre-encoded frame to every member of a room.
    ///
    /// Best-effort: a member whose transport is already gone is logged
    /// and skipped, never aborting delivery to the rest. Returns the
    /// number of attempts (the room size), not confirmed receipts.
    pub fn broadcast(
        &self,
        room: &RoomId,
        frame: &Message,
        registry: &ConnectionRegistry,
    ) -> usize {
        self.broadcast_filtered(room, frame, registry, None)
    }

    /// Broadcast excluding one member — used for presence announcements
    /// so a connection never hears about its own arrival.
    pub fn broadcast_except(
        &self,
        room: &RoomId,
        excluded: ConnectionId,
        frame: &Message,
        registry: &ConnectionRegistry,
    ) -> usize {
        self.broadcast_filtered(room, frame, registry, Some(excluded))
    }

    fn broadcast_filtered(
        &self,
        room: &RoomId,
        frame: &Message,
        registry: &ConnectionRegistry,
        excluded: Option<ConnectionId>,
    ) -> usize {
        let members = self.members_of(room);
        let mut attempted = 0;
        for member in members {
            if Some(member) == excluded {
                continue;
            }
            attempted += 1;
            match registry.sender_of(member) {
                Some(sender) => {
                    if sender.send(frame.clone()).is_err() {
                        tracing::debug!(room = %room, connection_id = %member, "dropped frame for closed connection");
                    }
                }
                None => {
                    tracing::debug!(room = %room, connection_id = %member, "room member missing from registry");
                }
            }
        }
        attempted
    }
}
