//! Presence announcements and the online roster projection.
//!
//! Presence is never stored separately: online/offline events fire off
//! registry transitions, and the roster is computed on demand from live
//! registry entries, so the two cannot drift apart.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::auth::Identity;
use crate::ws::{protocol, ConnectionId};

use super::registry::ConnectionRegistry;
use super::rooms::{RoomId, RoomManager};

/// One row of the online roster for an organization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    pub user_id: String,
    pub user_name: String,
    pub role: String,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Auto-enroll a freshly admitted connection into its organization room
/// and tell the rest of that room it came online. The new connection
/// itself is excluded from the announcement. Returns delivery attempts.
pub fn announce_online(
    rooms: &RoomManager,
    registry: &ConnectionRegistry,
    conn_id: ConnectionId,
    identity: &Identity,
) -> usize {
    let Some(org) = identity.organization_id.as_deref() else {
        return 0;
    };
    let room = RoomId::organization(org);
    rooms.join(room.clone(), conn_id);

    let frame = protocol::encode_event(
        "user_online",
        json!({
            "userId": &identity.user_id,
            "userName": &identity.name,
            "role": &identity.role,
            "timestamp": protocol::now_millis(),
        }),
    );
    rooms.broadcast_except(&room, conn_id, &frame, registry)
}

/// Tell the (already pruned) organization room that a connection went
/// offline. Called after the registry record and room memberships are
/// gone, so the departed connection can never receive it. Returns
/// delivery attempts.
pub fn announce_offline(
    rooms: &RoomManager,
    registry: &ConnectionRegistry,
    identity: &Identity,
) -> usize {
    let Some(org) = identity.organization_id.as_deref() else {
        return 0;
    };
    let frame = protocol::encode_event(
        "user_offline",
        json!({
            "userId": &identity.user_id,
            "userName": &identity.name,
            "timestamp": protocol::now_millis(),
        }),
    );
    rooms.broadcast(&RoomId::organization(org), &frame, registry)
}

/// Current roster for an organization, derived from registry state.
pub fn online_users(registry: &ConnectionRegistry, organization_id: &str) -> Vec<OnlineUser> {
    registry
        .list_by_tenant(organization_id)
        .into_iter()
        .map(|record| OnlineUser {
            user_id: record.identity.user_id,
            user_name: record.identity.name,
            role: record.identity.role,
            connected_at: record.connected_at,
            last_activity: record.last_activity,
        })
        .collect()
}
