//! The realtime core: connection registry, rooms, presence, dispatch.
//!
//! `RealtimeService` is an explicitly constructed instance — built once at
//! startup, shared as `Arc`, torn down on shutdown. The transport layer
//! (ws::actor) drives the lifecycle verbs; the embedding HTTP layer calls
//! the collaborator surface (`broadcast_to_tenant` and friends) after its
//! own writes succeed.

pub mod presence;
pub mod reaper;
pub mod registry;
pub mod rooms;
pub mod stats;

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};

use crate::auth::Identity;
use crate::ws::protocol::{encode_event, now_millis, send_error, send_event};
use crate::ws::{ConnectionId, ConnectionSender};

use presence::OnlineUser;
use registry::ConnectionRegistry;
use rooms::{RoomId, RoomManager};
use stats::{Stats, StatsSnapshot};

/// Close code for connections evicted by the idle sweep or shutdown.
const CLOSE_GOING_AWAY: u16 = 1001;

#[derive(Debug)]
pub struct RealtimeService {
    registry: ConnectionRegistry,
    rooms: RoomManager,
    stats: Arc<Stats>,
}

impl Default for RealtimeService {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeService {
    pub fn new() -> Self {
        let stats = Arc::new(Stats::new());
        Self {
            registry: ConnectionRegistry::new(stats.clone()),
            rooms: RoomManager::new(),
            stats,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    // ---- Connection lifecycle (driven by the transport actor) ----

    /// Admit an authenticated connection: record it, auto-enroll it into
    /// its organization room, and announce it to its peers.
    pub fn admit(&self, conn_id: ConnectionId, identity: Identity, sender: ConnectionSender) {
        self.registry.admit(conn_id, identity.clone(), sender);
        let announced = presence::announce_online(&self.rooms, &self.registry, conn_id, &identity);
        self.stats.record_dispatched(announced);
        tracing::info!(
            connection_id = %conn_id,
            user_id = %identity.user_id,
            organization_id = ?identity.organization_id,
            "connection admitted"
        );
    }

    /// Tear down a connection: drop the record, leave every room (pruning
    /// empties), then announce offline to the now-smaller tenant room.
    /// Idempotent — the explicit disconnect path and the reaper may race.
    pub fn disconnect(&self, conn_id: ConnectionId) {
        let Some(record) = self.registry.remove(conn_id) else {
            return;
        };
        self.rooms.leave_all(conn_id);
        let announced = presence::announce_offline(&self.rooms, &self.registry, &record.identity);
        self.stats.record_dispatched(announced);
        tracing::info!(
            connection_id = %conn_id,
            user_id = %record.identity.user_id,
            "connection removed"
        );
    }

    /// Refresh last-activity; called for every inbound frame.
    pub fn touch(&self, conn_id: ConnectionId) {
        self.registry.touch(conn_id);
    }

    // ---- Inbound client events (routed from ws::protocol) ----

    /// Join an organization room. An identity may only join its own
    /// organization unless it carries the admin role. A connection sits in
    /// at most one organization room, so a permitted join to a different
    /// organization leaves the previous room first.
    pub fn handle_join_organization(
        &self,
        conn_id: ConnectionId,
        tx: &ConnectionSender,
        organization_id: &str,
    ) {
        let Some(record) = self.registry.get(conn_id) else {
            return;
        };
        let own_org = record.identity.organization_id.as_deref();
        if own_org != Some(organization_id) && !record.identity.is_admin() {
            tracing::warn!(
                connection_id = %conn_id,
                user_id = %record.identity.user_id,
                requested = organization_id,
                "organization join denied"
            );
            send_error(tx, "not authorized to join this organization");
            return;
        }

        let target = RoomId::organization(organization_id);
        if let Some(current) = self.rooms.organization_room_of(conn_id) {
            if current != target {
                self.rooms.leave(&current, conn_id);
            }
        }
        self.rooms.join(target, conn_id);
        send_event(
            tx,
            "joined_organization",
            json!({ "organizationId": organization_id, "timestamp": now_millis() }),
        );
    }

    pub fn handle_leave_organization(
        &self,
        conn_id: ConnectionId,
        tx: &ConnectionSender,
        organization_id: &str,
    ) {
        self.rooms
            .leave(&RoomId::organization(organization_id), conn_id);
        send_event(
            tx,
            "left_organization",
            json!({ "organizationId": organization_id, "timestamp": now_millis() }),
        );
    }

    /// Subscribe to a dashboard room scoped to the connection's own
    /// organization. Unlike organization rooms, a connection may hold any
    /// number of dashboard subscriptions.
    pub fn handle_dashboard_subscribe(
        &self,
        conn_id: ConnectionId,
        tx: &ConnectionSender,
        board: &str,
    ) {
        let Some(org) = self.organization_of(conn_id) else {
            send_error(tx, "no organization scope for dashboard subscription");
            return;
        };
        self.rooms.join(RoomId::dashboard(&org, board), conn_id);
        send_event(
            tx,
            "dashboard_subscribed",
            json!({ "dashboardType": board, "timestamp": now_millis() }),
        );
    }

    pub fn handle_dashboard_unsubscribe(
        &self,
        conn_id: ConnectionId,
        tx: &ConnectionSender,
        board: &str,
    ) {
        let Some(org) = self.organization_of(conn_id) else {
            send_error(tx, "no organization scope for dashboard unsubscription");
            return;
        };
        self.rooms.leave(&RoomId::dashboard(&org, board), conn_id);
        send_event(
            tx,
            "dashboard_unsubscribed",
            json!({ "dashboardType": board, "timestamp": now_millis() }),
        );
    }

    /// Relay an attendance update to the sender's tenant room, stamped
    /// with who sent it and when. Persistence already happened on the
    /// HTTP write path before the client emits this.
    pub fn handle_attendance_update(
        &self,
        conn_id: ConnectionId,
        tx: &ConnectionSender,
        payload: Value,
    ) {
        let Some(record) = self.registry.get(conn_id) else {
            return;
        };
        let Some(org) = record.identity.organization_id.clone() else {
            send_error(tx, "no organization scope for attendance updates");
            return;
        };

        // Non-object payloads degrade to an empty object, matching the
        // spread semantics clients already rely on.
        let mut data = match payload {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        data.insert(
            "updatedBy".to_string(),
            json!({ "id": record.identity.user_id, "name": record.identity.name }),
        );
        data.insert("timestamp".to_string(), json!(now_millis()));

        let frame = encode_event("attendance_updated", Value::Object(data));
        let attempted =
            self.rooms
                .broadcast(&RoomId::organization(&org), &frame, &self.registry);
        self.stats.record_dispatched(attempted);
    }

    /// Liveness ping: refresh last-activity and answer with server time.
    pub fn handle_ping(&self, conn_id: ConnectionId, tx: &ConnectionSender) {
        self.registry.touch(conn_id);
        send_event(tx, "pong", json!({ "timestamp": now_millis() }));
    }

    // ---- Collaborator surface (called by the embedding HTTP layer) ----

    /// Fan an event out to every connection in an organization room.
    /// Returns the number of delivery attempts.
    pub fn broadcast_to_tenant(
        &self,
        organization_id: &str,
        event_name: &str,
        payload: Value,
    ) -> usize {
        let frame = encode_event(event_name, payload);
        let attempted =
            self.rooms
                .broadcast(&RoomId::organization(organization_id), &frame, &self.registry);
        self.stats.record_dispatched(attempted);
        attempted
    }

    /// Fan an event out to one dashboard room within an organization.
    pub fn broadcast_to_dashboard(
        &self,
        organization_id: &str,
        board: &str,
        event_name: &str,
        payload: Value,
    ) -> usize {
        let frame = encode_event(event_name, payload);
        let attempted = self.rooms.broadcast(
            &RoomId::dashboard(organization_id, board),
            &frame,
            &self.registry,
        );
        self.stats.record_dispatched(attempted);
        attempted
    }

    /// Deliver an event to one user's connection. Linear scan over the
    /// registry; returns whether a matching connection was found.
    pub fn send_to_user(&self, user_id: &str, event_name: &str, payload: Value) -> bool {
        match self.registry.find_by_user(user_id) {
            Some(sender) => {
                let frame = encode_event(event_name, payload);
                let _ = sender.send(frame);
                self.stats.record_dispatched(1);
                true
            }
            None => false,
        }
    }

    /// On-demand online roster for an organization.
    pub fn online_users(&self, organization_id: &str) -> Vec<OnlineUser> {
        presence::online_users(&self.registry, organization_id)
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_connections: self.stats.total_connections(),
            active_connections: self.stats.active_connections(),
            messages_sent: self.stats.messages_sent(),
            room_count: self.rooms.room_count(),
            connected_users: self.registry.distinct_users(),
            organization_rooms: self.rooms.organization_room_count(),
            uptime_secs: self.stats.uptime_secs(),
        }
    }

    // ---- Maintenance ----

    /// Push a close frame to every connection idle past `threshold_secs`.
    /// The close travels the normal disconnect path, so registry and room
    /// cleanup happen exactly once. Returns how many were closed.
    pub fn reap_idle(&self, threshold_secs: u64) -> usize {
        let cutoff = Utc::now() - ChronoDuration::seconds(threshold_secs as i64);
        let mut reaped = 0;
        for (conn_id, last_activity) in self.registry.activity_snapshot() {
            if last_activity >= cutoff {
                continue;
            }
            // A racing natural disconnect makes this send fail; skip and
            // keep sweeping.
            if let Some(sender) = self.registry.sender_of(conn_id) {
                let _ = sender.send(Message::Close(Some(CloseFrame {
                    code: CLOSE_GOING_AWAY,
                    reason: "idle timeout".into(),
                })));
                reaped += 1;
                tracing::info!(connection_id = %conn_id, "idle connection closed");
            }
        }
        reaped
    }

    /// Shutdown teardown: push a close frame to every live connection.
    pub fn shutdown(&self) {
        for sender in self.registry.all_senders() {
            let _ = sender.send(Message::Close(Some(CloseFrame {
                code: CLOSE_GOING_AWAY,
                reason: "server shutting down".into(),
            })));
        }
    }

    fn organization_of(&self, conn_id: ConnectionId) -> Option<String> {
        self.registry
            .get(conn_id)
            .and_then(|record| record.identity.organization_id)
    }
}
