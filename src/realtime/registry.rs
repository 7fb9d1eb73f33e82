use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::auth::Identity;
use crate::ws::{ConnectionId, ConnectionSender};

use super::stats::Stats;

/// One live connection. Owned exclusively by the registry; rooms only
/// ever hold the `ConnectionId`.
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    pub identity: Identity,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub sender: ConnectionSender,
}

/// Tracks every live connection and its identity/timestamps.
/// All lookups used by fan-out resolve through here.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionRecord>,
    stats: Arc<Stats>,
}

impl ConnectionRegistry {
    pub fn new(stats: Arc<Stats>) -> Self {
        Self {
            connections: DashMap::new(),
            stats,
        }
    }

    /// Record a freshly authenticated connection. Calling this twice for
    /// the same id overwrites the record — callers guarantee one admit
    /// per live connection.
    pub fn admit(&self, conn_id: ConnectionId, identity: Identity, sender: ConnectionSender) {
        let now = Utc::now();
        self.connections.insert(
            conn_id,
            ConnectionRecord {
                identity,
                connected_at: now,
                last_activity: now,
                sender,
            },
        );
        self.stats.connection_opened();
    }

    /// Remove a connection. Unknown ids are a no-op so that explicit
    /// disconnects and the reaper can race without double-counting.
    pub fn remove(&self, conn_id: ConnectionId) -> Option<ConnectionRecord> {
        let removed = self.connections.remove(&conn_id).map(|(_, record)| record);
        if removed.is_some() {
            self.stats.connection_closed();
        }
        removed
    }

    /// Refresh last-activity to now.
    pub fn touch(&self, conn_id: ConnectionId) {
        self.touch_at(conn_id, Utc::now());
    }

    /// Stamp last-activity with an explicit instant.
    pub fn touch_at(&self, conn_id: ConnectionId, when: DateTime<Utc>) {
        if let Some(mut record) = self.connections.get_mut(&conn_id) {
            record.last_activity = when;
        }
    }

    pub fn get(&self, conn_id: ConnectionId) -> Option<ConnectionRecord> {
        self.connections.get(&conn_id).map(|r| r.value().clone())
    }

    pub fn sender_of(&self, conn_id: ConnectionId) -> Option<ConnectionSender> {
        self.connections.get(&conn_id).map(|r| r.sender.clone())
    }

    pub fn list_by_tenant(&self, organization_id: &str) -> Vec<ConnectionRecord> {
        self.connections
            .iter()
            .filter(|entry| {
                entry.identity.organization_id.as_deref() == Some(organization_id)
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Linear scan for the first connection owned by `user_id`.
    /// Fine at the scale this gateway runs at; a userId -> connectionId
    /// index is the known refactor if connection counts grow.
    pub fn find_by_user(&self, user_id: &str) -> Option<ConnectionSender> {
        self.connections
            .iter()
            .find(|entry| entry.identity.user_id == user_id)
            .map(|entry| entry.sender.clone())
    }

    /// Snapshot of (id, last_activity) pairs for the idle sweep.
    pub fn activity_snapshot(&self) -> Vec<(ConnectionId, DateTime<Utc>)> {
        self.connections
            .iter()
            .map(|entry| (*entry.key(), entry.last_activity))
            .collect()
    }

    /// All live senders, for shutdown teardown.
    pub fn all_senders(&self) -> Vec<ConnectionSender> {
        self.connections
            .iter()
            .map(|entry| entry.sender.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Number of distinct user ids among live connections.
    pub fn distinct_users(&self) -> usize {
        let mut seen = std::collections::HashSet::new();
        for entry in self.connections.iter() {
            seen.insert(entry.identity.user_id.clone());
        }
        seen.len()
    }
}
