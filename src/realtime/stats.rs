use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Process-wide counters. Reset only on restart.
#[derive(Debug)]
pub struct Stats {
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    messages_sent: AtomicU64,
    started_at: Instant,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Counts delivery attempts; best-effort fan-out has no confirmed
    /// receipt to count instead.
    pub fn record_dispatched(&self, attempted: usize) {
        self.messages_sent
            .fetch_add(attempted as u64, Ordering::Relaxed);
    }

    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Read-only snapshot handed to external callers (stats endpoint,
/// embedding HTTP layer).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_connections: u64,
    pub active_connections: u64,
    pub messages_sent: u64,
    pub room_count: usize,
    pub connected_users: usize,
    pub organization_rooms: usize,
    /// Seconds since service start; serialized as `uptime` per the
    /// collaborator contract.
    #[serde(rename = "uptime")]
    pub uptime_secs: u64,
}
