use std::sync::Arc;
use std::time::Duration;

use crate::auth::store::SharedIdentityStore;
use crate::realtime::RealtimeService;

/// Transport keep-alive tuning, from config.
#[derive(Debug, Clone, Copy)]
pub struct KeepaliveConfig {
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
}

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// The realtime core — single instance per process
    pub service: Arc<RealtimeService>,
    /// Identity collaborator used at admission time
    pub identities: SharedIdentityStore,
    /// HS256 secret shared with the platform's token issuer
    pub jwt_secret: Vec<u8>,
    /// Allowed Origin for browser handshakes; None accepts any
    pub allowed_origin: Option<String>,
    /// WebSocket ping/pong tuning
    pub keepalive: KeepaliveConfig,
}
