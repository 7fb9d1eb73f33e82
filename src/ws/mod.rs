pub mod actor;
pub mod handler;
pub mod protocol;

use tokio::sync::mpsc;

/// Opaque per-connection identifier, minted by the transport layer at
/// upgrade time. Rooms hold these; only the registry holds the records.
pub type ConnectionId = uuid::Uuid;

/// Sender half of a connection's outbox channel. Any part of the system
/// can clone this to push frames to a specific client; the writer task
/// owns the receiving end and the actual sink.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;
