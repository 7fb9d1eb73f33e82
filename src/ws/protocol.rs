//! JSON wire protocol.
//!
//! Every frame, both directions, is a text message of the shape
//! `{ "event": "<name>", "data": { ... } }`. Inbound frames are decoded
//! here and routed to the realtime service; malformed frames earn the
//! sender an `error` event and nothing else.

use axum::extract::ws::Message;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::realtime::rooms::DEFAULT_DASHBOARD;
use crate::realtime::RealtimeService;
use crate::ws::{ConnectionId, ConnectionSender};

/// Inbound envelope. `data` defaults to null for bare events like ping.
#[derive(Debug, Deserialize)]
pub struct ClientEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
struct OrganizationScope {
    #[serde(rename = "organizationId")]
    organization_id: String,
}

/// Server timestamp stamped onto every emitted event, unix millis.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Encode an event once so fan-out clones bytes, not re-serializes.
pub fn encode_event(event: &str, data: Value) -> Message {
    let frame = json!({ "event": event, "data": data });
    Message::Text(frame.to_string().into())
}

/// Send an event to a single connection's outbox.
pub fn send_event(tx: &ConnectionSender, event: &str, data: Value) {
    let _ = tx.send(encode_event(event, data));
}

/// Send an `error` event. Authorization and validation failures are
/// contained to the offending connection.
pub fn send_error(tx: &ConnectionSender, message: &str) {
    send_event(tx, "error", json!({ "message": message }));
}

/// Decode an inbound text frame and dispatch it.
/// All handlers are synchronous, in-memory operations.
pub fn handle_text_message(
    text: &str,
    tx: &ConnectionSender,
    service: &RealtimeService,
    conn_id: ConnectionId,
) {
    let envelope: ClientEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(connection_id = %conn_id, error = %err, "malformed client frame");
            send_error(tx, "invalid message envelope");
            return;
        }
    };

    match envelope.event.as_str() {
        "join_organization" => {
            match serde_json::from_value::<OrganizationScope>(envelope.data) {
                Ok(scope) => {
                    service.handle_join_organization(conn_id, tx, &scope.organization_id)
                }
                Err(_) => send_error(tx, "organizationId required"),
            }
        }
        "leave_organization" => {
            match serde_json::from_value::<OrganizationScope>(envelope.data) {
                Ok(scope) => {
                    service.handle_leave_organization(conn_id, tx, &scope.organization_id)
                }
                Err(_) => send_error(tx, "organizationId required"),
            }
        }
        "dashboard_subscribe" => {
            let board = dashboard_type(&envelope.data);
            service.handle_dashboard_subscribe(conn_id, tx, board);
        }
        "dashboard_unsubscribe" => {
            let board = dashboard_type(&envelope.data);
            service.handle_dashboard_unsubscribe(conn_id, tx, board);
        }
        "attendance_update" => {
            service.handle_attendance_update(conn_id, tx, envelope.data);
        }
        "ping" => {
            service.handle_ping(conn_id, tx);
        }
        other => {
            tracing::debug!(connection_id = %conn_id, event = other, "unknown client event");
            send_error(tx, &format!("unknown event: {other}"));
        }
    }
}

fn dashboard_type(data: &Value) -> &str {
    data.get("dashboardType")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_DASHBOARD)
}
