#![allow(dead_code)]

use axum::extract::ws::Message;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use shiftbeat_realtime::auth::Identity;
use shiftbeat_realtime::realtime::RealtimeService;
use shiftbeat_realtime::ws::{ConnectionId, ConnectionSender};

/// A fake transport endpoint: the service sees a normal outbox sender,
/// the test reads the frames that would have gone down the wire.
pub struct TestConn {
    pub id: ConnectionId,
    pub tx: ConnectionSender,
    pub rx: UnboundedReceiver<Message>,
}

pub fn identity(user_id: &str, name: &str, role: &str, org: Option<&str>) -> Identity {
    Identity {
        user_id: user_id.to_string(),
        name: name.to_string(),
        role: role.to_string(),
        organization_id: org.map(str::to_string),
    }
}

/// Admit a connection with a fresh id and an in-process outbox.
pub fn connect(service: &RealtimeService, identity: Identity) -> TestConn {
    let id = ConnectionId::new_v4();
    let (tx, rx) = mpsc::unbounded_channel();
    service.admit(id, identity, tx.clone());
    TestConn { id, tx, rx }
}

/// Drain all pending frames, returning (event, data) pairs for text
/// frames and skipping transport-level frames.
pub fn drain_events(rx: &mut UnboundedReceiver<Message>) -> Vec<(String, Value)> {
    let mut events = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        if let Message::Text(text) = msg {
            let frame: Value = serde_json::from_str(text.as_str()).expect("valid JSON frame");
            let event = frame["event"].as_str().expect("event name").to_string();
            events.push((event, frame["data"].clone()));
        }
    }
    events
}

/// Drain and return the data of the first event with the given name.
pub fn find_event(rx: &mut UnboundedReceiver<Message>, name: &str) -> Option<Value> {
    drain_events(rx)
        .into_iter()
        .find(|(event, _)| event == name)
        .map(|(_, data)| data)
}

/// True if the receiver holds a pending Close frame.
pub fn received_close(rx: &mut UnboundedReceiver<Message>) -> bool {
    while let Ok(msg) = rx.try_recv() {
        if matches!(msg, Message::Close(_)) {
            return true;
        }
    }
    false
}
