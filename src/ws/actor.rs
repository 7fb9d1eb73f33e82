use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};
use uuid::Uuid;

use crate::auth::Identity;
use crate::state::AppState;
use crate::ws::protocol;

/// Run the actor-per-connection pattern for an authenticated WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards frames from an mpsc channel
/// - Reader task: processes incoming frames, dispatches to the service
///
/// The mpsc channel is the connection's outbox: the registry keeps a
/// clone of the sender so rooms, presence, and the reaper can all push
/// frames to this client. Frames leave in submission order.
pub async fn run_connection(socket: WebSocket, state: AppState, identity: Identity) {
    let conn_id = Uuid::new_v4();
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    // Admit: registry record, tenant-room auto-enroll, user_online fan-out
    state.service.admit(conn_id, identity.clone(), tx.clone());

    // Welcome event confirming the resolved identity scope
    protocol::send_event(
        &tx,
        "connected",
        json!({
            "userId": &identity.user_id,
            "organizationId": &identity.organization_id,
            "timestamp": protocol::now_millis(),
        }),
    );

    tracing::info!(
        connection_id = %conn_id,
        user_id = %identity.user_id,
        "WebSocket actor started"
    );

    // Spawn writer task: forwards mpsc frames to the WebSocket sink
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Track pong reception
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();

    // Spawn ping task: sends periodic pings and monitors pong responses.
    // Prevents connection leaks from abrupt client disconnects.
    let ping_tx = tx.clone();
    let keepalive = state.keepalive;
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(keepalive.ping_interval);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died — connection is gone
                break;
            }

            match timeout(keepalive.pong_timeout, pong_rx.recv()).await {
                Ok(Some(())) => {
                    // Pong received, continue
                }
                _ => {
                    tracing::warn!(connection_id = %conn_id, "pong timeout, closing connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    // Reader loop: process incoming WebSocket frames
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => {
                if handle_frame(msg, &tx, &pong_tx, &state.service, conn_id)
                    == ReadOutcome::Close
                {
                    break;
                }
            }
            Some(Err(e)) => {
                tracing::warn!(
                    connection_id = %conn_id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
            None => {
                // Stream ended — client disconnected
                tracing::info!(connection_id = %conn_id, "WebSocket stream ended");
                break;
            }
        }
    }

    // Cleanup: abort writer and ping tasks
    writer_handle.abort();
    ping_handle.abort();

    // Registry removal, room pruning, user_offline fan-out
    state.service.disconnect(conn_id);

    tracing::info!(
        connection_id = %conn_id,
        user_id = %identity.user_id,
        "WebSocket actor stopped"
    );
}

/// Outcome of one inbound frame.
#[derive(Debug, PartialEq, Eq)]
enum ReadOutcome {
    Continue,
    Close,
}

/// Process one inbound frame.
///
/// Only wire events (text frames) count as client activity. Transport
/// keepalive frames must not refresh last-activity: the server pings on
/// an interval and endpoints auto-reply with pong, so counting those
/// would keep every live transport forever young and the idle sweep
/// would never evict anything.
fn handle_frame(
    msg: Message,
    tx: &mpsc::UnboundedSender<Message>,
    pong_tx: &mpsc::UnboundedSender<()>,
    service: &crate::realtime::RealtimeService,
    conn_id: Uuid,
) -> ReadOutcome {
    match msg {
        Message::Text(text) => {
            service.touch(conn_id);
            protocol::handle_text_message(text.as_str(), tx, service, conn_id);
            ReadOutcome::Continue
        }
        Message::Binary(_) => {
            tracing::debug!(
                connection_id = %conn_id,
                "received binary frame (protocol is JSON text)"
            );
            ReadOutcome::Continue
        }
        Message::Pong(_) => {
            // Keepalive input only — notify the ping task
            let _ = pong_tx.send(());
            ReadOutcome::Continue
        }
        Message::Ping(data) => {
            // Respond to client pings with pong
            let _ = tx.send(Message::Pong(data));
            ReadOutcome::Continue
        }
        Message::Close(frame) => {
            tracing::info!(
                connection_id = %conn_id,
                reason = ?frame,
                "client initiated close"
            );
            ReadOutcome::Close
        }
    }
}

/// Writer task: receives frames from the outbox and forwards them to the
/// WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed — connection is broken
            break;
        }
    }
}
