use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::auth;
use crate::state::AppState;
use crate::ws::actor;

/// Cookie carrying the access token when the query parameter is absent.
const TOKEN_COOKIE: &str = "sb_token";

/// Query parameters for WebSocket connection.
/// Primary credential channel is ?token=JWT; cookie is the fallback.
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: Option<String>,
}

/// GET /ws?token=JWT
/// WebSocket upgrade endpoint. Authenticates before admitting.
/// On auth failure, upgrades then immediately closes with a 4xxx close
/// code and no application payload — the client never learns why.
/// On success, spawns an actor for the connection.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsAuthQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    // Origin allow-list for browser handshakes
    if let Some(allowed) = &state.allowed_origin {
        let origin = headers
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok());
        if let Some(origin) = origin {
            if origin != allowed {
                tracing::warn!(origin, "WebSocket handshake from disallowed origin");
                return StatusCode::FORBIDDEN.into_response();
            }
        }
    }

    let token = params.token.or_else(|| cookie_token(&headers));

    match auth::authenticate(
        token.as_deref(),
        &state.jwt_secret,
        state.identities.as_ref(),
    )
    .await
    {
        Ok(identity) => {
            tracing::info!(
                user_id = %identity.user_id,
                organization_id = ?identity.organization_id,
                "WebSocket connection authenticated"
            );
            ws.on_upgrade(move |socket| handle_authenticated(socket, state, identity))
        }
        Err(err) => {
            let close_code = err.close_code();
            tracing::warn!(close_code, error = %err, "WebSocket auth failed");

            // Upgrade the connection, then immediately close with the
            // bare close code.
            ws.on_upgrade(move |mut socket| async move {
                let close_frame = CloseFrame {
                    code: close_code,
                    reason: "".into(),
                };
                let _ = socket.send(Message::Close(Some(close_frame))).await;
            })
        }
    }
}

/// Handle an authenticated WebSocket connection by spawning the actor.
async fn handle_authenticated(socket: WebSocket, state: AppState, identity: auth::Identity) {
    actor::run_connection(socket, state, identity).await;
}

/// Extract the access token from the Cookie header, if present.
fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == TOKEN_COOKIE).then(|| value.to_string())
    })
}
