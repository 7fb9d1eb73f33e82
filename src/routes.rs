use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::realtime::presence::OnlineUser;
use crate::realtime::stats::StatsSnapshot;
use crate::state::AppState;
use crate::ws;

/// Build the gateway router: the WebSocket endpoint plus read-only
/// projections for the platform's HTTP layer and ops tooling.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::handler::ws_upgrade))
        .route("/healthz", get(healthz))
        .route("/api/realtime/stats", get(get_stats))
        .route(
            "/api/realtime/organizations/{organization_id}/online",
            get(get_online_users),
        )
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

/// GET /api/realtime/stats — process-wide counters snapshot.
async fn get_stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.service.stats())
}

/// GET /api/realtime/organizations/{id}/online — current roster,
/// derived from live registry state.
async fn get_online_users(
    State(state): State<AppState>,
    Path(organization_id): Path<String>,
) -> Json<Vec<OnlineUser>> {
    Json(state.service.online_users(&organization_id))
}
