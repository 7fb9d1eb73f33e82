mod common;

use chrono::{Duration, Utc};
use shiftbeat_realtime::realtime::RealtimeService;

use common::{connect, identity, received_close};

const THRESHOLD_SECS: u64 = 1800;

#[tokio::test]
async fn stale_connection_is_closed_on_sweep() {
    let service = RealtimeService::new();
    let mut stale = connect(&service, identity("u-1", "Ada", "employee", Some("org-1")));

    service
        .registry()
        .touch_at(stale.id, Utc::now() - Duration::seconds(THRESHOLD_SECS as i64 + 1));

    let reaped = service.reap_idle(THRESHOLD_SECS);
    assert_eq!(reaped, 1);
    assert!(received_close(&mut stale.rx));
}

#[tokio::test]
async fn fresh_connection_survives_sweep() {
    let service = RealtimeService::new();
    let mut fresh = connect(&service, identity("u-1", "Ada", "employee", Some("org-1")));

    service
        .registry()
        .touch_at(fresh.id, Utc::now() - Duration::seconds(THRESHOLD_SECS as i64 - 1));

    let reaped = service.reap_idle(THRESHOLD_SECS);
    assert_eq!(reaped, 0);
    assert!(!received_close(&mut fresh.rx));
    assert!(service.registry().get(fresh.id).is_some());
}

#[tokio::test]
async fn sweep_continues_past_dead_transports() {
    let service = RealtimeService::new();
    let dead = connect(&service, identity("u-1", "Ada", "employee", Some("org-1")));
    let mut alive = connect(&service, identity("u-2", "Ben", "employee", Some("org-1")));

    let long_ago = Utc::now() - Duration::seconds(THRESHOLD_SECS as i64 + 60);
    service.registry().touch_at(dead.id, long_ago);
    service.registry().touch_at(alive.id, long_ago);

    // One member's transport is already gone; the send fails silently
    drop(dead.rx);

    let reaped = service.reap_idle(THRESHOLD_SECS);
    assert_eq!(reaped, 2);
    assert!(received_close(&mut alive.rx));
}

#[tokio::test]
async fn reaper_task_is_abortable() {
    let service = std::sync::Arc::new(RealtimeService::new());
    let handle = shiftbeat_realtime::realtime::reaper::spawn(
        service.clone(),
        std::time::Duration::from_secs(600),
        std::time::Duration::from_secs(THRESHOLD_SECS),
    );

    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());
}
