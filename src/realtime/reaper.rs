//! Periodic idle-connection sweep.
//!
//! The reaper only initiates closes; the normal disconnect path does the
//! cleanup. The task is owned by whoever spawned it and is aborted on
//! shutdown, so tests and teardown never leak a dangling timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;

use super::RealtimeService;

pub fn spawn(
    service: Arc<RealtimeService>,
    sweep_interval: Duration,
    idle_threshold: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = interval(sweep_interval);
        // Skip the immediate first tick
        timer.tick().await;

        loop {
            timer.tick().await;
            let reaped = service.reap_idle(idle_threshold.as_secs());
            if reaped > 0 {
                tracing::info!(reaped, "idle sweep closed connections");
            }
        }
    })
}
