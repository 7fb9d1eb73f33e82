use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use shiftbeat_realtime::auth;
use shiftbeat_realtime::auth::store::{InMemoryIdentityStore, SharedIdentityStore};
use shiftbeat_realtime::config::{generate_config_template, Config};
use shiftbeat_realtime::realtime::{reaper, RealtimeService};
use shiftbeat_realtime::routes;
use shiftbeat_realtime::state::{AppState, KeepaliveConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "shiftbeat_realtime=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "shiftbeat_realtime=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!(
        "Shiftbeat realtime gateway v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    std::fs::create_dir_all(&config.data_dir)?;

    // Load or generate the HS256 secret shared with the token issuer
    let jwt_secret = auth::jwt::load_or_generate_jwt_secret(&config.data_dir)?;

    // Identity store: roster file for standalone/dev runs, empty otherwise.
    // An empty store admits nobody — production embeds the gateway library
    // and supplies its own store.
    let identities: SharedIdentityStore = match &config.roster {
        Some(path) => {
            let store = InMemoryIdentityStore::from_json_file(path)
                .map_err(|e| format!("failed to load roster {path}: {e}"))?;
            tracing::info!(roster = %path, identities = store.len(), "identity roster loaded");
            Arc::new(store)
        }
        None => {
            tracing::warn!("no identity roster configured; all connections will be refused");
            Arc::new(InMemoryIdentityStore::new())
        }
    };

    // The realtime core: one instance per process, torn down on shutdown
    let service = Arc::new(RealtimeService::new());

    // Idle sweep, stopped explicitly on teardown
    let reaper_handle = reaper::spawn(
        service.clone(),
        Duration::from_secs(config.reaper_interval_secs),
        Duration::from_secs(config.idle_timeout_secs),
    );

    let app_state = AppState {
        service: service.clone(),
        identities,
        jwt_secret,
        allowed_origin: config.allowed_origin.clone(),
        keepalive: KeepaliveConfig {
            ping_interval: Duration::from_secs(config.ping_interval_secs),
            pong_timeout: Duration::from_secs(config.pong_timeout_secs),
        },
    };

    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Teardown: stop the sweep, flush all connections
    reaper_handle.abort();
    service.shutdown();
    tracing::info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
