use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Shiftbeat real-time presence gateway
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(
    name = "shiftbeat-realtime",
    version,
    about = "Shiftbeat real-time presence and broadcast gateway"
)]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "SHIFTBEAT_PORT", default_value = "4010")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "SHIFTBEAT_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./shiftbeat.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "SHIFTBEAT_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for persistent state (JWT signing key)
    #[arg(long, env = "SHIFTBEAT_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Allowed cross-origin endpoint for the WebSocket handshake.
    /// When unset, any Origin is accepted.
    #[arg(long, env = "SHIFTBEAT_ALLOWED_ORIGIN")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origin: Option<String>,

    /// Path to a JSON identity roster for standalone/dev runs.
    /// Production embeds the gateway and supplies its own identity store.
    #[arg(long, env = "SHIFTBEAT_ROSTER")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roster: Option<String>,

    /// WebSocket keep-alive ping interval in seconds
    #[arg(long, env = "SHIFTBEAT_PING_INTERVAL_SECS", default_value = "30")]
    pub ping_interval_secs: u64,

    /// Close the connection if no pong arrives within this many seconds
    #[arg(long, env = "SHIFTBEAT_PONG_TIMEOUT_SECS", default_value = "10")]
    pub pong_timeout_secs: u64,

    /// Interval between idle-connection sweeps in seconds
    #[arg(long, env = "SHIFTBEAT_REAPER_INTERVAL_SECS", default_value = "600")]
    pub reaper_interval_secs: u64,

    /// Connections idle longer than this many seconds are reaped
    #[arg(long, env = "SHIFTBEAT_IDLE_TIMEOUT_SECS", default_value = "1800")]
    pub idle_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4010,
            bind_address: "0.0.0.0".to_string(),
            config: "./shiftbeat.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            allowed_origin: None,
            roster: None,
            ping_interval_secs: 30,
            pong_timeout_secs: 10,
            reaper_interval_secs: 600,
            idle_timeout_secs: 1800,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (SHIFTBEAT_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("SHIFTBEAT_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Shiftbeat Realtime Gateway Configuration
# Place this file at ./shiftbeat.toml or specify with --config <path>
# All settings can be overridden via environment variables (SHIFTBEAT_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 4010)
# port = 4010

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the JWT signing key
# data_dir = "./data"

# Allowed cross-origin endpoint for the WebSocket handshake.
# Unset = accept any Origin (development only).
# allowed_origin = "https://app.shiftbeat.example"

# JSON identity roster for standalone/dev runs.
# Array of { "user_id", "name", "role", "organization_id" } objects.
# roster = "./roster.json"

# ---- Keep-alive tuning ----

# WebSocket ping interval in seconds (default: 30)
# ping_interval_secs = 30

# Pong timeout in seconds (default: 10)
# pong_timeout_secs = 10

# ---- Idle reaping ----

# Interval between idle-connection sweeps in seconds (default: 600)
# reaper_interval_secs = 600

# Connections idle longer than this are force-closed (default: 1800)
# idle_timeout_secs = 1800
"#
    .to_string()
}
