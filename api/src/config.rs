use std::net::SocketAddr;

use clap::Parser;

/// Runtime configuration, flags over environment variables.
#[derive(Debug, Clone, Parser)]
#[command(name = "hotmap-api", about = "Meme-word vote accounting service")]
pub struct Config {
    /// Listen address.
    #[arg(long, env = "HOTMAP_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: SocketAddr,

    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Max connections in the Postgres pool.
    #[arg(long, env = "HOTMAP_DB_MAX_CONNECTIONS", default_value_t = 16)]
    pub db_max_connections: u32,

    /// Per-request timeout in milliseconds.
    #[arg(long, env = "HOTMAP_REQUEST_TIMEOUT_MS", default_value_t = 5_000)]
    pub request_timeout_ms: u64,

    /// Max in-flight requests.
    #[arg(long, env = "HOTMAP_CONCURRENCY_LIMIT", default_value_t = 1_024)]
    pub concurrency_limit: usize,

    /// Allowed CORS origins, comma separated; "*" allows any.
    #[arg(long, env = "HOTMAP_ALLOWED_ORIGINS", default_value = "*")]
    pub allowed_origins: String,

    /// Bearer token guarding /admin routes; unset disables them.
    #[arg(long, env = "HOTMAP_ADMIN_TOKEN")]
    pub admin_token: Option<String>,

    /// Log filter, RUST_LOG syntax.
    #[arg(long, env = "HOTMAP_LOG", default_value = "info,hotmap_core=debug")]
    pub log_filter: String,

    /// Human-readable logs instead of JSON.
    #[arg(long, env = "HOTMAP_LOG_PRETTY", default_value_t = false)]
    pub log_pretty: bool,
}
