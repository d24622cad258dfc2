use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use hookcast::{HookServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hookcast", about = "Capture webhooks and stream them live per channel")]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "HOOKCAST_BIND", default_value = "0.0.0.0:5000")]
    bind: SocketAddr,

    /// Path prefix for all routes
    #[arg(long, env = "HOOKCAST_PREFIX", default_value = "/api")]
    prefix: String,

    /// Journal file for durable storage (in-memory when unset)
    #[arg(long, env = "HOOKCAST_JOURNAL")]
    journal: Option<PathBuf>,

    /// Seconds an event stays queryable
    #[arg(long, env = "HOOKCAST_RETENTION_SECS", default_value_t = 86_400)]
    retention_secs: u64,

    /// Maximum events returned by a history query
    #[arg(long, env = "HOOKCAST_HISTORY_LIMIT", default_value_t = 50)]
    history_limit: usize,

    /// Per-subscriber queue depth before the subscriber is dropped
    #[arg(long, env = "HOOKCAST_SUBSCRIBER_BUFFER", default_value_t = 256)]
    subscriber_buffer: usize,

    /// Allowed CORS origin (any when unset)
    #[arg(long, env = "HOOKCAST_CORS_ORIGIN")]
    cors_origin: Option<String>,

    /// Seconds between SSE keep-alive comments
    #[arg(long, env = "HOOKCAST_KEEP_ALIVE_SECS", default_value_t = 15)]
    keep_alive_secs: u64,

    /// Maximum accepted webhook body size in bytes
    #[arg(long, env = "HOOKCAST_MAX_BODY_SIZE", default_value_t = 1024 * 1024)]
    max_body_size: usize,

    /// Seconds between expired-event sweeps
    #[arg(long, env = "HOOKCAST_SWEEP_SECS", default_value_t = 60)]
    sweep_secs: u64,

    /// Maximum concurrent event streams (0 = unlimited)
    #[arg(long, env = "HOOKCAST_MAX_CONNECTIONS", default_value_t = 0)]
    max_connections: usize,

    /// Emit logs as JSON
    #[arg(long, env = "HOOKCAST_LOG_JSON")]
    log_json: bool,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::with_addr(self.bind)
            .route_prefix(self.prefix.clone())
            .retention(Duration::from_secs(self.retention_secs))
            .history_limit(self.history_limit)
            .subscriber_buffer(self.subscriber_buffer)
            .keep_alive_interval(Duration::from_secs(self.keep_alive_secs))
            .max_body_size(self.max_body_size)
            .sweep_interval(Duration::from_secs(self.sweep_secs))
            .max_connections(self.max_connections);

        if let Some(path) = &self.journal {
            config = config.journal(path);
        }
        if let Some(origin) = &self.cors_origin {
            config = config.cors_origin(origin);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hookcast=info,tower_http=info"));
    if cli.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let server = HookServer::from_config(cli.server_config())
        .await
        .context("failed to open event store")?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("server error")?;

    Ok(())
}
