//! Nonprofit MCP server entry point.
//!
//! Loads configuration, initializes logging on stderr (stdout belongs to the
//! stdio transport), builds the shared upstream client and serves.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use nonprofit_mcp_server::core::{Config, McpServer, TransportService};
use nonprofit_mcp_server::domains::nonprofit::NonprofitClient;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    init_logging(&config.logging.level);
    for ignored in &config.ignored_env {
        warn!("{}", ignored);
    }

    config.validate().context("invalid configuration")?;

    info!("Starting {} v{}", config.server.name, config.server.version);
    info!(
        "Upstream {} ({} requests per {}s)",
        config.upstream.base_url, config.upstream.max_requests, config.upstream.window_secs
    );

    let client = Arc::new(
        NonprofitClient::new(&config.upstream).context("failed to build upstream client")?,
    );

    let transport = TransportService::new(config.transport.clone());
    let server = McpServer::new(config, client);

    info!("Server initialized");

    transport.run(server).await?;

    info!("Server shutting down");

    Ok(())
}

/// Configure tracing with the given level; `RUST_LOG` directives still apply.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();
}
