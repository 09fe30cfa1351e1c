//! Configuration management for the MCP server.
//!
//! Defaults are overridden by `MCP_`-prefixed environment variables, which may
//! also come from a `.env` file.

use super::error::{Error, Result};
use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://projects.propublica.org/nonprofits/api/v2";

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Upstream nonprofit API access.
    pub upstream: UpstreamConfig,

    /// Variables that were set but could not be parsed. Logged once tracing is up.
    #[serde(skip)]
    pub ignored_env: Vec<String>,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// Upstream API client settings: endpoint, timeout, rate budget and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,

    /// Per-request timeout.
    pub timeout_secs: u64,

    /// Requests allowed per `window_secs`.
    pub max_requests: usize,
    pub window_secs: u64,

    /// Retries after the first attempt for 5xx and network faults.
    pub max_retries: u32,

    /// Backoff before retry `n` is `retry_base_delay_ms * 2^n`.
    pub retry_base_delay_ms: u64,

    pub user_agent: String,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            timeout_secs: 30,
            max_requests: 60,
            window_secs: 60,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            user_agent: format!("Nonprofit-MCP-Server/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "nonprofit-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            transport: TransportConfig::default(),
            upstream: UpstreamConfig::default(),
            ignored_env: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_UPSTREAM_MAX_REQUESTS`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.transport = TransportConfig::from_env();

        let ignored = &mut config.ignored_env;
        let upstream = &mut config.upstream;
        if let Ok(base_url) = std::env::var("MCP_UPSTREAM_BASE_URL") {
            upstream.base_url = base_url;
        }
        if let Ok(user_agent) = std::env::var("MCP_UPSTREAM_USER_AGENT") {
            upstream.user_agent = user_agent;
        }
        env_override("MCP_UPSTREAM_TIMEOUT_SECS", &mut upstream.timeout_secs, ignored);
        env_override("MCP_UPSTREAM_MAX_REQUESTS", &mut upstream.max_requests, ignored);
        env_override("MCP_UPSTREAM_WINDOW_SECS", &mut upstream.window_secs, ignored);
        env_override("MCP_UPSTREAM_MAX_RETRIES", &mut upstream.max_retries, ignored);
        env_override("MCP_UPSTREAM_RETRY_BASE_MS", &mut upstream.retry_base_delay_ms, ignored);

        config
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        let upstream = &self.upstream;

        if !(upstream.base_url.starts_with("http://") || upstream.base_url.starts_with("https://"))
        {
            return Err(Error::config(format!(
                "upstream base URL must start with http:// or https:// (got '{}')",
                upstream.base_url
            )));
        }
        if upstream.max_requests == 0 {
            return Err(Error::config("upstream rate budget must be at least 1 request"));
        }
        if upstream.window_secs == 0 {
            return Err(Error::config("upstream rate window must be at least 1 second"));
        }
        if upstream.timeout_secs == 0 {
            return Err(Error::config("upstream timeout must be at least 1 second"));
        }

        Ok(())
    }
}

/// Overwrite `target` with a parsed environment value. An unparseable value
/// keeps the default and is recorded in `ignored`.
fn env_override<T: FromStr>(key: &str, target: &mut T, ignored: &mut Vec<String>) {
    let Ok(raw) = std::env::var(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(_) => ignored.push(format!("Ignoring {key}='{raw}': not a valid number")),
    }
}

// Mutex to ensure env var tests run serially, across modules
#[cfg(test)]
pub(crate) static ENV_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
