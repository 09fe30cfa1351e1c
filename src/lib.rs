//! Nonprofit MCP Server Library
//!
//! A Model Context Protocol server over the ProPublica Nonprofit Explorer
//! API: organization search, profiles, Form 990 filings, financial trend
//! analysis, similar-organization discovery, filing PDFs and bulk export.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, the MCP server and transports
//! - **domains**: business logic organized by bounded contexts
//!   - **nonprofit**: rate-limited upstream client and data normalization
//!   - **tools**: MCP tools built on the client
//!   - **resources**: static reference tables and server info
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use nonprofit_mcp_server::core::{Config, McpServer, TransportService};
//! use nonprofit_mcp_server::domains::nonprofit::NonprofitClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let client = Arc::new(NonprofitClient::new(&config.upstream)?);
//!     let transport = TransportService::new(config.transport.clone());
//!     transport.run(McpServer::new(config, client)).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

pub use core::{Config, Error, McpServer, Result};
