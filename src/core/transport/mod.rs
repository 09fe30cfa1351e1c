//! Transport layer for the MCP server.
//!
//! - **STDIO** (feature `stdio`, default): rmcp over stdin/stdout.
//! - **HTTP** (feature `http`): JSON-RPC over `POST /mcp` plus `GET /health`.

mod config;
mod error;
mod service;

#[cfg(feature = "http")]
pub mod http;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use service::TransportService;

#[cfg(feature = "http")]
pub use config::HttpConfig;
