//! Error types and handling for the MCP server.
//!
//! This module defines a unified error type that can represent errors from
//! the nonprofit API layer, the tool boundary, resources and transports.

use thiserror::Error;

/// A specialized Result type for MCP server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the MCP server.
///
/// This enum captures all possible error conditions that can occur during
/// server operation, including domain-specific errors and external failures.
#[derive(Debug, Error)]
pub enum Error {
    /// Error originating from the tools domain.
    #[error("Tool error: {0}")]
    Tool(#[from] crate::domains::tools::ToolError),

    /// Error originating from the upstream nonprofit API layer.
    #[error("API error: {0}")]
    Api(#[from] crate::domains::nonprofit::ApiError),

    /// Error originating from the resources domain.
    #[error("Resource error: {0}")]
    Resource(#[from] crate::domains::resources::ResourceError),

    /// Transport startup or serving failure.
    #[error("Transport error: {0}")]
    Transport(#[from] super::transport::TransportError),

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::nonprofit::ApiError;

    #[test]
    fn test_domain_errors_convert() {
        let err: Error = ApiError::not_found("Organization with EIN 123456789 not found").into();
        assert!(matches!(err, Error::Api(_)));
        assert!(err.to_string().starts_with("API error:"));

        let err = Error::config("bad port");
        assert_eq!(err.to_string(), "Configuration error: bad port");
    }
}
