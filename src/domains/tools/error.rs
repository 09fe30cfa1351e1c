//! Tool-specific error types.

use serde_json::{Value, json};
use thiserror::Error;

use crate::domains::nonprofit::ApiError;

/// Errors that can occur during tool operations.
///
/// None of these escape a tool: each is rendered into an
/// `{"error", "error_type"}` payload by the handler layer.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Failure reported by the nonprofit API layer.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Invalid arguments were provided to the tool.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The upstream answered but there is nothing to work with.
    #[error("{0}")]
    NoData(String),

    /// A result could not be rendered as JSON.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV rendering failed.
    #[error("Export failed: {0}")]
    Export(String),
}

impl ToolError {
    /// Create a new "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new "invalid arguments" error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    pub fn no_data(msg: impl Into<String>) -> Self {
        Self::NoData(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Classification tag reported as `error_type`.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "ToolNotFound",
            Self::Api(e) => e.error_type(),
            Self::InvalidArguments(_) => "InvalidArguments",
            Self::NoData(_) => "NoData",
            Self::Serialization(_) => "SerializationError",
            Self::Export(_) => "ExportError",
        }
    }

    /// Structured error value returned to the caller.
    pub fn to_payload(&self, context: &str) -> Value {
        let mut payload = json!({
            "error": format!("{context}: {self}"),
            "error_type": self.error_type(),
        });
        if let Some(status) = self.status_code() {
            payload["status_code"] = json!(status);
        }
        payload
    }

    fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api(e) => e.status_code(),
            _ => None,
        }
    }
}

impl From<csv::Error> for ToolError {
    fn from(e: csv::Error) -> Self {
        Self::Export(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_carries_context_and_tag() {
        let err = ToolError::from(ApiError::InvalidIdentifier("12".into()));
        let payload = err.to_payload("Failed to retrieve organization");

        assert_eq!(payload["error_type"], "InvalidIdentifier");
        let message = payload["error"].as_str().unwrap();
        assert!(message.starts_with("Failed to retrieve organization: Invalid EIN format"));
        assert!(payload.get("status_code").is_none());
    }

    #[test]
    fn test_payload_includes_upstream_status() {
        let err = ToolError::from(ApiError::upstream("HTTP 404: missing", Some(404)));
        let payload = err.to_payload("Search failed");
        assert_eq!(payload["error_type"], "UpstreamRequestFailed");
        assert_eq!(payload["status_code"], 404);
    }

    #[test]
    fn test_tool_level_tags() {
        assert_eq!(ToolError::no_data("none").error_type(), "NoData");
        assert_eq!(ToolError::invalid_arguments("x").error_type(), "InvalidArguments");
        assert_eq!(ToolError::not_found("nope").error_type(), "ToolNotFound");
    }
}
