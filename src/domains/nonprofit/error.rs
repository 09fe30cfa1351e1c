//! Error taxonomy for the nonprofit API access layer.

use thiserror::Error;

/// A specialized Result type for nonprofit API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Errors raised by the upstream client, the executor and the normalizer.
///
/// Only `UpstreamRequestFailed` is ever produced after retrying; every other
/// variant is surfaced on first occurrence.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The EIN is not exactly nine digits once hyphens and whitespace are removed.
    #[error("Invalid EIN format: '{0}'. Must be 9 digits (e.g., '123456789' or '12-3456789')")]
    InvalidIdentifier(String),

    /// A search filter is outside its reference table.
    #[error("{0}")]
    InvalidFilter(String),

    /// HTTP-level failure: a status code or a network fault.
    #[error("{message}")]
    UpstreamRequestFailed {
        message: String,
        status_code: Option<u16>,
        details: Option<serde_json::Value>,
    },

    /// The upstream replied with a body that is not valid JSON.
    #[error("Invalid JSON response: {0}")]
    InvalidResponse(String),

    /// A single organization record could not be normalized.
    #[error("Invalid organization data: {0}")]
    InvalidOrganizationData(String),

    /// A single filing record could not be normalized.
    #[error("Invalid filing data: {0}")]
    InvalidFilingData(String),

    /// The upstream answered but the requested entity is absent.
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    /// Create an "invalid filter" error.
    pub fn invalid_filter(msg: impl Into<String>) -> Self {
        Self::InvalidFilter(msg.into())
    }

    /// Create an upstream failure carrying an optional HTTP status.
    pub fn upstream(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::UpstreamRequestFailed {
            message: message.into(),
            status_code,
            details: None,
        }
    }

    /// Create a "not found" error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Classification tag reported to tool callers as `error_type`.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) => "InvalidIdentifier",
            Self::InvalidFilter(_) => "InvalidFilter",
            Self::UpstreamRequestFailed { .. } => "UpstreamRequestFailed",
            Self::InvalidResponse(_) => "InvalidResponse",
            Self::InvalidOrganizationData(_) => "InvalidOrganizationData",
            Self::InvalidFilingData(_) => "InvalidFilingData",
            Self::NotFound(_) => "NotFound",
        }
    }

    /// HTTP status code attached to an upstream failure, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::UpstreamRequestFailed { status_code, .. } => *status_code,
            _ => None,
        }
    }
}
