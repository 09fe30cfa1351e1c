//! Employer Identification Number handling.
//!
//! Two entry points with different tolerance:
//! - [`Ein::parse`] validates caller input: hyphens and surrounding whitespace
//!   are removed, then exactly nine digits must remain.
//! - [`Ein::from_upstream`] absorbs upstream representations: integers and
//!   short digit strings are zero-padded to nine characters.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::error::{ApiError, ApiResult};

const EIN_LENGTH: usize = 9;

/// A canonical nine-digit EIN.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Ein(String);

impl Ein {
    /// Validate an EIN supplied by a caller.
    pub fn parse(input: &str) -> ApiResult<Self> {
        let cleaned: String = input
            .trim()
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .collect();

        if cleaned.len() == EIN_LENGTH && cleaned.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(cleaned))
        } else {
            Err(ApiError::InvalidIdentifier(input.to_string()))
        }
    }

    /// Reduce an upstream EIN value (integer or string) to nine digits.
    ///
    /// Returns `None` when the value cannot be reduced.
    pub fn from_upstream(value: &Value) -> Option<Self> {
        let digits = match value {
            Value::Number(n) => n.as_u64()?.to_string(),
            Value::String(s) => s
                .trim()
                .chars()
                .filter(|c| *c != '-')
                .collect::<String>(),
            _ => return None,
        };

        if digits.is_empty()
            || digits.len() > EIN_LENGTH
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }

        Some(Self(format!("{:0>width$}", digits, width = EIN_LENGTH)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `XX-XXXXXXX` presentation.
    pub fn formatted(&self) -> String {
        format!("{}-{}", &self.0[..2], &self.0[2..])
    }
}

impl fmt::Display for Ein {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ein {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
