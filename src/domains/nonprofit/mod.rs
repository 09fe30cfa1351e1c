//! Nonprofit data API access layer.
//!
//! Data flow for every operation:
//! `NonprofitClient` → `RateLimiter::acquire` → `HttpExecutor::execute`
//! (with retry) → raw JSON → `normalize` → canonical entity.
//!
//! - `rate_limiter.rs` - sliding-window request budget shared by all callers
//! - `executor.rs` - GET with timeout, retry and error normalization
//! - `normalize.rs` - fail-soft coercion of upstream fragments
//! - `client.rs` - public operations (search, organization, filings, ...)
//! - `models.rs` / `ein.rs` / `reference.rs` - entity shapes and fixed tables

mod client;
mod ein;
mod error;
mod executor;
pub mod models;
pub mod normalize;
mod rate_limiter;
pub mod reference;

pub use client::{NonprofitClient, SearchQuery};
pub use ein::Ein;
pub use error::{ApiError, ApiResult};
pub use executor::HttpExecutor;
pub use models::{
    Filing, FinancialSnapshot, FormType, Organization, OrganizationSummary, PdfFiling,
    PdfOrganization, SearchResult,
};
pub use rate_limiter::RateLimiter;
