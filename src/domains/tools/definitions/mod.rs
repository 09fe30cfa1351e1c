//! Tool definitions module.
//!
//! One file per tool (the two PDF tools and the two single-EIN lookups share
//! a file); `common.rs` holds the shared arithmetic and test fixtures.

mod common;
pub mod export;
pub mod filings;
pub mod financials;
pub mod organization;
pub mod pdf;
pub mod search;
pub mod similar;

#[cfg(test)]
pub(crate) use common::testing;

pub use export::ExportTool;
pub use filings::GetOrganizationFilingsTool;
pub use financials::AnalyzeFinancialsTool;
pub use organization::{GetOrganizationSummaryTool, GetOrganizationTool};
pub use pdf::{MostRecentPdfTool, PdfSearchTool};
pub use search::SearchNonprofitsTool;
pub use similar::SimilarNonprofitsTool;
