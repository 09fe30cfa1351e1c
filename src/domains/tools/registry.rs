//! Tool Registry - central registration and dispatch for all tools.
//!
//! This module provides:
//! - A registry of all available tools
//! - HTTP dispatch for tool calls (when http feature is enabled)
//! - Tool metadata for listing

use std::sync::Arc;
#[cfg(feature = "http")]
use tracing::warn;

use rmcp::model::Tool;

use super::definitions::{
    AnalyzeFinancialsTool, ExportTool, GetOrganizationFilingsTool, GetOrganizationSummaryTool,
    GetOrganizationTool, MostRecentPdfTool, PdfSearchTool, SearchNonprofitsTool,
    SimilarNonprofitsTool,
};
#[cfg(feature = "http")]
use super::error::ToolError;
use super::handlers::{NonprofitTool, tool_model};
use crate::domains::nonprofit::NonprofitClient;

/// Tool registry - lists tools and dispatches HTTP calls.
pub struct ToolRegistry {
    #[cfg_attr(not(feature = "http"), allow(dead_code))]
    client: Arc<NonprofitClient>,
}

impl ToolRegistry {
    pub fn new(client: Arc<NonprofitClient>) -> Self {
        Self { client }
    }

    /// Get all tool names.
    pub fn tool_names(&self) -> Vec<&'static str> {
        vec![
            SearchNonprofitsTool::NAME,
            GetOrganizationTool::NAME,
            GetOrganizationFilingsTool::NAME,
            AnalyzeFinancialsTool::NAME,
            SimilarNonprofitsTool::NAME,
            PdfSearchTool::NAME,
            MostRecentPdfTool::NAME,
            ExportTool::NAME,
            GetOrganizationSummaryTool::NAME,
        ]
    }

    /// Get all tools as Tool models (metadata).
    pub fn get_all_tools() -> Vec<Tool> {
        vec![
            tool_model::<SearchNonprofitsTool>(),
            tool_model::<GetOrganizationTool>(),
            tool_model::<GetOrganizationFilingsTool>(),
            tool_model::<AnalyzeFinancialsTool>(),
            tool_model::<SimilarNonprofitsTool>(),
            tool_model::<PdfSearchTool>(),
            tool_model::<MostRecentPdfTool>(),
            tool_model::<ExportTool>(),
            tool_model::<GetOrganizationSummaryTool>(),
        ]
    }

    /// Dispatch an HTTP tool call. Only an unknown name is an `Err`; tool
    /// failures come back as an `isError` result.
    #[cfg(feature = "http")]
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        use super::handlers::http_call;

        let client = self.client.as_ref();
        match name {
            SearchNonprofitsTool::NAME => Ok(http_call::<SearchNonprofitsTool>(arguments, client).await),
            GetOrganizationTool::NAME => Ok(http_call::<GetOrganizationTool>(arguments, client).await),
            GetOrganizationFilingsTool::NAME => {
                Ok(http_call::<GetOrganizationFilingsTool>(arguments, client).await)
            }
            AnalyzeFinancialsTool::NAME => {
                Ok(http_call::<AnalyzeFinancialsTool>(arguments, client).await)
            }
            SimilarNonprofitsTool::NAME => {
                Ok(http_call::<SimilarNonprofitsTool>(arguments, client).await)
            }
            PdfSearchTool::NAME => Ok(http_call::<PdfSearchTool>(arguments, client).await),
            MostRecentPdfTool::NAME => Ok(http_call::<MostRecentPdfTool>(arguments, client).await),
            ExportTool::NAME => Ok(http_call::<ExportTool>(arguments, client).await),
            GetOrganizationSummaryTool::NAME => {
                Ok(http_call::<GetOrganizationSummaryTool>(arguments, client).await)
            }
            _ => {
                warn!("Unknown tool requested: {}", name);
                Err(ToolError::not_found(name))
            }
        }
    }
}
