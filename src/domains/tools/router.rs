//! Tool Router - builds the rmcp ToolRouter for STDIO transport.
//!
//! Every tool shares the one `NonprofitClient` built at startup.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;

use super::definitions::{
    AnalyzeFinancialsTool, ExportTool, GetOrganizationFilingsTool, GetOrganizationSummaryTool,
    GetOrganizationTool, MostRecentPdfTool, PdfSearchTool, SearchNonprofitsTool,
    SimilarNonprofitsTool,
};
use super::handlers::route_for;
use crate::domains::nonprofit::NonprofitClient;

/// Build the tool router with all registered tools.
pub fn build_tool_router<S>(client: Arc<NonprofitClient>) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    ToolRouter::new()
        .with_route(route_for::<SearchNonprofitsTool, S>(client.clone()))
        .with_route(route_for::<GetOrganizationTool, S>(client.clone()))
        .with_route(route_for::<GetOrganizationFilingsTool, S>(client.clone()))
        .with_route(route_for::<AnalyzeFinancialsTool, S>(client.clone()))
        .with_route(route_for::<SimilarNonprofitsTool, S>(client.clone()))
        .with_route(route_for::<PdfSearchTool, S>(client.clone()))
        .with_route(route_for::<MostRecentPdfTool, S>(client.clone()))
        .with_route(route_for::<ExportTool, S>(client.clone()))
        .with_route(route_for::<GetOrganizationSummaryTool, S>(client))
}
