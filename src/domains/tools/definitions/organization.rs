//! Organization lookup tools: detail record and summary.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use super::common::now_rfc3339;
use crate::domains::nonprofit::{NonprofitClient, Organization, OrganizationSummary};
use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::NonprofitTool;

/// Parameters shared by tools that take a single EIN.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EinParams {
    /// Employer Identification Number, 9 digits with or without hyphen.
    pub ein: String,
}

#[derive(Debug, Serialize)]
struct OrganizationResponse {
    organization: Organization,
    retrieved_at: String,
}

#[derive(Debug, Serialize)]
struct SummaryResponse {
    #[serde(flatten)]
    summary: OrganizationSummary,
    retrieved_at: String,
}

pub struct GetOrganizationTool;

#[async_trait::async_trait]
impl NonprofitTool for GetOrganizationTool {
    const NAME: &'static str = "get_organization";
    const DESCRIPTION: &'static str =
        "Get detailed information about a nonprofit organization by EIN.";
    const FAILURE_CONTEXT: &'static str = "Failed to retrieve organization";
    type Params = EinParams;

    #[instrument(skip_all, fields(ein = %params.ein))]
    async fn run(params: Self::Params, client: &NonprofitClient) -> Result<Value, ToolError> {
        let organization = client.get_organization(&params.ein).await?;
        Ok(serde_json::to_value(OrganizationResponse {
            organization,
            retrieved_at: now_rfc3339(),
        })?)
    }
}

pub struct GetOrganizationSummaryTool;

#[async_trait::async_trait]
impl NonprofitTool for GetOrganizationSummaryTool {
    const NAME: &'static str = "get_organization_summary";
    const DESCRIPTION: &'static str = "Get an organization profile together with its filing years and a financial snapshot of the most recent filing.";
    const FAILURE_CONTEXT: &'static str = "Failed to build organization summary";
    type Params = EinParams;

    #[instrument(skip_all, fields(ein = %params.ein))]
    async fn run(params: Self::Params, client: &NonprofitClient) -> Result<Value, ToolError> {
        let summary = client.get_organization_summary(&params.ein).await?;
        Ok(serde_json::to_value(SummaryResponse {
            summary,
            retrieved_at: now_rfc3339(),
        })?)
    }
}
