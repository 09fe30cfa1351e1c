//! Form 990 filings tool.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use super::common::{clamp_count, now_rfc3339};
use crate::domains::nonprofit::{Ein, Filing, NonprofitClient};
use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::NonprofitTool;

const MAX_FILINGS: usize = 100;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetFilingsParams {
    /// Employer Identification Number, 9 digits with or without hyphen.
    pub ein: String,

    /// Maximum number of filings to return, at most 100.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Serialize)]
struct YearRange {
    earliest: Option<i32>,
    latest: Option<i32>,
}

#[derive(Debug, Serialize)]
struct RevenueRange {
    min: Option<f64>,
    max: Option<f64>,
}

#[derive(Debug, Serialize)]
struct FilingSummary {
    total_filings: usize,
    filings_returned: usize,
    year_range: YearRange,
    form_types: Vec<&'static str>,
    total_revenue_range: RevenueRange,
}

impl FilingSummary {
    /// Aggregates are taken over every filing, not only the returned ones.
    fn over(filings: &[Filing], returned: usize) -> Self {
        let years = || filings.iter().filter_map(|f| f.tax_year);
        let revenues: Vec<f64> = filings
            .iter()
            .filter_map(|f| f.total_revenue)
            .filter(|r| *r != 0.0)
            .collect();
        let form_types: BTreeSet<&'static str> = filings
            .iter()
            .filter_map(|f| f.form_type.map(|t| t.as_str()))
            .collect();

        Self {
            total_filings: filings.len(),
            filings_returned: returned,
            year_range: YearRange {
                earliest: years().min(),
                latest: years().max(),
            },
            form_types: form_types.into_iter().collect(),
            total_revenue_range: RevenueRange {
                min: revenues.iter().copied().reduce(f64::min),
                max: revenues.iter().copied().reduce(f64::max),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct FilingsResponse {
    ein: Ein,
    total_filings_available: usize,
    filings_returned: usize,
    filing_summary: FilingSummary,
    filings: Vec<Filing>,
    retrieved_at: String,
}

pub struct GetOrganizationFilingsTool;

#[async_trait::async_trait]
impl NonprofitTool for GetOrganizationFilingsTool {
    const NAME: &'static str = "get_organization_filings";
    const DESCRIPTION: &'static str = "Get Form 990 filings and their financial figures for a nonprofit organization, in upstream order. Returns at most `limit` filings (default 10, max 100) plus a summary over all of them.";
    const FAILURE_CONTEXT: &'static str = "Failed to retrieve filings";
    type Params = GetFilingsParams;

    #[instrument(skip_all, fields(ein = %params.ein))]
    async fn run(params: Self::Params, client: &NonprofitClient) -> Result<Value, ToolError> {
        let ein = Ein::parse(&params.ein)?;
        let limit = clamp_count(params.limit, MAX_FILINGS);

        let mut filings = client.get_filings(ein.as_str(), None).await?;
        let summary = FilingSummary::over(&filings, filings.len().min(limit));
        filings.truncate(limit);

        Ok(serde_json::to_value(FilingsResponse {
            ein,
            total_filings_available: summary.total_filings,
            filings_returned: filings.len(),
            filing_summary: summary,
            filings,
            retrieved_at: now_rfc3339(),
        })?)
    }
}
