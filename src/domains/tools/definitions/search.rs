//! Organization search tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use super::common::{clamp_count, now_rfc3339};
use crate::domains::nonprofit::reference::{NTEE_CATEGORIES, SUBSECTION_CODES};
use crate::domains::nonprofit::{ApiError, NonprofitClient, Organization, SearchQuery};
use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::NonprofitTool;

const MAX_PER_PAGE: u64 = 25;

// ============================================================================
// Tool Parameters
// ============================================================================

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchNonprofitsParams {
    /// Search term (organization name, keywords, etc.).
    pub query: String,

    /// Two-letter state code (e.g. "CA", "NY").
    #[serde(default)]
    pub state: Option<String>,

    /// NTEE major category number, 1 to 10.
    #[serde(default)]
    pub ntee_code: Option<String>,

    /// 501(c) subsection code (e.g. "3", "4", "6").
    #[serde(default)]
    pub subsection_code: Option<String>,

    /// Zero-indexed page number.
    #[serde(default)]
    pub page: u32,

    /// Results per page, at most 25.
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_per_page() -> u64 {
    MAX_PER_PAGE
}

// ============================================================================
// Output Structure
// ============================================================================

#[derive(Debug, Serialize)]
struct Filters {
    state: Option<String>,
    ntee_code: Option<String>,
    subsection_code: Option<String>,
}

#[derive(Debug, Serialize)]
struct Pagination {
    page: u32,
    per_page: u64,
    total_results: u64,
    num_pages: u64,
    has_more: bool,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    search_query: String,
    filters: Filters,
    pagination: Pagination,
    organizations: Vec<Organization>,
    generated_at: String,
}

// ============================================================================
// Tool Definition
// ============================================================================

pub struct SearchNonprofitsTool;

/// Blank filter arguments count as absent.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse an optional numeric filter. `valid` describes the accepted values
/// for numbers that do not fit `T`.
fn parse_filter<T: TryFrom<i64>>(
    value: Option<&str>,
    label: &str,
    valid: &str,
) -> Result<Option<T>, ApiError> {
    let Some(raw) = non_blank(value) else {
        return Ok(None);
    };
    let number: i64 = raw.parse().map_err(|_| {
        ApiError::invalid_filter(format!("Invalid {label} '{raw}'. Expected a number"))
    })?;
    T::try_from(number)
        .map(Some)
        .map_err(|_| ApiError::invalid_filter(format!("Invalid {label} '{raw}'. Must be {valid}")))
}

fn subsection_choices() -> String {
    let codes: Vec<String> = SUBSECTION_CODES.iter().map(|(c, _)| c.to_string()).collect();
    format!("one of: {}", codes.join(", "))
}

#[async_trait::async_trait]
impl NonprofitTool for SearchNonprofitsTool {
    const NAME: &'static str = "search_nonprofits";
    const DESCRIPTION: &'static str = "Search for nonprofit organizations by name or keyword, optionally filtered by state, NTEE category (1-10) and 501(c) subsection code. Results are paginated, at most 25 per page.";
    const FAILURE_CONTEXT: &'static str = "Search failed";
    type Params = SearchNonprofitsParams;

    #[instrument(skip_all, fields(query = %params.query))]
    async fn run(params: Self::Params, client: &NonprofitClient) -> Result<Value, ToolError> {
        let per_page = clamp_count(params.per_page, MAX_PER_PAGE);

        let state = non_blank(params.state.as_deref()).map(str::to_string);
        let ntee_range = format!("between 1 and {}", NTEE_CATEGORIES.len());

        let query = SearchQuery {
            query: Some(params.query.clone()),
            state: state.clone(),
            ntee_category: parse_filter(params.ntee_code.as_deref(), "NTEE code", &ntee_range)?,
            subsection_code: parse_filter(
                params.subsection_code.as_deref(),
                "subsection code",
                &subsection_choices(),
            )?,
            page: params.page,
            limit: Some(per_page),
        };
        let results = client.search(&query).await?;

        let response = SearchResponse {
            search_query: params.query,
            filters: Filters {
                state,
                ntee_code: non_blank(params.ntee_code.as_deref()).map(str::to_string),
                subsection_code: non_blank(params.subsection_code.as_deref()).map(str::to_string),
            },
            pagination: Pagination {
                page: params.page,
                per_page,
                total_results: results.total_results,
                num_pages: results.num_pages,
                has_more: results.organizations.len() as u64 == per_page,
            },
            organizations: results.organizations,
            generated_at: now_rfc3339(),
        };
        Ok(serde_json::to_value(response)?)
    }
}
