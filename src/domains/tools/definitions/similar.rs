//! Similar-organization search tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::common::{clamp_count, now_rfc3339, revenue_similarity};
use crate::domains::nonprofit::{
    Ein, NonprofitClient, Organization, SearchQuery,
    reference::{ntee_category_from_code, ntee_category_name},
};
use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::NonprofitTool;

const MAX_SIMILAR: usize = 25;

/// Extra hits requested so that dropping the reference organization still fills the page.
const SEARCH_HEADROOM: usize = 5;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SimilarNonprofitsParams {
    /// Reference organization's EIN, 9 digits with or without hyphen.
    pub ein: String,

    /// Geographic radius in miles. Recorded in the search criteria only.
    #[serde(default)]
    pub radius_miles: Option<u32>,

    /// Restrict results to the reference organization's NTEE category.
    #[serde(default = "default_same_ntee")]
    pub same_ntee: bool,

    /// Minimum annual revenue. Organizations with unknown revenue are kept.
    #[serde(default)]
    pub min_revenue: Option<f64>,

    /// Maximum annual revenue. Organizations with unknown revenue are kept.
    #[serde(default)]
    pub max_revenue: Option<f64>,

    /// Maximum number of similar organizations, at most 25.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_same_ntee() -> bool {
    true
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Serialize)]
struct ReferenceOrganization {
    ein: Ein,
    name: String,
    state: Option<String>,
    ntee_code: Option<String>,
    revenue: Option<f64>,
}

#[derive(Debug, Serialize)]
struct SearchCriteria {
    same_ntee: bool,
    radius_miles: Option<u32>,
    min_revenue: Option<f64>,
    max_revenue: Option<f64>,
    limit: usize,
}

#[derive(Debug, Serialize)]
struct SimilarityFactors {
    same_state: bool,
    same_ntee_category: bool,
    similar_revenue_range: &'static str,
}

#[derive(Debug, Serialize)]
struct Comparison {
    organization: Organization,
    similarity_factors: SimilarityFactors,
}

#[derive(Debug, Serialize)]
struct SimilarResponse {
    reference_organization: ReferenceOrganization,
    search_criteria: SearchCriteria,
    similar_organizations_found: usize,
    similar_organizations: Vec<Comparison>,
    generated_at: String,
}

fn ntee_prefix(code: Option<&str>) -> Option<String> {
    code.map(|c| c.trim().chars().take(3).collect::<String>())
        .filter(|prefix| !prefix.is_empty())
}

fn within_revenue(org: &Organization, min: Option<f64>, max: Option<f64>) -> bool {
    let Some(revenue) = org.revenue_amount else {
        return true;
    };
    min.is_none_or(|min| revenue >= min) && max.is_none_or(|max| revenue <= max)
}

fn compare(reference: &Organization, candidate: Organization) -> Comparison {
    let reference_prefix = ntee_prefix(reference.ntee_code.as_deref());
    let similarity_factors = SimilarityFactors {
        same_state: candidate.state.is_some() && candidate.state == reference.state,
        same_ntee_category: reference_prefix.is_some()
            && ntee_prefix(candidate.ntee_code.as_deref()) == reference_prefix,
        similar_revenue_range: revenue_similarity(
            candidate.revenue_amount,
            reference.revenue_amount,
        ),
    };
    Comparison {
        organization: candidate,
        similarity_factors,
    }
}

pub struct SimilarNonprofitsTool;

#[async_trait::async_trait]
impl NonprofitTool for SimilarNonprofitsTool {
    const NAME: &'static str = "search_similar_nonprofits";
    const DESCRIPTION: &'static str = "Find nonprofits similar to a reference organization: same state and, by default, the same NTEE category. Optional revenue bounds filter the results (default 10, max 25).";
    const FAILURE_CONTEXT: &'static str = "Similar organization search failed";
    type Params = SimilarNonprofitsParams;

    #[instrument(skip_all, fields(ein = %params.ein))]
    async fn run(params: Self::Params, client: &NonprofitClient) -> Result<Value, ToolError> {
        let ein = Ein::parse(&params.ein)?;
        let limit = clamp_count(params.limit, MAX_SIMILAR);
        let reference = client.get_organization(ein.as_str()).await?;

        let ntee_category = if params.same_ntee {
            let category = reference.ntee_code.as_deref().and_then(ntee_category_from_code);
            match category {
                Some(id) if ntee_category_name(id).is_none() => {
                    warn!(
                        "NTEE code {:?} maps to category {} which the search filter does not accept",
                        reference.ntee_code, id
                    );
                    None
                }
                other => other,
            }
        } else {
            None
        };

        let query = SearchQuery {
            query: Some(
                reference
                    .ntee_code
                    .clone()
                    .filter(|code| !code.trim().is_empty())
                    .unwrap_or_else(|| "nonprofit".to_string()),
            ),
            state: reference.state.clone().filter(|s| !s.is_empty()),
            ntee_category,
            limit: Some((limit + SEARCH_HEADROOM) as u64),
            ..SearchQuery::default()
        };
        let results = client.search(&query).await?;

        let similar: Vec<Comparison> = results
            .organizations
            .into_iter()
            .filter(|org| org.ein != reference.ein)
            .filter(|org| within_revenue(org, params.min_revenue, params.max_revenue))
            .take(limit)
            .map(|org| compare(&reference, org))
            .collect();
        info!("Found {} organizations similar to {}", similar.len(), reference.ein);

        Ok(serde_json::to_value(SimilarResponse {
            reference_organization: ReferenceOrganization {
                ein: reference.ein,
                name: reference.name,
                state: reference.state,
                ntee_code: reference.ntee_code,
                revenue: reference.revenue_amount,
            },
            search_criteria: SearchCriteria {
                same_ntee: params.same_ntee,
                radius_miles: params.radius_miles,
                min_revenue: params.min_revenue,
                max_revenue: params.max_revenue,
                limit,
            },
            similar_organizations_found: similar.len(),
            similar_organizations: similar,
            generated_at: now_rfc3339(),
        })?)
    }
}
