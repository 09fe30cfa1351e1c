//! Nonprofit data client: the façade over executor and normalizer.

use futures::{StreamExt, future, stream};
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::ein::Ein;
use super::error::{ApiError, ApiResult};
use super::executor::HttpExecutor;
use super::models::{
    Filing, FinancialSnapshot, Organization, OrganizationSummary, PdfFiling, PdfOrganization,
    SearchResult, sort_most_recent_first,
};
use super::normalize::{normalize_filing, normalize_organization, normalize_search_page};
use super::reference::{self, NTEE_CATEGORIES, SUBSECTION_CODES, US_STATES};
use crate::core::config::UpstreamConfig;
use crate::core::{Error, Result};

const SEARCH_PATH: &str = "/search.json";

/// Number of PDF lookups kept in flight by [`NonprofitClient::get_organizations_with_pdfs`].
const PDF_LOOKUP_CONCURRENCY: usize = 4;

/// Search parameters. Unset filters are not sent upstream.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub state: Option<String>,
    pub ntee_category: Option<u8>,
    pub subsection_code: Option<u16>,
    /// Zero-indexed page.
    pub page: u32,
    /// Caps the number of organizations kept from the page.
    pub limit: Option<u64>,
}

impl SearchQuery {
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// Validate filters and build the upstream query parameters.
    fn to_params(&self) -> ApiResult<Vec<(&'static str, String)>> {
        let mut params = Vec::new();

        if let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            params.push(("q", query.to_string()));
        }

        if let Some(state) = self.state.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let state = state.to_ascii_uppercase();
            if !reference::is_valid_state(&state) {
                let mut valid = US_STATES.to_vec();
                valid.sort_unstable();
                return Err(ApiError::invalid_filter(format!(
                    "Invalid state code '{}'. Must be one of: {}",
                    state,
                    valid.join(", ")
                )));
            }
            params.push(("state[id]", state));
        }

        if let Some(category) = self.ntee_category {
            if reference::ntee_category_name(category).is_none() {
                return Err(ApiError::invalid_filter(format!(
                    "Invalid NTEE category {}. Must be between 1 and {}",
                    category,
                    NTEE_CATEGORIES.len()
                )));
            }
            params.push(("ntee[id]", category.to_string()));
        }

        if let Some(code) = self.subsection_code {
            if reference::subsection_label(code).is_none() {
                let valid: Vec<String> = SUBSECTION_CODES.iter().map(|(c, _)| c.to_string()).collect();
                return Err(ApiError::invalid_filter(format!(
                    "Invalid subsection code '{}'. Must be one of: {}",
                    code,
                    valid.join(", ")
                )));
            }
            params.push(("c_code[id]", code.to_string()));
        }

        if self.page > 0 {
            params.push(("page", self.page.to_string()));
        }

        Ok(params)
    }
}

/// Client for the nonprofit data API.
///
/// One instance is built at startup and shared by every tool. It owns the
/// pooled HTTP connection and the rate limiter; both are released on drop.
#[derive(Debug)]
pub struct NonprofitClient {
    executor: HttpExecutor,
}

impl NonprofitClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let executor = HttpExecutor::new(config)
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;
        info!("Nonprofit API client ready ({})", executor.base_url());
        Ok(Self { executor })
    }

    pub fn base_url(&self) -> &str {
        self.executor.base_url()
    }

    /// Search organizations. Filters are validated before any request.
    #[instrument(skip(self), fields(query = ?query.query))]
    pub async fn search(&self, query: &SearchQuery) -> ApiResult<SearchResult> {
        let params = query.to_params()?;
        let body = self.executor.execute(SEARCH_PATH, &params).await?;
        let result = normalize_search_page(&body, query.limit);

        info!(
            "Search returned {} of {} organizations",
            result.organizations.len(),
            result.total_results
        );
        Ok(result)
    }

    /// Search by organization name, keeping at most `limit` hits.
    pub async fn search_by_name(&self, name: &str, limit: u64) -> ApiResult<Vec<Organization>> {
        let query = SearchQuery {
            limit: Some(limit),
            ..SearchQuery::text(name)
        };
        Ok(self.search(&query).await?.organizations)
    }

    pub async fn get_organization(&self, ein: &str) -> ApiResult<Organization> {
        let ein = Ein::parse(ein)?;
        self.organization_by_ein(&ein).await
    }

    /// Filings for one organization, optionally limited to one tax year.
    /// Upstream order is preserved.
    pub async fn get_filings(&self, ein: &str, year: Option<i32>) -> ApiResult<Vec<Filing>> {
        let ein = Ein::parse(ein)?;
        self.filings_by_ein(&ein, year).await
    }

    /// Most recent filing that has a PDF, or `None` when no filing has one.
    #[instrument(skip(self))]
    pub async fn get_most_recent_pdf_filing(&self, ein: &str) -> ApiResult<Option<PdfFiling>> {
        let ein = Ein::parse(ein)?;
        let (organization, mut filings) =
            tokio::try_join!(self.organization_by_ein(&ein), self.filings_by_ein(&ein, None))?;

        sort_most_recent_first(&mut filings);

        Ok(filings.into_iter().find_map(|filing| {
            let pdf_url = filing.pdf_url.filter(|url| !url.is_empty())?;
            Some(PdfFiling {
                organization_name: organization.name.clone(),
                tax_year: filing.tax_year,
                form_type: filing.form_type,
                pdf_url,
                filing_date: filing.filing_date,
            })
        }))
    }

    /// Organization profile, filing years and a snapshot of the latest filing.
    #[instrument(skip(self))]
    pub async fn get_organization_summary(&self, ein: &str) -> ApiResult<OrganizationSummary> {
        let ein = Ein::parse(ein)?;
        let (organization, mut filings) =
            tokio::try_join!(self.organization_by_ein(&ein), self.filings_by_ein(&ein, None))?;

        sort_most_recent_first(&mut filings);

        Ok(OrganizationSummary {
            organization,
            filing_years: filings.iter().filter_map(|f| f.tax_year).collect(),
            total_filings: filings.len(),
            financial_summary: filings.first().map(FinancialSnapshot::from),
        })
    }

    /// Search, then keep the first `limit` hits that have a PDF filing.
    ///
    /// Hits whose `have_pdfs` hint is explicitly false are skipped without a
    /// lookup. Lookup failures are logged and skipped.
    #[instrument(skip(self))]
    pub async fn get_organizations_with_pdfs(
        &self,
        query: &str,
        limit: usize,
    ) -> ApiResult<Vec<PdfOrganization>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let page = self.search(&SearchQuery::text(query)).await?;
        let candidates: Vec<Organization> = page
            .organizations
            .into_iter()
            .filter(|org| org.have_pdfs != Some(false))
            .collect();

        let found: Vec<PdfOrganization> = stream::iter(candidates)
            .map(|org| async move {
                let pdf = self.get_most_recent_pdf_filing(org.ein.as_str()).await;
                (org, pdf)
            })
            .buffered(PDF_LOOKUP_CONCURRENCY)
            .filter_map(|(org, pdf)| {
                future::ready(match pdf {
                    Ok(Some(most_recent_pdf)) => Some(PdfOrganization {
                        ein: org.ein,
                        name: org.name,
                        city: org.city,
                        state: org.state,
                        ntee_code: org.ntee_code,
                        most_recent_pdf,
                    }),
                    Ok(None) => None,
                    Err(e) => {
                        warn!("Skipping {} in PDF search: {}", org.ein, e);
                        None
                    }
                })
            })
            .take(limit)
            .collect()
            .await;

        info!("Found {} organizations with PDF filings", found.len());
        Ok(found)
    }

    // ========================================================================
    // Internals (EIN already validated)
    // ========================================================================

    async fn fetch_organization_payload(&self, ein: &Ein) -> ApiResult<Value> {
        self.executor
            .execute(&format!("/organizations/{ein}.json"), &[])
            .await
    }

    async fn organization_by_ein(&self, ein: &Ein) -> ApiResult<Organization> {
        let body = self.fetch_organization_payload(ein).await?;
        organization_from_payload(&body, ein)
    }

    async fn filings_by_ein(&self, ein: &Ein, year: Option<i32>) -> ApiResult<Vec<Filing>> {
        let body = self.fetch_organization_payload(ein).await?;
        Ok(filings_from_payload(&body, ein, year))
    }
}

/// Accepts the organization as an object or a single-element list.
fn organization_from_payload(body: &Value, ein: &Ein) -> ApiResult<Organization> {
    let raw = match body.get("organization") {
        Some(Value::Array(items)) => items.first(),
        other => other,
    }
    .filter(|raw| match raw {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    })
    .ok_or_else(|| ApiError::not_found(format!("Organization with EIN {ein} not found")))?;

    normalize_organization(raw)
}

fn filings_from_payload(body: &Value, ein: &Ein, year: Option<i32>) -> Vec<Filing> {
    let Some(items) = body.get("filings_with_data").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let mut raw = item.clone();
            if let Some(map) = raw.as_object_mut() {
                map.insert("ein".to_string(), Value::String(ein.to_string()));
            }
            match normalize_filing(&raw) {
                Ok(filing) => Some(filing),
                Err(e) => {
                    warn!("Skipping filing for {}: {}", ein, e);
                    None
                }
            }
        })
        .filter(|filing| year.is_none_or(|y| filing.tax_year == Some(y)))
        .collect()
}
