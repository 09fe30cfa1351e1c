//! Form 990 PDF tools.

use chrono::{DateTime, FixedOffset};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use super::common::now_rfc3339;
use super::organization::EinParams;
use crate::domains::nonprofit::{Ein, FormType, NonprofitClient, PdfOrganization};
use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::NonprofitTool;

// ============================================================================
// search_nonprofits_with_pdfs
// ============================================================================

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PdfSearchParams {
    /// Search term (organization name, keywords, etc.).
    pub query: String,

    /// Maximum number of organizations to return.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Serialize)]
struct PdfSearchCriteria {
    have_pdfs: bool,
    pdf_url_required: bool,
}

#[derive(Debug, Serialize)]
struct PdfSearchResponse {
    search_query: String,
    pdf_organizations_found: usize,
    organizations: Vec<PdfOrganization>,
    search_criteria: PdfSearchCriteria,
    generated_at: String,
}

pub struct PdfSearchTool;

#[async_trait::async_trait]
impl NonprofitTool for PdfSearchTool {
    const NAME: &'static str = "search_nonprofits_with_pdfs";
    const DESCRIPTION: &'static str = "Search for nonprofit organizations that have Form 990 PDF filings available, with the most recent PDF for each.";
    const FAILURE_CONTEXT: &'static str = "PDF search failed";
    type Params = PdfSearchParams;

    #[instrument(skip_all, fields(query = %params.query, limit = params.limit))]
    async fn run(params: Self::Params, client: &NonprofitClient) -> Result<Value, ToolError> {
        let organizations = client
            .get_organizations_with_pdfs(&params.query, params.limit)
            .await?;

        Ok(serde_json::to_value(PdfSearchResponse {
            search_query: params.query,
            pdf_organizations_found: organizations.len(),
            organizations,
            search_criteria: PdfSearchCriteria {
                have_pdfs: true,
                pdf_url_required: true,
            },
            generated_at: now_rfc3339(),
        })?)
    }
}

// ============================================================================
// get_most_recent_pdf
// ============================================================================

#[derive(Debug, Serialize)]
struct PdfDetails {
    tax_year: Option<i32>,
    form_type: Option<FormType>,
    pdf_url: String,
    filing_date: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Serialize)]
struct DownloadInstructions {
    method: &'static str,
    url: String,
    note: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MostRecentPdfResponse {
    Found {
        ein: Ein,
        organization_name: String,
        has_pdf: bool,
        most_recent_pdf: PdfDetails,
        download_instructions: DownloadInstructions,
        retrieved_at: String,
    },
    Missing {
        ein: Ein,
        has_pdf: bool,
        message: &'static str,
        searched_at: String,
    },
}

pub struct MostRecentPdfTool;

#[async_trait::async_trait]
impl NonprofitTool for MostRecentPdfTool {
    const NAME: &'static str = "get_most_recent_pdf";
    const DESCRIPTION: &'static str = "Get the most recent Form 990 filing with a downloadable PDF for an organization, starting from the latest tax year and working backwards.";
    const FAILURE_CONTEXT: &'static str = "Failed to get most recent PDF";
    type Params = EinParams;

    #[instrument(skip_all, fields(ein = %params.ein))]
    async fn run(params: Self::Params, client: &NonprofitClient) -> Result<Value, ToolError> {
        let ein = Ein::parse(&params.ein)?;

        let response = match client.get_most_recent_pdf_filing(ein.as_str()).await? {
            None => MostRecentPdfResponse::Missing {
                ein,
                has_pdf: false,
                message: "No PDF filings found for this organization",
                searched_at: now_rfc3339(),
            },
            Some(pdf) => MostRecentPdfResponse::Found {
                ein,
                organization_name: pdf.organization_name,
                has_pdf: true,
                download_instructions: DownloadInstructions {
                    method: "GET",
                    url: pdf.pdf_url.clone(),
                    note: "This URL redirects to the PDF file on the upstream document server",
                },
                most_recent_pdf: PdfDetails {
                    tax_year: pdf.tax_year,
                    form_type: pdf.form_type,
                    pdf_url: pdf.pdf_url,
                    filing_date: pdf.filing_date,
                },
                retrieved_at: now_rfc3339(),
            },
        };
        Ok(serde_json::to_value(response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::testing::{
        client_for, filing, mount_organization, mount_search, organization,
    };
    use crate::domains::tools::handlers::{call, result_text};
    use serde_json::json;
    use wiremock::MockServer;

    fn body_of(result: &rmcp::model::CallToolResult) -> Value {
        serde_json::from_str(result_text(result).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_most_recent_pdf_found() {
        let server = MockServer::start().await;
        mount_organization(
            &server,
            "123456789",
            organization("123456789", "Helpers", "OR", "P20"),
            vec![
                filing(2021, 800.0, 700.0, Some("https://example.org/2021.pdf")),
                filing(2023, 1000.0, 900.0, None),
                filing(2022, 900.0, 800.0, Some("https://example.org/2022.pdf")),
            ],
        )
        .await;
        let client = client_for(&server);

        let result = call::<MostRecentPdfTool>(json!({"ein": "12-3456789"}), &client).await;
        assert_ne!(result.is_error, Some(true));
        let body = body_of(&result);
        assert_eq!(body["has_pdf"], true);
        assert_eq!(body["organization_name"], "Helpers");
        assert_eq!(body["most_recent_pdf"]["tax_year"], 2022);
        assert_eq!(body["most_recent_pdf"]["form_type"], "990");
        assert_eq!(body["download_instructions"]["method"], "GET");
        assert_eq!(body["download_instructions"]["url"], "https://example.org/2022.pdf");
        assert!(body["retrieved_at"].is_string());
    }

    #[tokio::test]
    async fn test_most_recent_pdf_missing() {
        let server = MockServer::start().await;
        mount_organization(
            &server,
            "123456789",
            organization("123456789", "Helpers", "OR", "P20"),
            vec![filing(2023, 1000.0, 900.0, None)],
        )
        .await;
        let client = client_for(&server);

        let result = call::<MostRecentPdfTool>(json!({"ein": "123456789"}), &client).await;
        assert_ne!(result.is_error, Some(true));
        let body = body_of(&result);
        assert_eq!(body["ein"], "123456789");
        assert_eq!(body["has_pdf"], false);
        assert_eq!(body["message"], "No PDF filings found for this organization");
        assert!(body["searched_at"].is_string());
    }

    #[tokio::test]
    async fn test_pdf_search_keeps_organizations_with_pdfs() {
        let server = MockServer::start().await;
        mount_search(
            &server,
            vec![
                organization("111111111", "Has Pdf", "CA", "B20"),
                organization("222222222", "No Pdf", "CA", "B20"),
            ],
            2,
        )
        .await;
        mount_organization(
            &server,
            "111111111",
            organization("111111111", "Has Pdf", "CA", "B20"),
            vec![filing(2022, 10.0, 5.0, Some("https://example.org/a.pdf"))],
        )
        .await;
        mount_organization(
            &server,
            "222222222",
            organization("222222222", "No Pdf", "CA", "B20"),
            vec![filing(2022, 10.0, 5.0, None)],
        )
        .await;
        let client = client_for(&server);

        let result = call::<PdfSearchTool>(json!({"query": "schools"}), &client).await;
        assert_ne!(result.is_error, Some(true));
        let body = body_of(&result);
        assert_eq!(body["search_query"], "schools");
        assert_eq!(body["pdf_organizations_found"], 1);
        assert_eq!(body["organizations"][0]["ein"], "111111111");
        assert_eq!(
            body["organizations"][0]["most_recent_pdf"]["pdf_url"],
            "https://example.org/a.pdf"
        );
        assert_eq!(body["search_criteria"]["pdf_url_required"], true);
    }
}
