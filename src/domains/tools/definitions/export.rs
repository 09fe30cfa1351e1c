//! Multi-organization export tool (JSON or CSV).
//!
//! Each EIN is exported independently: an upstream failure for one
//! organization lands in `errors` and the others still export. Malformed EINs
//! fail the whole request before anything is fetched.

use std::collections::BTreeSet;

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{error, info, instrument, warn};

use crate::domains::nonprofit::{
    Ein, Filing, NonprofitClient, models::sort_most_recent_first,
};
use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::NonprofitTool;

const MAX_ORGANIZATIONS: usize = 10;

/// Leading CSV columns, in this order, when present in any row.
const KEY_COLUMNS: &[&str] = &[
    "ein",
    "organization_name",
    "sub_name",
    "street_address",
    "city",
    "state",
    "zipcode",
    "ntee_code",
    "subsection_code",
];

/// Nested fields left out of CSV output.
const NON_TABULAR_COLUMNS: &[&str] = &["recent_filings"];

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExportParams {
    /// EINs to export, at most 10.
    pub eins: Vec<String>,

    /// Output format: "json" or "csv".
    #[serde(default = "default_format")]
    pub format: String,

    /// Add figures from the most recent filing.
    #[serde(default = "default_true")]
    pub include_financials: bool,

    /// Add the most recent filings as a nested list (JSON only).
    #[serde(default)]
    pub include_filings: bool,

    /// Filings per organization when `include_filings` is set.
    #[serde(default = "default_max_filings")]
    pub max_filings_per_org: usize,
}

fn default_format() -> String {
    "json".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_filings() -> usize {
    3
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    fn parse(raw: &str) -> Result<Self, ToolError> {
        match raw {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(ToolError::invalid_arguments(
                "Invalid format. Must be 'json' or 'csv'",
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ExportFailure {
    ein: Ein,
    error: String,
    error_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ExportMetadata {
    include_financials: bool,
    include_filings: bool,
    max_filings_per_org: usize,
    api_version: &'static str,
    source: &'static str,
}

#[derive(Debug, Serialize)]
struct ExportResult {
    export_id: String,
    generated_at: String,
    total_organizations: usize,
    successful_exports: usize,
    failed_exports: usize,
    export_format: ExportFormat,
    organizations: Vec<Map<String, Value>>,
    errors: Vec<ExportFailure>,
    metadata: ExportMetadata,
}

#[derive(Debug, Serialize)]
struct CsvEnvelope {
    export_metadata: CsvMetadata,
    csv_data: String,
}

#[derive(Debug, Serialize)]
struct CsvMetadata {
    export_id: String,
    generated_at: String,
    total_organizations: usize,
    successful_exports: usize,
    failed_exports: usize,
    errors: Vec<ExportFailure>,
}

impl From<ExportResult> for CsvMetadata {
    fn from(result: ExportResult) -> Self {
        Self {
            export_id: result.export_id,
            generated_at: result.generated_at,
            total_organizations: result.total_organizations,
            successful_exports: result.successful_exports,
            failed_exports: result.failed_exports,
            errors: result.errors,
        }
    }
}

fn validate(params: &ExportParams) -> Result<(ExportFormat, Vec<Ein>), ToolError> {
    if params.eins.is_empty() {
        return Err(ToolError::invalid_arguments("No EINs provided for export"));
    }
    if params.eins.len() > MAX_ORGANIZATIONS {
        return Err(ToolError::invalid_arguments(format!(
            "Maximum {MAX_ORGANIZATIONS} organizations allowed per export"
        )));
    }
    let format = ExportFormat::parse(params.format.trim())?;
    let eins = params
        .eins
        .iter()
        .map(|raw| Ein::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((format, eins))
}

/// Build one export row. Filings are fetched at most once; a filings failure
/// only drops the filing-derived fields.
async fn export_row(
    client: &NonprofitClient,
    ein: &Ein,
    params: &ExportParams,
) -> Result<Map<String, Value>, ToolError> {
    let org = client.get_organization(ein.as_str()).await?;

    let mut row = Map::new();
    row.insert("ein".into(), json!(ein));
    row.insert("organization_name".into(), json!(org.name));
    row.insert("sub_name".into(), json!(org.secondary_name));
    row.insert("street_address".into(), json!(org.address));
    row.insert("city".into(), json!(org.city));
    row.insert("state".into(), json!(org.state));
    row.insert("zipcode".into(), json!(org.zip_code));
    row.insert("ntee_code".into(), json!(org.ntee_code));
    row.insert("subsection_code".into(), json!(org.subsection_code));
    row.insert("guidestar_url".into(), json!(org.guidestar_url));
    row.insert("nccs_url".into(), json!(org.nccs_url));
    row.insert(
        "updated".into(),
        json!(org.last_updated.map(|t| t.to_rfc3339())),
    );

    if !params.include_financials && !params.include_filings {
        return Ok(row);
    }

    let mut filings = match client.get_filings(ein.as_str(), None).await {
        Ok(filings) => filings,
        Err(e) => {
            warn!("Could not get filings for {}: {}", ein, e);
            return Ok(row);
        }
    };
    sort_most_recent_first(&mut filings);

    if params.include_financials {
        if let Some(latest) = filings.first() {
            add_latest_financials(&mut row, latest);
        }
    }
    if params.include_filings {
        filings.truncate(params.max_filings_per_org);
        row.insert("recent_filings".into(), serde_json::to_value(&filings)?);
    }
    Ok(row)
}

fn add_latest_financials(row: &mut Map<String, Value>, latest: &Filing) {
    row.insert("latest_filing_year".into(), json!(latest.tax_year));
    row.insert("latest_total_revenue".into(), json!(latest.total_revenue));
    row.insert(
        "latest_total_expenses".into(),
        json!(latest.total_functional_expenses),
    );
    row.insert("latest_net_assets".into(), json!(latest.net_assets()));
    row.insert(
        "latest_filing_date".into(),
        json!(latest.filing_date.map(|t| t.to_rfc3339())),
    );
}

/// Key columns first, then every other scalar column sorted by name.
fn csv_columns(rows: &[Map<String, Value>]) -> Vec<String> {
    let mut remaining: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .filter(|key| !NON_TABULAR_COLUMNS.contains(key))
        .collect();

    let mut columns: Vec<String> = KEY_COLUMNS
        .iter()
        .filter(|key| remaining.remove(**key))
        .map(|key| key.to_string())
        .collect();
    columns.extend(remaining.into_iter().map(str::to_string));
    columns
}

fn csv_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn render_csv(rows: &[Map<String, Value>]) -> Result<String, ToolError> {
    if rows.is_empty() {
        return Ok(String::new());
    }

    let columns = csv_columns(rows);
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|column| csv_cell(row.get(column))))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ToolError::export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ToolError::export(e.to_string()))
}

pub struct ExportTool;

#[async_trait::async_trait]
impl NonprofitTool for ExportTool {
    const NAME: &'static str = "export_nonprofit_data";
    const DESCRIPTION: &'static str = "Export data for up to 10 nonprofit organizations as JSON or CSV, optionally with latest financials and recent filings. Per-organization failures are reported alongside successful rows.";
    const FAILURE_CONTEXT: &'static str = "Export failed";
    type Params = ExportParams;

    #[instrument(skip_all, fields(count = params.eins.len(), format = %params.format))]
    async fn run(params: Self::Params, client: &NonprofitClient) -> Result<Value, ToolError> {
        let (format, eins) = validate(&params)?;
        let now = Utc::now();

        let mut organizations = Vec::new();
        let mut errors = Vec::new();
        for ein in &eins {
            match export_row(client, ein, &params).await {
                Ok(row) => organizations.push(row),
                Err(e) => {
                    error!("Error exporting data for {}: {}", ein, e);
                    errors.push(ExportFailure {
                        ein: ein.clone(),
                        error: e.to_string(),
                        error_type: e.error_type(),
                    });
                }
            }
        }
        info!(
            "Exported {} of {} organizations",
            organizations.len(),
            eins.len()
        );

        let result = ExportResult {
            export_id: format!("nonprofit_export_{}", now.format("%Y%m%d_%H%M%S")),
            generated_at: now.to_rfc3339(),
            total_organizations: eins.len(),
            successful_exports: organizations.len(),
            failed_exports: errors.len(),
            export_format: format,
            organizations,
            errors,
            metadata: ExportMetadata {
                include_financials: params.include_financials,
                include_filings: params.include_filings,
                max_filings_per_org: if params.include_filings {
                    params.max_filings_per_org
                } else {
                    0
                },
                api_version: "v2",
                source: "ProPublica Nonprofit Explorer",
            },
        };

        match format {
            ExportFormat::Json => Ok(serde_json::to_value(result)?),
            ExportFormat::Csv => {
                let csv_data = render_csv(&result.organizations)?;
                Ok(serde_json::to_value(CsvEnvelope {
                    export_metadata: result.into(),
                    csv_data,
                })?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::testing::{
        client_for, filing, mount_organization, organization,
    };
    use crate::domains::tools::handlers::{call, result_text};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn body_of(result: &rmcp::model::CallToolResult) -> Value {
        serde_json::from_str(result_text(result).unwrap()).unwrap()
    }

    async fn server_with_two_orgs() -> MockServer {
        let server = MockServer::start().await;
        mount_organization(
            &server,
            "111111111",
            organization("111111111", "First", "CA", "B20"),
            vec![
                filing(2021, 800.0, 700.0, None),
                filing(2022, 1000.0, 900.0, None),
            ],
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/organizations/222222222.json"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_json_export_collects_partial_failures() {
        let server = server_with_two_orgs().await;
        let client = client_for(&server);

        let args = json!({"eins": ["11-1111111", "222222222"], "include_filings": true, "max_filings_per_org": 1});
        let result = call::<ExportTool>(args, &client).await;
        assert_ne!(result.is_error, Some(true));

        let body = body_of(&result);
        assert!(body["export_id"].as_str().unwrap().starts_with("nonprofit_export_"));
        assert_eq!(body["export_format"], "json");
        assert_eq!(body["total_organizations"], 2);
        assert_eq!(body["successful_exports"], 1);
        assert_eq!(body["failed_exports"], 1);

        let row = &body["organizations"][0];
        assert_eq!(row["ein"], "111111111");
        assert_eq!(row["organization_name"], "First");
        assert_eq!(row["latest_filing_year"], 2022);
        assert_eq!(row["latest_total_revenue"], 1000.0);
        assert_eq!(row["recent_filings"].as_array().unwrap().len(), 1);

        assert_eq!(body["errors"][0]["ein"], "222222222");
        assert_eq!(body["errors"][0]["error_type"], "UpstreamRequestFailed");
        assert_eq!(body["metadata"]["max_filings_per_org"], 1);
        assert_eq!(body["metadata"]["api_version"], "v2");
    }

    #[tokio::test]
    async fn test_export_row_embeds_serialized_filings() {
        let server = server_with_two_orgs().await;
        let client = client_for(&server);
        let params: ExportParams = serde_json::from_value(json!({
            "eins": ["111111111"],
            "include_financials": false,
            "include_filings": true,
            "max_filings_per_org": 5
        }))
        .unwrap();

        let ein = Ein::parse("111111111").unwrap();
        let row = export_row(&client, &ein, &params).await.unwrap();
        let filings = row["recent_filings"].as_array().unwrap();
        assert_eq!(filings.len(), 2);
        assert_eq!(filings[0]["tax_year"], 2022);
        assert_eq!(filings[0]["totrevenue"], 1000.0);
        assert_eq!(filings[1]["tax_year"], 2021);
        assert!(row.get("latest_filing_year").is_none());

        let missing = Ein::parse("222222222").unwrap();
        let err = export_row(&client, &missing, &params).await.unwrap_err();
        assert_eq!(err.error_type(), "UpstreamRequestFailed");
    }

    #[tokio::test]
    async fn test_csv_export_orders_columns() {
        let server = server_with_two_orgs().await;
        let client = client_for(&server);

        let args = json!({"eins": ["111111111"], "format": "csv", "include_filings": true});
        let result = call::<ExportTool>(args, &client).await;
        assert_ne!(result.is_error, Some(true));

        let body = body_of(&result);
        assert_eq!(body["export_metadata"]["successful_exports"], 1);
        let csv_data = body["csv_data"].as_str().unwrap();
        let mut lines = csv_data.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with(
            "ein,organization_name,sub_name,street_address,city,state,zipcode,ntee_code,subsection_code,"
        ));
        assert!(header.ends_with("latest_total_revenue,nccs_url,updated"));
        assert!(!header.contains("recent_filings"));
        assert!(lines.next().unwrap().starts_with("111111111,First,,1 Main St,Springfield,CA,12345,B20,3,"));
    }

    #[tokio::test]
    async fn test_request_level_validation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let client = client_for(&server);

        let eleven: Vec<String> = (0..11).map(|i| format!("{:09}", i)).collect();
        let cases = [
            (json!({"eins": []}), "InvalidArguments", "No EINs provided for export"),
            (json!({"eins": eleven}), "InvalidArguments", "Maximum 10 organizations"),
            (json!({"eins": ["111111111"], "format": "xml"}), "InvalidArguments", "Must be 'json' or 'csv'"),
            (json!({"eins": ["111111111", "12"]}), "InvalidIdentifier", "Invalid EIN format"),
        ];
        for (args, error_type, fragment) in cases {
            let result = call::<ExportTool>(args, &client).await;
            assert_eq!(result.is_error, Some(true));
            let body = body_of(&result);
            assert_eq!(body["error_type"], error_type);
            assert!(body["error"].as_str().unwrap().contains(fragment));
        }
    }

    #[test]
    fn test_csv_columns_skip_nested_and_sort_rest() {
        let mut row = Map::new();
        row.insert("zeta".into(), json!(1));
        row.insert("city".into(), json!("X"));
        row.insert("ein".into(), json!("111111111"));
        row.insert("alpha".into(), json!(null));
        row.insert("recent_filings".into(), json!([]));

        assert_eq!(csv_columns(&[row]), vec!["ein", "city", "alpha", "zeta"]);
        assert_eq!(render_csv(&[]).unwrap(), "");
    }
}
