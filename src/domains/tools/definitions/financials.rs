//! Multi-year financial analysis tool.
//!
//! Filings are ordered most recent first and the newest `years` are kept.
//! Year-over-year changes compare the two most recent rows; the trend label
//! is `increasing` above +5%, `decreasing` below -5%, `stable` otherwise.

use chrono::{DateTime, FixedOffset};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::common::{clamp_count, classify_trend, mean_non_zero, percent_change, round2};
use crate::domains::nonprofit::{Ein, Filing, NonprofitClient, models::sort_most_recent_first};
use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::NonprofitTool;

const MAX_YEARS: usize = 10;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AnalyzeFinancialsParams {
    /// Employer Identification Number, 9 digits with or without hyphen.
    pub ein: String,

    /// Number of recent years to analyze, at most 10.
    #[serde(default = "default_years")]
    pub years: usize,
}

fn default_years() -> usize {
    3
}

/// One analyzed year.
#[derive(Debug, Clone, Serialize)]
struct YearRow {
    tax_year: Option<i32>,
    total_revenue: Option<f64>,
    total_expenses: Option<f64>,
    net_assets: Option<f64>,
    filing_date: Option<DateTime<FixedOffset>>,
}

impl YearRow {
    /// Rows exist only for filings that report revenue or expenses.
    fn from_filing(filing: &Filing) -> Option<Self> {
        if filing.total_revenue.is_none() && filing.total_functional_expenses.is_none() {
            return None;
        }
        Some(Self {
            tax_year: filing.tax_year,
            total_revenue: filing.total_revenue,
            total_expenses: filing.total_functional_expenses,
            net_assets: filing.net_assets(),
            filing_date: filing.filing_date,
        })
    }
}

#[derive(Debug, Default, Serialize)]
struct Trends {
    #[serde(skip_serializing_if = "Option::is_none")]
    revenue_change_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expense_change_percent: Option<f64>,
}

#[derive(Debug, Default, Serialize)]
struct Ratios {
    #[serde(skip_serializing_if = "Option::is_none")]
    expense_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    surplus_deficit: Option<f64>,
}

#[derive(Debug, Serialize)]
struct FinancialSummary {
    ein: Ein,
    organization_name: String,
    year_range_start: Option<i32>,
    year_range_end: Option<i32>,
    filings_analyzed: usize,
    avg_revenue: Option<f64>,
    revenue_trend: &'static str,
    avg_expenses: Option<f64>,
    /// Latest expense ratio as a fraction.
    avg_expense_ratio: Option<f64>,
    expense_trend: &'static str,
    avg_net_assets: Option<f64>,
}

#[derive(Debug, Serialize)]
struct AnalysisResponse {
    financial_summary: FinancialSummary,
    detailed_data: Vec<YearRow>,
    trends: Trends,
    ratios: Ratios,
    analysis_notes: Vec<String>,
}

fn year_over_year(rows: &[YearRow]) -> Trends {
    let [latest, previous, ..] = rows else {
        return Trends::default();
    };
    Trends {
        revenue_change_percent: percent_change(latest.total_revenue, previous.total_revenue),
        expense_change_percent: percent_change(latest.total_expenses, previous.total_expenses),
    }
}

fn latest_ratios(latest: &YearRow) -> Ratios {
    match (latest.total_revenue, latest.total_expenses) {
        (Some(revenue), Some(expenses)) if revenue != 0.0 && expenses != 0.0 => Ratios {
            expense_ratio: Some(round2(expenses / revenue * 100.0)),
            surplus_deficit: Some(revenue - expenses),
        },
        _ => Ratios::default(),
    }
}

pub struct AnalyzeFinancialsTool;

#[async_trait::async_trait]
impl NonprofitTool for AnalyzeFinancialsTool {
    const NAME: &'static str = "analyze_nonprofit_financials";
    const DESCRIPTION: &'static str = "Analyze financial trends for a nonprofit over its most recent filings (default 3 years, max 10): year-over-year revenue and expense change, expense ratio, surplus or deficit and multi-year averages.";
    const FAILURE_CONTEXT: &'static str = "Financial analysis failed";
    type Params = AnalyzeFinancialsParams;

    #[instrument(skip_all, fields(ein = %params.ein, years = params.years))]
    async fn run(params: Self::Params, client: &NonprofitClient) -> Result<Value, ToolError> {
        let ein = Ein::parse(&params.ein)?;
        let years = clamp_count(params.years, MAX_YEARS);

        let (organization, mut filings) = tokio::try_join!(
            client.get_organization(ein.as_str()),
            client.get_filings(ein.as_str(), None)
        )?;
        sort_most_recent_first(&mut filings);
        filings.truncate(years);

        let rows: Vec<YearRow> = filings.iter().filter_map(YearRow::from_filing).collect();
        let (Some(latest), Some(earliest)) = (rows.first(), rows.last()) else {
            return Err(ToolError::no_data("No financial data available for analysis"));
        };
        debug!("Analyzing {} of {} filings", rows.len(), filings.len());

        let trends = year_over_year(&rows);
        let ratios = latest_ratios(latest);

        let summary = FinancialSummary {
            ein,
            organization_name: organization.name,
            year_range_start: earliest.tax_year,
            year_range_end: latest.tax_year,
            filings_analyzed: rows.len(),
            avg_revenue: mean_non_zero(rows.iter().map(|r| r.total_revenue)),
            revenue_trend: classify_trend(trends.revenue_change_percent),
            avg_expenses: mean_non_zero(rows.iter().map(|r| r.total_expenses)),
            avg_expense_ratio: ratios.expense_ratio.map(|ratio| ratio / 100.0),
            expense_trend: classify_trend(trends.expense_change_percent),
            avg_net_assets: mean_non_zero(rows.iter().map(|r| r.net_assets)),
        };

        let analysis_notes = vec![
            format!("Analysis covers {} years of financial data", rows.len()),
            "Revenue and expense trends calculated year-over-year".to_string(),
            "Expense ratio shows total expenses as % of total revenue".to_string(),
            "All amounts in USD".to_string(),
        ];

        Ok(serde_json::to_value(AnalysisResponse {
            financial_summary: summary,
            detailed_data: rows,
            trends,
            ratios,
            analysis_notes,
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::testing::{
        client_for, filing, mount_organization, organization,
    };
    use crate::domains::tools::handlers::{call, result_text};
    use serde_json::json;
    use wiremock::MockServer;

    async fn analyze(filings: Vec<Value>, args: Value) -> (Option<bool>, Value) {
        let server = MockServer::start().await;
        mount_organization(
            &server,
            "123456789",
            organization("123456789", "Helpers", "OR", "P20"),
            filings,
        )
        .await;
        let client = client_for(&server);

        let result = call::<AnalyzeFinancialsTool>(args, &client).await;
        let body = serde_json::from_str(result_text(&result).unwrap()).unwrap();
        (result.is_error, body)
    }

    #[tokio::test]
    async fn test_trends_use_the_two_most_recent_years() {
        let (is_error, body) = analyze(
            vec![
                filing(2020, 500.0, 500.0, None),
                filing(2022, 1100.0, 950.0, None),
                filing(2021, 1000.0, 1000.0, None),
            ],
            json!({"ein": "123456789"}),
        )
        .await;
        assert_ne!(is_error, Some(true));

        assert_eq!(body["trends"]["revenue_change_percent"], 10.0);
        assert_eq!(body["trends"]["expense_change_percent"], -5.0);
        assert_eq!(body["ratios"]["expense_ratio"], 86.36);
        assert_eq!(body["ratios"]["surplus_deficit"], 150.0);

        let summary = &body["financial_summary"];
        assert_eq!(summary["organization_name"], "Helpers");
        assert_eq!(summary["year_range_start"], 2020);
        assert_eq!(summary["year_range_end"], 2022);
        assert_eq!(summary["filings_analyzed"], 3);
        assert_eq!(summary["revenue_trend"], "increasing");
        assert_eq!(summary["expense_trend"], "stable");
        let ratio = summary["avg_expense_ratio"].as_f64().unwrap();
        assert!((ratio - 0.8636).abs() < 1e-9);
        assert_eq!(body["detailed_data"][0]["tax_year"], 2022);
        assert_eq!(body["analysis_notes"][0], "Analysis covers 3 years of financial data");
    }

    #[tokio::test]
    async fn test_years_limits_rows_and_single_row_is_stable() {
        let (_, body) = analyze(
            vec![filing(2022, 1000.0, 900.0, None), filing(2021, 100.0, 90.0, None)],
            json!({"ein": "123456789", "years": 1}),
        )
        .await;

        assert_eq!(body["financial_summary"]["filings_analyzed"], 1);
        assert_eq!(body["financial_summary"]["revenue_trend"], "stable");
        assert_eq!(body["financial_summary"]["avg_revenue"], 1000.0);
        assert!(body["trends"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_filings_is_no_data() {
        let (is_error, body) = analyze(vec![], json!({"ein": "123456789"})).await;
        assert_eq!(is_error, Some(true));
        assert_eq!(body["error_type"], "NoData");
        assert_eq!(
            body["error"],
            "Financial analysis failed: No financial data available for analysis"
        );
    }

    #[test]
    fn test_rows_skip_filings_without_figures() {
        let ein = Ein::parse("123456789").unwrap();
        let filing = Filing {
            ein,
            tax_year: Some(2020),
            form_type: None,
            pdf_url: None,
            total_revenue: None,
            total_functional_expenses: None,
            total_assets_end: Some(10.0),
            total_liabilities_end: None,
            filing_date: None,
        };
        assert!(YearRow::from_filing(&filing).is_none());
    }
}
