//! Canonical entity shapes produced by the normalizer.
//!
//! Field names on the wire follow the upstream vocabulary (`sub_name`,
//! `zipcode`, `subseccd`, `totrevenue`, ...) so that a serialized record can be
//! fed back through the normalizer unchanged.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::ein::Ein;

/// Form 990 variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FormType {
    #[serde(rename = "990")]
    Form990,
    #[serde(rename = "990EZ")]
    Form990EZ,
    #[serde(rename = "990PF")]
    Form990PF,
    #[serde(rename = "990T")]
    Form990T,
}

impl FormType {
    /// Translate the upstream integer code. Unknown codes map to `990`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Form990EZ,
            2 => Self::Form990PF,
            3 => Self::Form990T,
            _ => Self::Form990,
        }
    }

    /// Parse a textual form name such as `990EZ` or `990-PF`.
    pub fn from_name(name: &str) -> Option<Self> {
        let compact: String = name
            .trim()
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();

        match compact.as_str() {
            "990" => Some(Self::Form990),
            "990EZ" => Some(Self::Form990EZ),
            "990PF" => Some(Self::Form990PF),
            "990T" => Some(Self::Form990T),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Form990 => "990",
            Self::Form990EZ => "990EZ",
            Self::Form990PF => "990PF",
            Self::Form990T => "990T",
        }
    }
}

/// Identity record for a nonprofit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Organization {
    pub ein: Ein,
    /// Upstream pre-formatted EIN (`XX-XXXXXXX`).
    pub strein: Option<String>,
    pub name: String,
    #[serde(rename = "sub_name")]
    pub secondary_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "zipcode")]
    pub zip_code: Option<String>,
    #[serde(rename = "subseccd")]
    pub subsection_code: Option<String>,
    pub ntee_code: Option<String>,
    pub guidestar_url: Option<String>,
    pub nccs_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub have_pdfs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_amount: Option<f64>,
    #[serde(rename = "updated")]
    pub last_updated: Option<DateTime<FixedOffset>>,
}

impl Organization {
    pub fn formatted_ein(&self) -> String {
        self.strein
            .clone()
            .unwrap_or_else(|| self.ein.formatted())
    }

    pub fn full_address(&self) -> String {
        [&self.address, &self.city, &self.state, &self.zip_code]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One Form 990 submission for one organization-year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filing {
    pub ein: Ein,
    pub tax_year: Option<i32>,
    pub form_type: Option<FormType>,
    pub pdf_url: Option<String>,
    #[serde(rename = "totrevenue")]
    pub total_revenue: Option<f64>,
    #[serde(rename = "totfuncexpns")]
    pub total_functional_expenses: Option<f64>,
    #[serde(rename = "totassetsend")]
    pub total_assets_end: Option<f64>,
    #[serde(rename = "totliabend")]
    pub total_liabilities_end: Option<f64>,
    pub filing_date: Option<DateTime<FixedOffset>>,
}

impl Filing {
    /// Assets minus liabilities, when both are known.
    pub fn net_assets(&self) -> Option<f64> {
        match (self.total_assets_end, self.total_liabilities_end) {
            (Some(assets), Some(liabilities)) => Some(assets - liabilities),
            _ => None,
        }
    }

    /// Expenses over revenue, when both are known and revenue is positive.
    pub fn expense_ratio(&self) -> Option<f64> {
        match (self.total_functional_expenses, self.total_revenue) {
            (Some(expenses), Some(revenue)) if revenue > 0.0 => Some(expenses / revenue),
            _ => None,
        }
    }

    pub fn has_pdf(&self) -> bool {
        self.pdf_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

/// Sort filings by tax year, most recent first. Filings without a year sort last.
pub fn sort_most_recent_first(filings: &mut [Filing]) {
    filings.sort_by(|a, b| b.tax_year.cmp(&a.tax_year));
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub total_results: u64,
    pub num_pages: u64,
    #[serde(rename = "cur_page")]
    pub current_page: u64,
    pub per_page: u64,
    pub page_offset: u64,
    pub search_query: Option<String>,
    pub selected_state: Option<String>,
    pub selected_ntee: Option<String>,
    pub selected_c_code: Option<String>,
    pub organizations: Vec<Organization>,
}

/// The most recent filing that carries a PDF, paired with its organization name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfFiling {
    pub organization_name: String,
    pub tax_year: Option<i32>,
    pub form_type: Option<FormType>,
    pub pdf_url: String,
    pub filing_date: Option<DateTime<FixedOffset>>,
}

/// A search hit confirmed to have at least one PDF filing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfOrganization {
    pub ein: Ein,
    pub name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub ntee_code: Option<String>,
    pub most_recent_pdf: PdfFiling,
}

/// Financial snapshot taken from a single filing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialSnapshot {
    pub most_recent_year: Option<i32>,
    pub total_revenue: Option<f64>,
    pub total_expenses: Option<f64>,
    pub total_assets: Option<f64>,
    pub net_assets: Option<f64>,
    pub expense_ratio: Option<f64>,
}

impl From<&Filing> for FinancialSnapshot {
    fn from(filing: &Filing) -> Self {
        Self {
            most_recent_year: filing.tax_year,
            total_revenue: filing.total_revenue,
            total_expenses: filing.total_functional_expenses,
            total_assets: filing.total_assets_end,
            net_assets: filing.net_assets(),
            expense_ratio: filing.expense_ratio(),
        }
    }
}

/// Organization profile plus a filing overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationSummary {
    pub organization: Organization,
    pub filing_years: Vec<i32>,
    pub total_filings: usize,
    pub financial_summary: Option<FinancialSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filing(year: Option<i32>) -> Filing {
        Filing {
            ein: Ein::parse("123456789").unwrap(),
            tax_year: year,
            form_type: Some(FormType::Form990),
            pdf_url: None,
            total_revenue: None,
            total_functional_expenses: None,
            total_assets_end: None,
            total_liabilities_end: None,
            filing_date: None,
        }
    }

    #[test]
    fn test_form_type_codes() {
        assert_eq!(FormType::from_code(0), FormType::Form990);
        assert_eq!(FormType::from_code(1), FormType::Form990EZ);
        assert_eq!(FormType::from_code(2), FormType::Form990PF);
        assert_eq!(FormType::from_code(3), FormType::Form990T);
        assert_eq!(FormType::from_code(7), FormType::Form990);
        assert_eq!(FormType::from_code(-1), FormType::Form990);
    }

    #[test]
    fn test_form_type_names() {
        assert_eq!(FormType::from_name("990-EZ"), Some(FormType::Form990EZ));
        assert_eq!(FormType::from_name("990pf"), Some(FormType::Form990PF));
        assert_eq!(FormType::from_name("1040"), None);
        assert_eq!(
            serde_json::to_value(FormType::Form990T).unwrap(),
            serde_json::json!("990T")
        );
    }

    #[test]
    fn test_derived_financials() {
        let mut f = filing(Some(2022));
        assert_eq!(f.net_assets(), None);
        assert_eq!(f.expense_ratio(), None);

        f.total_assets_end = Some(600_000.0);
        f.total_liabilities_end = Some(100_000.0);
        f.total_revenue = Some(1_000_000.0);
        f.total_functional_expenses = Some(800_000.0);
        assert_eq!(f.net_assets(), Some(500_000.0));
        assert_eq!(f.expense_ratio(), Some(0.8));

        f.total_revenue = Some(0.0);
        assert_eq!(f.expense_ratio(), None);
    }

    #[test]
    fn test_sort_most_recent_first_puts_missing_years_last() {
        let mut filings = vec![filing(Some(2020)), filing(None), filing(Some(2023))];
        sort_most_recent_first(&mut filings);
        let years: Vec<_> = filings.iter().map(|f| f.tax_year).collect();
        assert_eq!(years, vec![Some(2023), Some(2020), None]);
    }

    #[test]
    fn test_has_pdf_requires_non_empty_url() {
        let mut f = filing(Some(2022));
        assert!(!f.has_pdf());
        f.pdf_url = Some(String::new());
        assert!(!f.has_pdf());
        f.pdf_url = Some("https://example.com/f.pdf".into());
        assert!(f.has_pdf());
    }

    #[test]
    fn test_full_address_skips_missing_parts() {
        let org = Organization {
            ein: Ein::parse("123456789").unwrap(),
            strein: None,
            name: "Test".into(),
            secondary_name: None,
            address: Some("123 Main St".into()),
            city: Some("Springfield".into()),
            state: None,
            zip_code: Some("12345".into()),
            subsection_code: None,
            ntee_code: None,
            guidestar_url: None,
            nccs_url: None,
            have_pdfs: None,
            revenue_amount: None,
            last_updated: None,
        };
        assert_eq!(org.full_address(), "123 Main St, Springfield, 12345");
        assert_eq!(org.formatted_ein(), "12-3456789");
    }
}
