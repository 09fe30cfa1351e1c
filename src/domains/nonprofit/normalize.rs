//! Response normalization.
//!
//! Upstream fragments are loosely shaped: numbers arrive as strings, codes as
//! integers, and fields were renamed between API versions. Each coercion below
//! is independent and fail-soft: a bad value becomes `None` and the rest of the
//! record survives. Only a missing identity (`ein`, `name`) or a fragment that
//! is not a JSON object rejects a record.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use tracing::debug;

use super::ein::Ein;
use super::error::{ApiError, ApiResult};
use super::models::{Filing, FormType, Organization, SearchResult};

const DEFAULT_PER_PAGE: u64 = 25;

// ============================================================================
// Field coercions
// ============================================================================

/// Coerce a numeric-like value (number or numeric string) to `f64`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Coerce a year-like value (integer, integral float or digit string) to `i32`.
pub fn coerce_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce a scalar to text. Numbers become their decimal representation.
pub fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerce a boolean flag; upstream sometimes sends `0`/`1`.
pub fn coerce_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    }
}

/// Parse an upstream timestamp.
///
/// A trailing `Z` is read as `+00:00`; timestamps without an offset are taken
/// as UTC. Anything unparseable yields `None`.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<FixedOffset>> {
    let raw = value.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }

    let with_offset = match raw.strip_suffix('Z') {
        Some(stem) => format!("{stem}+00:00"),
        None => raw.to_string(),
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(&with_offset) {
        return Some(ts);
    }

    let utc = FixedOffset::east_opt(0)?;
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return naive.and_local_timezone(utc).single();
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|naive| naive.and_local_timezone(utc).single())
}

/// Derive the tax year.
///
/// Priority: explicit year (`tax_prd_yr`, or an already-normalized `tax_year`),
/// then the first four characters of a `YYYYMM` period (`tax_prd`).
pub fn derive_tax_year(raw: &Map<String, Value>) -> Option<i32> {
    for key in ["tax_prd_yr", "tax_year"] {
        if let Some(value) = raw.get(key).filter(|v| !v.is_null()) {
            return coerce_year(value);
        }
    }

    let period = raw.get("tax_prd").and_then(coerce_text)?;
    period.get(..4)?.parse().ok()
}

/// Translate a form-type value: integer codes through the fixed table,
/// names such as `990EZ` as-is. Unrecognized values fall back to `990`.
pub fn coerce_form_type(value: &Value) -> Option<FormType> {
    match value {
        Value::Null => None,
        Value::Number(n) => Some(n.as_i64().map_or(FormType::Form990, FormType::from_code)),
        Value::String(s) => Some(match s.trim().parse::<i64>() {
            Ok(code) => FormType::from_code(code),
            Err(_) => FormType::from_name(s).unwrap_or(FormType::Form990),
        }),
        _ => Some(FormType::Form990),
    }
}

fn text_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
    raw.get(key).and_then(coerce_text)
}

/// First present value among legacy and current field names.
fn first_of<'a>(raw: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| !value.is_null())
}

fn count_field(raw: &Map<String, Value>, keys: &[&str], default: u64) -> u64 {
    first_of(raw, keys)
        .and_then(coerce_number)
        .filter(|n| *n >= 0.0)
        .map_or(default, |n| n as u64)
}

// ============================================================================
// Record normalizers
// ============================================================================

/// Normalize one organization fragment.
pub fn normalize_organization(raw: &Value) -> ApiResult<Organization> {
    let raw = raw.as_object().ok_or_else(|| {
        ApiError::InvalidOrganizationData("organization record is not an object".into())
    })?;

    let ein_value = raw
        .get("ein")
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::InvalidOrganizationData("missing field 'ein'".into()))?;
    let ein = Ein::from_upstream(ein_value).ok_or_else(|| {
        ApiError::InvalidOrganizationData(format!("EIN {ein_value} does not reduce to 9 digits"))
    })?;

    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::InvalidOrganizationData(format!("missing field 'name' ({ein})")))?
        .to_string();

    Ok(Organization {
        ein,
        strein: text_field(raw, "strein"),
        name,
        secondary_name: text_field(raw, "sub_name"),
        address: text_field(raw, "address"),
        city: text_field(raw, "city"),
        state: text_field(raw, "state"),
        zip_code: text_field(raw, "zipcode"),
        subsection_code: text_field(raw, "subseccd"),
        ntee_code: text_field(raw, "ntee_code"),
        guidestar_url: text_field(raw, "guidestar_url"),
        nccs_url: text_field(raw, "nccs_url"),
        have_pdfs: raw.get("have_pdfs").and_then(coerce_flag),
        revenue_amount: first_of(raw, &["revenue_amount", "income_amount", "income_amt"])
            .and_then(coerce_number),
        last_updated: raw.get("updated").and_then(parse_timestamp),
    })
}

/// Normalize one filing fragment. The caller injects `ein` beforehand.
pub fn normalize_filing(raw: &Value) -> ApiResult<Filing> {
    let raw = raw
        .as_object()
        .ok_or_else(|| ApiError::InvalidFilingData("filing record is not an object".into()))?;

    let ein = raw
        .get("ein")
        .and_then(Ein::from_upstream)
        .ok_or_else(|| ApiError::InvalidFilingData("missing or malformed 'ein'".into()))?;

    let money = |key: &str| raw.get(key).and_then(coerce_number);

    Ok(Filing {
        ein,
        tax_year: derive_tax_year(raw),
        form_type: first_of(raw, &["formtype", "form_type"]).and_then(coerce_form_type),
        pdf_url: text_field(raw, "pdf_url").filter(|url| !url.trim().is_empty()),
        total_revenue: money("totrevenue"),
        total_functional_expenses: money("totfuncexpns"),
        total_assets_end: money("totassetsend"),
        total_liabilities_end: money("totliabend"),
        filing_date: raw.get("filing_date").and_then(parse_timestamp),
    })
}

/// Assemble a search page. Organizations that fail normalization are dropped;
/// `total_results` keeps the upstream-reported total.
///
/// `limit` caps the page size; without it the upstream `per_page` is used.
pub fn normalize_search_page(raw: &Value, limit: Option<u64>) -> SearchResult {
    let empty = Map::new();
    let page = raw.as_object().unwrap_or(&empty);

    let per_page = limit
        .filter(|l| *l > 0)
        .unwrap_or_else(|| count_field(page, &["per_page"], DEFAULT_PER_PAGE));

    let organizations: Vec<Organization> = page
        .get("organizations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match normalize_organization(item) {
                    Ok(org) => Some(org),
                    Err(e) => {
                        debug!("Skipping search result: {}", e);
                        None
                    }
                })
                .take(per_page as usize)
                .collect()
        })
        .unwrap_or_default();

    SearchResult {
        total_results: count_field(page, &["total_results"], 0),
        num_pages: count_field(page, &["num_pages"], 0),
        current_page: count_field(page, &["cur_page", "page"], 0),
        per_page,
        page_offset: count_field(page, &["page_offset"], 0),
        search_query: text_field(page, "search_query"),
        selected_state: text_field(page, "selected_state"),
        selected_ntee: text_field(page, "selected_ntee"),
        selected_c_code: text_field(page, "selected_c_code"),
        organizations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_number_accepts_numbers_and_numeric_strings() {
        assert_eq!(coerce_number(&json!(1_000_000)), Some(1_000_000.0));
        assert_eq!(coerce_number(&json!(12.5)), Some(12.5));
        assert_eq!(coerce_number(&json!("950000.0")), Some(950_000.0));
        assert_eq!(coerce_number(&json!(" -42 ")), Some(-42.0));
        assert_eq!(coerce_number(&json!("1,250")), Some(1250.0));
    }

    #[test]
    fn test_coerce_number_yields_none_for_non_numeric() {
        assert_eq!(coerce_number(&json!("n/a")), None);
        assert_eq!(coerce_number(&json!("")), None);
        assert_eq!(coerce_number(&json!(null)), None);
        assert_eq!(coerce_number(&json!(true)), None);
        assert_eq!(coerce_number(&json!([1])), None);
        assert_eq!(coerce_number(&json!("NaN")), None);
    }

    #[test]
    fn test_tax_year_priority() {
        let explicit = json!({"tax_prd_yr": 2019, "tax_prd": 202212});
        assert_eq!(derive_tax_year(explicit.as_object().unwrap()), Some(2019));

        let period = json!({"tax_prd": 202212});
        assert_eq!(derive_tax_year(period.as_object().unwrap()), Some(2022));

        let period_text = json!({"tax_prd": "202106"});
        assert_eq!(derive_tax_year(period_text.as_object().unwrap()), Some(2021));

        let neither = json!({"totrevenue": 5});
        assert_eq!(derive_tax_year(neither.as_object().unwrap()), None);

        let short = json!({"tax_prd": "20"});
        assert_eq!(derive_tax_year(short.as_object().unwrap()), None);
    }

    #[test]
    fn test_form_type_translation() {
        assert_eq!(coerce_form_type(&json!(0)), Some(FormType::Form990));
        assert_eq!(coerce_form_type(&json!(1)), Some(FormType::Form990EZ));
        assert_eq!(coerce_form_type(&json!(2)), Some(FormType::Form990PF));
        assert_eq!(coerce_form_type(&json!(3)), Some(FormType::Form990T));
        assert_eq!(coerce_form_type(&json!(9)), Some(FormType::Form990));
        assert_eq!(coerce_form_type(&json!("990EZ")), Some(FormType::Form990EZ));
        assert_eq!(coerce_form_type(&json!("2")), Some(FormType::Form990PF));
        assert_eq!(coerce_form_type(&json!(null)), None);
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let z = parse_timestamp(&json!("2023-04-12T19:13:21.000Z")).unwrap();
        assert_eq!(z.offset().local_minus_utc(), 0);
        assert_eq!(z.to_rfc3339(), "2023-04-12T19:13:21+00:00");

        let naive = parse_timestamp(&json!("2023-04-12T19:13:21")).unwrap();
        assert_eq!(naive, z);

        assert!(parse_timestamp(&json!("2023-04-12")).is_some());
        assert!(parse_timestamp(&json!("yesterday")).is_none());
        assert!(parse_timestamp(&json!(12345)).is_none());
        assert!(parse_timestamp(&json!("")).is_none());
    }

    #[test]
    fn test_normalize_organization_pads_and_coerces() {
        let raw = json!({
            "ein": 42123456,
            "name": "Test Nonprofit",
            "city": "Test City",
            "state": "CA",
            "subseccd": 3,
            "ntee_code": "A01",
            "income_amt": "1000000",
            "updated": "2023-04-12T19:13:21Z"
        });
        let org = normalize_organization(&raw).unwrap();
        assert_eq!(org.ein.as_str(), "042123456");
        assert_eq!(org.subsection_code.as_deref(), Some("3"));
        assert_eq!(org.revenue_amount, Some(1_000_000.0));
        assert!(org.last_updated.is_some());
        assert_eq!(org.secondary_name, None);
    }

    #[test]
    fn test_normalize_organization_keeps_record_with_bad_timestamp() {
        let raw = json!({"ein": "123456789", "name": "X", "updated": "not a date"});
        let org = normalize_organization(&raw).unwrap();
        assert_eq!(org.last_updated, None);
    }

    #[test]
    fn test_normalize_organization_rejects_missing_identity() {
        assert!(matches!(
            normalize_organization(&json!({"ein": "123456789"})),
            Err(ApiError::InvalidOrganizationData(_))
        ));
        assert!(normalize_organization(&json!({"name": "No EIN"})).is_err());
        assert!(normalize_organization(&json!({"ein": "1234567890", "name": "X"})).is_err());
        assert!(normalize_organization(&json!("just a string")).is_err());
    }

    #[test]
    fn test_normalize_filing_is_fail_soft_per_field() {
        let raw = json!({
            "ein": "123456789",
            "tax_prd": 202212,
            "formtype": 1,
            "pdf_url": "https://example.com/filing.pdf",
            "totrevenue": "1000000",
            "totfuncexpns": "lots",
            "totassetsend": 600000,
            "totliabend": null
        });
        let filing = normalize_filing(&raw).unwrap();
        assert_eq!(filing.tax_year, Some(2022));
        assert_eq!(filing.form_type, Some(FormType::Form990EZ));
        assert_eq!(filing.total_revenue, Some(1_000_000.0));
        assert_eq!(filing.total_functional_expenses, None);
        assert_eq!(filing.total_assets_end, Some(600_000.0));
        assert_eq!(filing.total_liabilities_end, None);
        assert!(filing.has_pdf());
    }

    #[test]
    fn test_normalize_filing_accepts_bare_record() {
        let filing = normalize_filing(&json!({"ein": "123456789"})).unwrap();
        assert_eq!(filing.tax_year, None);
        assert_eq!(filing.form_type, None);
        assert_eq!(filing.pdf_url, None);
        assert_eq!(filing.net_assets(), None);
    }

    #[test]
    fn test_normalize_filing_structural_failure() {
        assert!(matches!(
            normalize_filing(&json!([1, 2, 3])),
            Err(ApiError::InvalidFilingData(_))
        ));
        assert!(normalize_filing(&json!({"tax_prd": 202212})).is_err());
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let org = normalize_organization(&json!({
            "ein": "131837418",
            "name": "American Red Cross",
            "state": "DC",
            "subseccd": "3",
            "updated": "2024-01-02T03:04:05Z"
        }))
        .unwrap();
        let again = normalize_organization(&serde_json::to_value(&org).unwrap()).unwrap();
        assert_eq!(org, again);

        let filing = normalize_filing(&json!({
            "ein": "131837418",
            "tax_prd_yr": 2021,
            "formtype": 2,
            "totrevenue": 10.5
        }))
        .unwrap();
        let again = normalize_filing(&serde_json::to_value(&filing).unwrap()).unwrap();
        assert_eq!(filing, again);
    }

    #[test]
    fn test_search_page_drops_invalid_organizations() {
        let raw = json!({
            "organizations": [
                {"ein": "123456789", "name": "Valid"},
                {"ein": "987654321"}
            ],
            "total_results": 50,
            "num_pages": 2,
            "cur_page": 0,
            "per_page": 25
        });
        let page = normalize_search_page(&raw, None);
        assert_eq!(page.organizations.len(), 1);
        assert_eq!(page.total_results, 50);
        assert_eq!(page.per_page, 25);
        assert_eq!(page.organizations[0].name, "Valid");
    }

    #[test]
    fn test_search_page_respects_limit_and_legacy_page_field() {
        let orgs: Vec<_> = (0..5)
            .map(|i| json!({"ein": 123456000 + i, "name": format!("Org {i}")}))
            .collect();
        let raw = json!({"organizations": orgs, "total_results": 5, "page": 3});
        let page = normalize_search_page(&raw, Some(2));
        assert_eq!(page.organizations.len(), 2);
        assert_eq!(page.per_page, 2);
        assert_eq!(page.current_page, 3);
        assert!(page.organizations.len() as u64 <= page.per_page);
    }
}
