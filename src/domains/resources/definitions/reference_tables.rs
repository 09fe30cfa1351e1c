//! Static reference tables used by the search filters.

use serde_json::json;

use super::ResourceDefinition;
use crate::domains::nonprofit::reference::{NTEE_CATEGORIES, SUBSECTION_CODES, US_STATES};
use crate::domains::resources::service::ResourceContent;

/// NTEE major categories accepted by `search_nonprofits`.
pub struct NteeCategoriesResource;

impl ResourceDefinition for NteeCategoriesResource {
    const URI: &'static str = "nonprofit://reference/ntee-categories";
    const NAME: &'static str = "NTEE Categories";
    const DESCRIPTION: &'static str =
        "NTEE major category numbers (1-10) accepted by the ntee_code search filter";

    fn content() -> ResourceContent {
        let categories: Vec<_> = NTEE_CATEGORIES
            .iter()
            .map(|(id, name)| json!({ "id": id, "name": name }))
            .collect();
        ResourceContent::Json(json!({ "ntee_categories": categories }))
    }
}

pub struct SubsectionCodesResource;

impl ResourceDefinition for SubsectionCodesResource {
    const URI: &'static str = "nonprofit://reference/subsection-codes";
    const NAME: &'static str = "501(c) Subsection Codes";
    const DESCRIPTION: &'static str =
        "IRS subsection codes accepted by the subsection_code search filter";

    fn content() -> ResourceContent {
        let codes: Vec<_> = SUBSECTION_CODES
            .iter()
            .map(|(code, label)| json!({ "code": code, "label": label }))
            .collect();
        ResourceContent::Json(json!({ "subsection_codes": codes }))
    }
}

pub struct UsStatesResource;

impl ResourceDefinition for UsStatesResource {
    const URI: &'static str = "nonprofit://reference/us-states";
    const NAME: &'static str = "State Codes";
    const DESCRIPTION: &'static str =
        "Two-letter state codes accepted by the state search filter (ZZ for foreign addresses)";

    fn content() -> ResourceContent {
        let mut states = US_STATES.to_vec();
        states.sort_unstable();
        ResourceContent::Json(json!({ "states": states }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_of(content: ResourceContent) -> serde_json::Value {
        match content {
            ResourceContent::Json(value) => value,
            other => panic!("expected static JSON, got {other:?}"),
        }
    }

    #[test]
    fn test_ntee_table_is_complete() {
        let value = json_of(NteeCategoriesResource::content());
        let categories = value["ntee_categories"].as_array().unwrap();
        assert_eq!(categories.len(), 10);
        assert_eq!(categories[1]["id"], 2);
        assert_eq!(categories[1]["name"], "Education");
    }

    #[test]
    fn test_subsection_and_states_tables() {
        let codes = json_of(SubsectionCodesResource::content());
        assert!(
            codes["subsection_codes"]
                .as_array()
                .unwrap()
                .iter()
                .any(|c| c["code"] == 3 && c["label"] == "501(c)(3)")
        );

        let states = json_of(UsStatesResource::content());
        let states = states["states"].as_array().unwrap();
        assert_eq!(states.len(), US_STATES.len());
        assert_eq!(states[0], "AK");
    }
}
