//! Fixed reference tables used to validate search filters.

/// Two-letter codes accepted by the `state[id]` filter. `ZZ` covers
/// organizations outside the United States.
pub const US_STATES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "DC", "ZZ",
];

/// Broad NTEE categories accepted by the `ntee[id]` filter.
pub const NTEE_CATEGORIES: &[(u8, &str)] = &[
    (1, "Arts, Culture & Humanities"),
    (2, "Education"),
    (3, "Environment and Animals"),
    (4, "Health"),
    (5, "Human Services"),
    (6, "International, Foreign Affairs"),
    (7, "Public, Societal Benefit"),
    (8, "Religion Related"),
    (9, "Mutual/Membership Benefit"),
    (10, "Unknown, Unclassified"),
];

/// 501(c) subsection codes accepted by the `c_code[id]` filter.
pub const SUBSECTION_CODES: &[(u16, &str)] = &[
    (2, "501(c)(2)"),
    (3, "501(c)(3)"),
    (4, "501(c)(4)"),
    (5, "501(c)(5)"),
    (6, "501(c)(6)"),
    (7, "501(c)(7)"),
    (8, "501(c)(8)"),
    (9, "501(c)(9)"),
    (10, "501(c)(10)"),
    (11, "501(c)(11)"),
    (12, "501(c)(12)"),
    (13, "501(c)(13)"),
    (14, "501(c)(14)"),
    (15, "501(c)(15)"),
    (16, "501(c)(16)"),
    (17, "501(c)(17)"),
    (18, "501(c)(18)"),
    (19, "501(c)(19)"),
    (21, "501(c)(21)"),
    (22, "501(c)(22)"),
    (23, "501(c)(23)"),
    (25, "501(c)(25)"),
    (26, "501(c)(26)"),
    (27, "501(c)(27)"),
    (28, "501(c)(28)"),
    (92, "4947(a)(1)"),
];

pub fn is_valid_state(code: &str) -> bool {
    US_STATES.contains(&code)
}

pub fn ntee_category_name(id: u8) -> Option<&'static str> {
    NTEE_CATEGORIES
        .iter()
        .find(|(k, _)| *k == id)
        .map(|(_, name)| *name)
}

pub fn subsection_label(code: u16) -> Option<&'static str> {
    SUBSECTION_CODES
        .iter()
        .find(|(k, _)| *k == code)
        .map(|(_, label)| *label)
}

/// Category number derived from the first letter of an NTEE code by its
/// position in the alphabet (`A` -> 1, `B` -> 2, ...).
///
/// This is a positional heuristic: letters past `J` yield numbers outside the
/// 1-10 category table and are rejected later by filter validation.
pub fn ntee_category_from_code(ntee_code: &str) -> Option<u8> {
    let letter = ntee_code.trim().chars().next()?.to_ascii_uppercase();
    if letter.is_ascii_uppercase() {
        Some(letter as u8 - b'A' + 1)
    } else {
        None
    }
}
