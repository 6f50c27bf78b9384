//! Tracked regions: the 50 US states plus DC.
//!
//! Upstream feeds identify geography three different ways (two-letter codes,
//! full state names inside free text, or "nationwide"), so this module owns
//! both the canonical table and the free-text scope parser.

/// Two-letter code and full name for every tracked region.
pub static REGIONS: [(&str, &str); 51] = [
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
    ("DC", "District of Columbia"),
];

/// Returns the two-letter code for every tracked region.
pub fn all_codes() -> impl Iterator<Item = &'static str> {
    REGIONS.iter().map(|(code, _)| *code)
}

/// Returns `true` if `code` is a tracked two-letter region code.
pub fn is_tracked(code: &str) -> bool {
    REGIONS.iter().any(|(c, _)| c.eq_ignore_ascii_case(code))
}

/// Returns `true` if the lowercased `text` contains `abbr` as a standalone
/// token (bounded by non-alphanumeric characters or the string ends).
fn contains_token(text: &str, abbr: &str) -> bool {
    let mut start = 0;
    while let Some(pos) = text[start..].find(abbr) {
        let at = start + pos;
        let before_ok = at == 0
            || !text[..at]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_alphanumeric());
        let after = at + abbr.len();
        let after_ok = after >= text.len()
            || !text[after..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        start = at + 1;
    }
    false
}

/// Extracts region codes from free-form distribution text such as openFDA's
/// `distribution_pattern` ("Nationwide", "AZ, NM and TX", "New Mexico only").
///
/// "Nationwide"/"national" expands to every tracked region. Matching is
/// case-insensitive; abbreviations must appear as standalone tokens so that
/// e.g. "OR" inside "CORN" does not match, while full names match as
/// substrings.
pub fn parse_region_scope(text: &str) -> Vec<&'static str> {
    let t = text.to_lowercase();
    if t.contains("nationwide") || t.contains("national") {
        return all_codes().collect();
    }
    let mut found = Vec::new();
    for (abbr, name) in REGIONS.iter() {
        if contains_token(&t, &abbr.to_lowercase()) || t.contains(&name.to_lowercase()) {
            found.push(*abbr);
        }
    }
    found
}

/// Splits an explicit state list ("NM, TX | CO") into upper-cased codes.
pub fn split_region_list(text: &str) -> Vec<String> {
    text.split(|c| c == ',' || c == '|')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
