//! Field resolution for rows of unknown shape.
//!
//! The same logical field shows up under different names across upstream
//! revisions (`date`, `submission_date`, `sample_date`, ...). Instead of
//! probing strings ad hoc at every call site, each feed declares an ordered
//! hint per role and resolution is a pure function over the row's keys.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// A raw upstream row: arbitrary field names, untyped values.
pub type RawRecord = Map<String, Value>;

/// How to locate one role (e.g. "date", "value") inside a [`RawRecord`].
///
/// `candidates` are tried first, in order, as case-insensitive exact key
/// matches; the first present key wins. Ties between plausible fields are
/// resolved by candidate order alone, never reported as errors. If no
/// candidate matches, the first row key whose lowercased name contains
/// `fallback_pattern` is used.
#[derive(Debug, Clone)]
pub struct RoleHint {
    pub role: &'static str,
    pub candidates: &'static [&'static str],
    pub fallback_pattern: Option<&'static str>,
}

impl RoleHint {
    pub const fn new(role: &'static str, candidates: &'static [&'static str]) -> Self {
        Self {
            role,
            candidates,
            fallback_pattern: None,
        }
    }

    pub const fn with_fallback(
        role: &'static str,
        candidates: &'static [&'static str],
        pattern: &'static str,
    ) -> Self {
        Self {
            role,
            candidates,
            fallback_pattern: Some(pattern),
        }
    }
}

/// Resolves each hinted role to a concrete field name of `row`.
///
/// Roles that cannot be resolved are simply absent from the returned map;
/// what that means (drop the row, default the value) is the caller's policy.
pub fn resolve(row: &RawRecord, hints: &[RoleHint]) -> HashMap<&'static str, String> {
    let mut out = HashMap::new();
    for hint in hints {
        if let Some(field) = resolve_one(row, hint) {
            out.insert(hint.role, field);
        }
    }
    out
}

fn resolve_one(row: &RawRecord, hint: &RoleHint) -> Option<String> {
    for cand in hint.candidates.iter().copied() {
        if let Some(key) = row.keys().find(|k| k.eq_ignore_ascii_case(cand)) {
            return Some(key.clone());
        }
    }
    if let Some(pattern) = hint.fallback_pattern {
        if let Some(key) = row.keys().find(|k| k.to_lowercase().contains(pattern)) {
            return Some(key.clone());
        }
    }
    None
}

/// Looks up the field resolved for `role` and returns its value as a string.
///
/// JSON numbers and bools are rendered; objects/arrays/null yield `None`.
pub fn string_at(row: &RawRecord, resolved: &HashMap<&'static str, String>, role: &str) -> Option<String> {
    let field = resolved.get(role)?;
    match row.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Looks up the field resolved for `role` and coerces it to `f64`.
///
/// Socrata returns numerics as strings, so string values are parsed too.
/// Returns `None` when the role is unresolved or the value is not numeric.
pub fn number_at(row: &RawRecord, resolved: &HashMap<&'static str, String>, role: &str) -> Option<f64> {
    let field = resolved.get(role)?;
    match row.get(field)? {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> RawRecord {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_candidate_priority_order_wins() {
        // Both plausible date fields present: the first candidate must win.
        let r = row(json!({"submission_date": "2025-01-02", "date": "2025-01-01"}));
        let hints = [RoleHint::new("date", &["date", "submission_date"])];
        let resolved = resolve(&r, &hints);
        assert_eq!(resolved["date"], "date");
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let r = row(json!({"ReportDate": "20250101"}));
        let hints = [RoleHint::new("date", &["reportdate"])];
        assert_eq!(resolve(&r, &hints)["date"], "ReportDate");
    }

    #[test]
    fn test_fallback_substring_used_when_no_candidate_matches() {
        let r = row(json!({"week_start_date": "2025-01-06", "value": 3}));
        let hints = [RoleHint::with_fallback("date", &["date", "submission_date"], "date")];
        assert_eq!(resolve(&r, &hints)["date"], "week_start_date");
    }

    #[test]
    fn test_unresolvable_role_absent_from_map() {
        let r = row(json!({"value": 3}));
        let hints = [RoleHint::new("date", &["date"])];
        assert!(!resolve(&r, &hints).contains_key("date"));
    }

    #[test]
    fn test_number_at_parses_socrata_strings() {
        let r = row(json!({"wastewater_percentile": "87.5"}));
        let hints = [RoleHint::new("value", &["wastewater_percentile"])];
        let resolved = resolve(&r, &hints);
        assert_eq!(number_at(&r, &resolved, "value"), Some(87.5));
    }

    #[test]
    fn test_number_at_rejects_non_numeric() {
        let r = row(json!({"wastewater_percentile": "n/a"}));
        let hints = [RoleHint::new("value", &["wastewater_percentile"])];
        let resolved = resolve(&r, &hints);
        assert_eq!(number_at(&r, &resolved, "value"), None);
    }

    #[test]
    fn test_string_at_renders_numbers() {
        let r = row(json!({"year": 2025}));
        let hints = [RoleHint::new("year", &["year"])];
        let resolved = resolve(&r, &hints);
        assert_eq!(string_at(&r, &resolved, "year").as_deref(), Some("2025"));
    }
}
