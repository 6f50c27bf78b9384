//! Per-capita rate computation against a static population table.
//!
//! The table ships as a JSON asset rather than literals in handler code and
//! is parsed once on first use.

use std::collections::HashMap;
use std::sync::OnceLock;

static POPULATION_JSON: &str = include_str!("../data/state_population.json");
static POPULATION: OnceLock<HashMap<String, u64>> = OnceLock::new();

/// Resident population per tracked region (Census Bureau estimates).
pub fn state_population() -> &'static HashMap<String, u64> {
    POPULATION.get_or_init(|| {
        serde_json::from_str(POPULATION_JSON).expect("bundled state_population.json is valid JSON")
    })
}

/// Events per 100,000 residents, rounded half away from zero.
///
/// Returns 0 (never an error) when the region is unknown to `population` or
/// the count is 0, so callers can render sparse maps without special-casing.
pub fn rate_per_100k(region: &str, count: u64, population: &HashMap<String, u64>) -> u64 {
    let Some(&pop) = population.get(&region.to_uppercase()) else {
        return 0;
    };
    if pop == 0 || count == 0 {
        return 0;
    }
    (count as f64 / pop as f64 * 100_000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_region_returns_zero() {
        assert_eq!(rate_per_100k("ZZ", 5, &HashMap::new()), 0);
        assert_eq!(rate_per_100k("ZZ", 5, state_population()), 0);
    }

    #[test]
    fn test_zero_count_returns_zero() {
        assert_eq!(rate_per_100k("NM", 0, state_population()), 0);
    }

    #[test]
    fn test_rate_rounds_to_nearest() {
        let mut pop = HashMap::new();
        pop.insert("NM".to_string(), 2_000_000u64);
        // 30 / 2e6 * 1e5 = 1.5 -> rounds away from zero to 2
        assert_eq!(rate_per_100k("NM", 30, &pop), 2);
        // 29 / 2e6 * 1e5 = 1.45 -> 1
        assert_eq!(rate_per_100k("nm", 29, &pop), 1);
    }

    #[test]
    fn test_population_table_covers_all_tracked_regions() {
        let pop = state_population();
        assert_eq!(pop.len(), 51);
        for code in crate::regions::all_codes() {
            assert!(pop.contains_key(code), "missing population for {code}");
        }
    }
}
