//! Full pipeline over a bundled wastewater-style fixture: extract rows,
//! resolve fields, window-filter, aggregate, forecast.

use chrono::{TimeZone, Utc};

use outbreak_feeds::aggregate::{Bucket, Reducer, aggregate, detection_summary, tally};
use outbreak_feeds::feeds::service::extract_rows;
use outbreak_feeds::feeds::{FeedQuery, Scope, normalize_rows, profile};
use outbreak_feeds::forecast::forecast;
use outbreak_feeds::rate::{rate_per_100k, state_population};

fn fixture_rows() -> Vec<serde_json::Value> {
    let payload: serde_json::Value =
        serde_json::from_str(include_str!("fixtures/nwss_sample.json")).expect("valid fixture");
    extract_rows(&payload).expect("fixture is a row array")
}

fn reference_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()
}

#[test]
fn test_full_pipeline_normalizes_fixture() {
    let p = profile("wastewater").unwrap();
    let events = normalize_rows(&p, &fixture_rows(), &FeedQuery::default(), reference_now());

    // 12 fixture rows: one has an unparseable date (dropped), one is outside
    // the window (dropped). The "n/a" value row stays at 0 per feed policy.
    assert_eq!(events.len(), 10);
    assert!(events.iter().any(|e| e.value == 0.0));
    assert!(events.iter().all(|e| e.source == "CDC NWSS"));
}

#[test]
fn test_pipeline_detection_flags_and_summary() {
    let p = profile("wastewater").unwrap();
    let query = FeedQuery {
        scope: Scope::State("NM".into()),
        ..FeedQuery::default()
    };
    let events = normalize_rows(&p, &fixture_rows(), &query, reference_now());

    // The non-detect sample reports "detectable": "false" alongside an
    // unparseable value; the flag must come from the field, not the value.
    let non_detect = events
        .iter()
        .find(|e| e.date.to_string() == "2025-06-26")
        .unwrap();
    assert_eq!(non_detect.detected, Some(false));
    assert_eq!(non_detect.value, 0.0);

    let summary = detection_summary(&events).unwrap();
    assert_eq!(summary.latest, 0.0);
    // 8 detections among 9 recent samples
    assert_eq!(summary.detection_rate_14d, 89);
}

#[test]
fn test_pipeline_respects_state_scope() {
    let p = profile("wastewater").unwrap();
    let query = FeedQuery {
        scope: Scope::State("TX".into()),
        ..FeedQuery::default()
    };
    let events = normalize_rows(&p, &fixture_rows(), &query, reference_now());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].value, 55.0);
}

#[test]
fn test_pipeline_series_and_forecast() {
    let p = profile("wastewater").unwrap();
    let query = FeedQuery {
        scope: Scope::State("NM".into()),
        ..FeedQuery::default()
    };
    let events = normalize_rows(&p, &fixture_rows(), &query, reference_now());
    let series = aggregate(&events, Bucket::Day, Reducer::Average);

    assert_eq!(series.len(), 9);
    assert!(series.windows(2).all(|w| w[0].date < w[1].date));

    let projected = forecast(&series, 28, 8);
    assert_eq!(projected.len(), 8);
    assert!(projected.iter().all(|pt| pt.value >= 0.0));
    assert!(projected[0].date > series.last().unwrap().date);
}

#[test]
fn test_pipeline_tally_and_rates() {
    let p = profile("wastewater").unwrap();
    let events = normalize_rows(&p, &fixture_rows(), &FeedQuery::default(), reference_now());

    let counts = tally(&events);
    assert_eq!(counts.len(), 51);
    assert_eq!(counts["NM"], 9);
    assert_eq!(counts["TX"], 1);

    let pop = state_population();
    // 9 events over ~2.1M residents rounds to 0 per 100k
    assert_eq!(rate_per_100k("NM", counts["NM"], pop), 0);
    assert_eq!(rate_per_100k("ZZ", 5, pop), 0);
}
