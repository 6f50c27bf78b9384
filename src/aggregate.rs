//! Normalized event types and time-series / regional aggregation.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::regions;

/// A single upstream row after field resolution and date parsing.
///
/// Optional fields serialize as null/empty rather than being skipped so the
/// CSV column set stays fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub id: String,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub value: f64,
    /// Pathogen detection flag, populated only for feeds that report one
    /// (wastewater surveillance). `None` means the feed has no such concept.
    pub detected: Option<bool>,
    pub region: Option<String>,
    pub source: String,
}

/// One point of an aggregated series. `sample_count` is only populated for
/// average reductions so consumers can display coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Bucket {
    Day,
    Month,
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bucket::Day => write!(f, "day"),
            Bucket::Month => write!(f, "month"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Reducer {
    Count,
    Sum,
    Average,
}

impl std::fmt::Display for Reducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reducer::Count => write!(f, "count"),
            Reducer::Sum => write!(f, "sum"),
            Reducer::Average => write!(f, "average"),
        }
    }
}

/// Per-region event counts, pre-seeded with every tracked region at zero so
/// "no events" and "region not tracked" stay distinguishable.
pub type RegionTally = BTreeMap<&'static str, u64>;

/// Detection summary for feeds that carry a per-sample detection flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSummary {
    /// Value of the most recent flagged sample.
    pub latest: f64,
    /// Share of detections among the 14 most recent flagged samples,
    /// rounded to whole percent.
    pub detection_rate_14d: u32,
}

/// Summarizes detection over the events that carry a flag.
///
/// Returns `None` when no event is flagged, so feeds without the concept
/// produce no summary rather than a fabricated zero.
pub fn detection_summary(events: &[NormalizedEvent]) -> Option<DetectionSummary> {
    let mut flagged: Vec<&NormalizedEvent> = events.iter().filter(|e| e.detected.is_some()).collect();
    if flagged.is_empty() {
        return None;
    }
    flagged.sort_by_key(|e| e.date);

    let latest = flagged[flagged.len() - 1].value;
    let recent = &flagged[flagged.len().saturating_sub(14)..];
    let hits = recent.iter().filter(|e| e.detected == Some(true)).count();
    let rate = (hits as f64 / recent.len() as f64 * 100.0).round() as u32;

    Some(DetectionSummary {
        latest,
        detection_rate_14d: rate,
    })
}

fn bucket_key(date: NaiveDate, bucket: Bucket) -> NaiveDate {
    match bucket {
        Bucket::Day => date,
        Bucket::Month => date.with_day(1).unwrap_or(date),
    }
}

/// Groups events by bucketed date and reduces each group.
///
/// The output is sorted ascending with one point per bucket. Buckets with no
/// contributing events are not synthesized: the series has gaps, not zeros,
/// which downstream chart consumers rely on.
pub fn aggregate(events: &[NormalizedEvent], bucket: Bucket, reducer: Reducer) -> Vec<TimeSeriesPoint> {
    let mut groups: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for ev in events {
        let entry = groups.entry(bucket_key(ev.date, bucket)).or_insert((0.0, 0));
        entry.0 += ev.value;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(date, (sum, n))| match reducer {
            Reducer::Count => TimeSeriesPoint {
                date,
                value: n as f64,
                sample_count: None,
            },
            Reducer::Sum => TimeSeriesPoint {
                date,
                value: sum,
                sample_count: None,
            },
            Reducer::Average => TimeSeriesPoint {
                date,
                value: sum / n as f64,
                sample_count: Some(n),
            },
        })
        .collect()
}

/// Counts events per tracked region. Every tracked region appears in the
/// result, absent ones at zero; events tagged with untracked codes are
/// ignored.
pub fn tally(events: &[NormalizedEvent]) -> RegionTally {
    let mut counts: RegionTally = regions::all_codes().map(|c| (c, 0u64)).collect();
    for ev in events {
        let Some(region) = &ev.region else { continue };
        if let Some((code, _)) = regions::REGIONS
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(region))
        {
            if let Some(n) = counts.get_mut(code) {
                *n += 1;
            }
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(date: &str, value: f64, region: Option<&str>) -> NormalizedEvent {
        NormalizedEvent {
            id: format!("t-{date}-{value}"),
            date: date.parse().unwrap(),
            category: None,
            value,
            detected: None,
            region: region.map(str::to_string),
            source: "test".into(),
        }
    }

    fn flagged(date: &str, value: f64, detected: bool) -> NormalizedEvent {
        NormalizedEvent {
            detected: Some(detected),
            ..ev(date, value, Some("NM"))
        }
    }

    #[test]
    fn test_aggregate_count_by_day_sorted() {
        let events = [
            ev("2025-02-03", 1.0, None),
            ev("2025-01-05", 2.0, None),
            ev("2025-02-03", 5.0, None),
        ];
        let series = aggregate(&events, Bucket::Day, Reducer::Count);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date.to_string(), "2025-01-05");
        assert_eq!(series[0].value, 1.0);
        assert_eq!(series[1].value, 2.0);
    }

    #[test]
    fn test_aggregate_month_buckets_merge_duplicates() {
        let events = [
            ev("2025-03-02", 4.0, None),
            ev("2025-03-28", 6.0, None),
        ];
        let series = aggregate(&events, Bucket::Month, Reducer::Sum);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date.to_string(), "2025-03-01");
        assert_eq!(series[0].value, 10.0);
    }

    #[test]
    fn test_aggregate_average_always_has_positive_sample_count() {
        let events = [
            ev("2025-04-01", 10.0, None),
            ev("2025-04-01", 20.0, None),
            ev("2025-05-01", 7.0, None),
        ];
        let series = aggregate(&events, Bucket::Month, Reducer::Average);
        for p in &series {
            let n = p.sample_count.expect("average must record sample_count");
            assert!(n > 0);
        }
        assert_eq!(series[0].value, 15.0);
        assert_eq!(series[0].sample_count, Some(2));
    }

    #[test]
    fn test_aggregate_leaves_gaps() {
        let events = [ev("2025-01-01", 1.0, None), ev("2025-03-01", 1.0, None)];
        let series = aggregate(&events, Bucket::Month, Reducer::Count);
        // No synthesized zero for February
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_tally_seeds_all_regions() {
        let events = [
            ev("2025-01-01", 1.0, Some("NM")),
            ev("2025-01-02", 1.0, Some("NM")),
            ev("2025-01-03", 1.0, Some("nm")),
        ];
        let t = tally(&events);
        assert_eq!(t.len(), 51);
        assert_eq!(t["NM"], 3);
        assert_eq!(t["WY"], 0);
        assert_eq!(t.values().filter(|v| **v == 0).count(), 50);
    }

    #[test]
    fn test_detection_summary_absent_without_flags() {
        let events = [ev("2025-01-01", 5.0, None)];
        assert_eq!(detection_summary(&events), None);
    }

    #[test]
    fn test_detection_summary_rate_and_latest() {
        // Out of order on purpose: latest must follow date, not input order.
        let events = [
            flagged("2025-06-03", 20.0, true),
            flagged("2025-06-09", 0.0, false),
            flagged("2025-06-06", 25.0, true),
            flagged("2025-06-12", 30.0, true),
        ];
        let s = detection_summary(&events).unwrap();
        assert_eq!(s.latest, 30.0);
        // 3 of 4 detections rounds to 75
        assert_eq!(s.detection_rate_14d, 75);
    }

    #[test]
    fn test_detection_summary_window_is_last_fourteen() {
        let mut events: Vec<NormalizedEvent> = (1..=14)
            .map(|d| flagged(&format!("2025-06-{d:02}"), 1.0, true))
            .collect();
        // Older non-detections must fall out of the 14-sample window.
        events.push(flagged("2025-05-01", 0.0, false));
        events.push(flagged("2025-05-02", 0.0, false));
        let s = detection_summary(&events).unwrap();
        assert_eq!(s.detection_rate_14d, 100);
    }

    #[test]
    fn test_tally_ignores_untracked_regions() {
        let events = [ev("2025-01-01", 1.0, Some("ZZ"))];
        let t = tally(&events);
        assert_eq!(t.len(), 51);
        assert!(t.values().all(|v| *v == 0));
    }
}
