//! Output: CSV export and JSON printing for normalized feed data.
//!
//! CSV quoting is RFC-4180 (the `csv` crate's default): fields containing
//! commas or quotes are double-quoted with `""` escapes, so exports survive
//! a round trip through any spreadsheet tool.

use anyhow::Result;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info};

use csv::WriterBuilder;
use serde::Serialize;

use crate::aggregate::NormalizedEvent;
use crate::feeds::Scope;

/// Export filename encoding feed, scope, and window: `recalls_NM_6mo.csv`.
pub fn export_filename(feed_id: &str, scope: &Scope, months: u32) -> String {
    let scope_part = match scope {
        Scope::Us => "US",
        Scope::State(st) => st.as_str(),
    };
    format!("{feed_id}_{scope_part}_{months}mo.csv")
}

/// Writes a full CSV export (header + one row per event) to `path`.
pub fn write_csv(path: &str, events: &[NormalizedEvent]) -> Result<()> {
    let mut writer = WriterBuilder::new().from_path(path)?;
    for event in events {
        writer.serialize(event)?;
    }
    writer.flush()?;
    info!(path, rows = events.len(), "CSV export written");
    Ok(())
}

/// Appends one event as a row to a CSV file, creating the file with headers
/// if it does not already exist.
pub fn append_record(path: &str, event: &NormalizedEvent) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(event)?;
    writer.flush()?;

    Ok(())
}

/// Reads an export back into events, for verification and offline reuse.
pub fn read_csv(path: &str) -> Result<Vec<NormalizedEvent>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut events = Vec::new();
    for row in reader.deserialize() {
        events.push(row?);
    }
    Ok(events)
}

/// Prints any serializable payload as pretty JSON to stdout.
pub fn print_json<T: Serialize>(payload: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn event(id: &str, category: &str) -> NormalizedEvent {
        NormalizedEvent {
            id: id.to_string(),
            date: "2025-07-04".parse().unwrap(),
            category: Some(category.to_string()),
            value: 3.0,
            detected: None,
            region: Some("NM".to_string()),
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_export_filename_encodes_scope_and_window() {
        assert_eq!(export_filename("recalls", &Scope::Us, 6), "recalls_US_6mo.csv");
        assert_eq!(
            export_filename("wastewater", &Scope::State("NM".into()), 12),
            "wastewater_NM_12mo.csv"
        );
    }

    #[test]
    fn test_csv_round_trip_preserves_commas_and_quotes() {
        let path = temp_path("outbreak_feeds_test_roundtrip.csv");
        let _ = fs::remove_file(&path);

        let tricky = vec![
            event("a,b", "Sliced \"Deli\" Meat, 12oz"),
            event("plain", "Milk"),
        ];
        write_csv(&path, &tricky).unwrap();

        let back = read_csv(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].id, "a,b");
        assert_eq!(back[0].category.as_deref(), Some("Sliced \"Deli\" Meat, 12oz"));
        assert_eq!(back[1].category.as_deref(), Some("Milk"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_csv_replaces_previous_export() {
        let path = temp_path("outbreak_feeds_test_truncate.csv");
        let _ = fs::remove_file(&path);

        write_csv(&path, &[event("1", "x"), event("2", "y"), event("3", "z")]).unwrap();
        // A second export to the same path must not accumulate old rows.
        write_csv(&path, &[event("4", "w")]).unwrap();

        let back = read_csv(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].id, "4");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let path = temp_path("outbreak_feeds_test_header.csv");
        let _ = fs::remove_file(&path);

        append_record(&path, &event("1", "x")).unwrap();
        append_record(&path, &event("2", "y")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("source")).count();
        assert_eq!(header_count, 1);
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }
}
