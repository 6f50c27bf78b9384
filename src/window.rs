//! Date window computation and tolerant date parsing.
//!
//! Every feed query carries a "months back" parameter. The window runs from
//! the first day of the month `months` calendar months before the reference
//! time up to the reference date, inclusive on both ends.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};

/// Clamps a requested months-back value into `[1, max]`.
///
/// The upper bound is feed-specific: fast-moving feeds cap at 12, slower ones
/// (import refusals, NORS archives) at 24 or 36.
pub fn clamp_months(raw: i64, max: u32) -> u32 {
    raw.clamp(1, i64::from(max)) as u32
}

/// First day of the month `months_back` calendar months before `now`.
pub fn window_start(now: DateTime<Utc>, months_back: u32) -> NaiveDate {
    let shifted = now
        .date_naive()
        .checked_sub_months(Months::new(months_back))
        .unwrap_or(now.date_naive());
    shifted.with_day(1).unwrap_or(shifted)
}

/// Inclusive-both-ends window test against a pre-computed `[start, end]`.
pub fn in_window(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    date >= start && date <= end
}

/// Parses the date shapes observed across the upstream feeds:
/// `YYYY-MM-DD`, `YYYY/MM/DD`, bare `YYYYMMDD` (openFDA), and ISO-8601
/// timestamps (Socrata floating timestamps), of which only the date part is
/// kept. Returns `None` for anything else.
pub fn parse_feed_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Some(head) = s.get(..10) {
        if let Ok(d) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
            return Some(d);
        }
        if let Ok(d) = NaiveDate::parse_from_str(head, "%Y/%m/%d") {
            return Some(d);
        }
    }
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(s, "%Y%m%d").ok();
    }
    None
}
