//! Response envelopes: payload plus status metadata and cache directives.
//!
//! Every operation resolves to exactly one terminal status per request:
//! `live`, `fallback`, or `error`. There are no retries at this layer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::fetch::truncate_detail;

/// Terminal status of one feed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Data came from the upstream API.
    Live,
    /// Demo/partial data substituted for a failed or empty upstream result.
    Fallback,
    /// The caller opted out of fallback semantics and the upstream failed.
    Error,
}

/// Cache directives for a feed response. Upstream government datasets update
/// infrequently, so freshness is minutes and stale-while-revalidate is hours
/// to a day.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub fresh_secs: u32,
    pub stale_while_revalidate_secs: u32,
}

impl CachePolicy {
    pub const fn new(fresh_secs: u32, stale_while_revalidate_secs: u32) -> Self {
        Self {
            fresh_secs,
            stale_while_revalidate_secs,
        }
    }

    fn header_value(&self) -> String {
        format!(
            "public, s-maxage={}, stale-while-revalidate={}",
            self.fresh_secs, self.stale_while_revalidate_secs
        )
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        // 10 minutes fresh, a day of stale tolerance
        Self::new(600, 86_400)
    }
}

/// The JSON body handed to consumers. Always status-flagged, never an
/// exception surface.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T: Serialize> {
    pub data: Vec<T>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub cache_control: String,
}

impl<T: Serialize> Envelope<T> {
    pub fn live(data: Vec<T>, cache: CachePolicy) -> Self {
        Self {
            data,
            status: Status::Live,
            detail: None,
            fetched_at: Utc::now(),
            cache_control: cache.header_value(),
        }
    }

    pub fn fallback(data: Vec<T>, detail: impl AsRef<str>, cache: CachePolicy) -> Self {
        Self {
            data,
            status: Status::Fallback,
            detail: Some(truncate_detail(detail.as_ref())),
            fetched_at: Utc::now(),
            cache_control: cache.header_value(),
        }
    }

    /// Short-lived cache window so a recovered upstream is picked up fast.
    pub fn error(detail: impl AsRef<str>) -> Self {
        Self {
            data: Vec::new(),
            status: Status::Error,
            detail: Some(truncate_detail(detail.as_ref())),
            fetched_at: Utc::now(),
            cache_control: CachePolicy::new(120, 3600).header_value(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.status == Status::Fallback
    }
}
