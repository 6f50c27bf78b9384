//! Fallback substitution for failed or empty upstream fetches.
//!
//! Public dashboards over flaky government APIs live or die by this: the
//! consumer always gets a populated, status-flagged envelope, never a bare
//! error. Strictness is opt-in per feed through [`FallbackPolicy`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::OnceLock;

use tracing::warn;

use crate::aggregate::NormalizedEvent;
use crate::envelope::{CachePolicy, Envelope};
use crate::fetch::FetchError;

static DEMO_JSON: &str = include_str!("../data/demo_events.json");
static DEMO: OnceLock<HashMap<String, Vec<NormalizedEvent>>> = OnceLock::new();

/// Demo rows for `feed_id`, used when live data is unavailable. Sources in
/// the asset are tagged `(fallback)` so a consumer can always tell.
pub fn demo_events(feed_id: &str) -> Vec<NormalizedEvent> {
    let table = DEMO.get_or_init(|| {
        serde_json::from_str(DEMO_JSON).expect("bundled demo_events.json is valid JSON")
    });
    table.get(feed_id).cloned().unwrap_or_default()
}

/// An upstream failure together with whatever rows were normalized before it
/// hit. Partial data beats discarding.
#[derive(Debug)]
pub struct FeedFailure {
    pub partial: Vec<NormalizedEvent>,
    pub error: FetchError,
}

impl FeedFailure {
    pub fn empty(error: FetchError) -> Self {
        Self {
            partial: Vec::new(),
            error,
        }
    }
}

pub type FeedResult = Result<Vec<NormalizedEvent>, FeedFailure>;

/// Boundary policy for upstream failures.
///
/// With `never_throw` set (the default) every failure becomes a `fallback`
/// envelope. A stricter consumer flips it off and gets `error` envelopes
/// for upstream failures instead; empty-but-successful results still fall
/// back either way, since "no data" is not an error.
#[derive(Debug, Clone, Copy)]
pub struct FallbackPolicy {
    pub never_throw: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self { never_throw: true }
    }
}

/// Runs `primary` and settles the outcome into an envelope:
///
/// - rows obtained: `live`;
/// - success but zero rows: `sample()`, flagged `fallback`;
/// - failure with partial rows: the partial rows, flagged `fallback`;
/// - failure with nothing: `sample()` flagged `fallback`, or an `error`
///   envelope when the policy is strict.
pub async fn with_fallback<F, S>(
    primary: F,
    sample: S,
    policy: FallbackPolicy,
    cache: CachePolicy,
) -> Envelope<NormalizedEvent>
where
    F: Future<Output = FeedResult>,
    S: FnOnce() -> Vec<NormalizedEvent>,
{
    match primary.await {
        Ok(rows) if !rows.is_empty() => Envelope::live(rows, cache),
        Ok(_) => Envelope::fallback(sample(), "upstream returned no rows", cache),
        Err(failure) => {
            warn!(error = %failure.error, partial_rows = failure.partial.len(), "upstream fetch failed");
            let detail = failure.error.to_string();
            if !failure.partial.is_empty() {
                Envelope::fallback(failure.partial, detail, cache)
            } else if policy.never_throw {
                Envelope::fallback(sample(), detail, cache)
            } else {
                Envelope::error(detail)
            }
        }
    }
}
