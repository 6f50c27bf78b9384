//! Executes one feed query end to end: build upstream request(s), fetch,
//! extract the row array, normalize.
//!
//! Socrata-backed feeds get several candidate queries (upstream revisions
//! disagree about column names); the first one that answers with a JSON
//! array wins and the bare dataset URL is the last resort.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::aggregate::NormalizedEvent;
use crate::fallback::{FeedFailure, FeedResult};
use crate::fetch::auth::{ApiKey, UrlParam};
use crate::fetch::{FetchError, HttpClient, fetch_json, fetch_json_post};
use crate::feeds::{
    FeedProfile, FeedQuery, RegionStyle, Scope, UpstreamKind, UrlSource, normalize_rows,
    query_window,
};

/// The row array can sit at the top level or under one of a few wrapper
/// keys, depending on the upstream.
pub fn extract_rows(payload: &Value) -> Option<Vec<Value>> {
    if let Some(arr) = payload.as_array() {
        return Some(arr.clone());
    }
    for key in ["results", "data", "result"] {
        if let Some(arr) = payload.get(key).and_then(Value::as_array) {
            return Some(arr.clone());
        }
    }
    None
}

fn base_url(profile: &FeedProfile) -> Result<String, FetchError> {
    match profile.base {
        UrlSource::Fixed(url) => Ok(url.to_string()),
        UrlSource::Env(var) => {
            std::env::var(var).map_err(|_| FetchError::NotConfigured(var))
        }
    }
}

/// Candidate GET URLs for a profile, most specific first.
fn candidate_urls(
    profile: &FeedProfile,
    query: &FeedQuery,
    base: &str,
    now: DateTime<Utc>,
) -> Vec<String> {
    let (start, end) = query_window(profile, query, now);
    match profile.kind {
        UpstreamKind::OpenFda { date_field } => {
            vec![format!(
                "{base}?search={date_field}:[{}+TO+{}]&limit=250",
                start.format("%Y%m%d"),
                end.format("%Y%m%d"),
            )]
        }
        UpstreamKind::Socrata {
            date_columns,
            state_columns,
        } => {
            let mut urls = Vec::new();
            for dc in date_columns {
                match &query.scope {
                    Scope::State(st) => {
                        for sc in state_columns {
                            urls.push(format!(
                                "{base}?$where={dc} >= '{start}' AND upper({sc}) = '{st}'&$order={dc} ASC&$limit=50000"
                            ));
                        }
                    }
                    Scope::Us => {
                        urls.push(format!(
                            "{base}?$where={dc} >= '{start}'&$order={dc} ASC&$limit=50000"
                        ));
                    }
                }
            }
            // last resort: raw dataset, normalized locally
            urls.push(base.to_string());
            urls
        }
        UpstreamKind::Plain => vec![base.to_string()],
        UpstreamKind::DataDashboard { .. } => vec![base.to_string()],
    }
}

fn data_dashboard_body(profile: &FeedProfile, query: &FeedQuery, now: DateTime<Utc>) -> Value {
    let (start, end) = query_window(profile, query, now);
    let UpstreamKind::DataDashboard {
        date_field,
        columns,
        ..
    } = profile.kind
    else {
        return Value::Null;
    };
    json!({
        "start": 1,
        "rows": 500,
        "sort": date_field,
        "sortorder": "DESC",
        "filters": {
            (format!("{date_field}From")): [start.to_string()],
            (format!("{date_field}To")): [end.to_string()],
        },
        "columns": columns,
    })
}

async fn fetch_payload<C: HttpClient>(
    client: &C,
    profile: &FeedProfile,
    query: &FeedQuery,
    base: &str,
    now: DateTime<Utc>,
) -> Result<Vec<Value>, FetchError> {
    if let UpstreamKind::DataDashboard {
        auth_user_env,
        auth_key_env,
        ..
    } = profile.kind
    {
        let user =
            std::env::var(auth_user_env).map_err(|_| FetchError::NotConfigured(auth_user_env))?;
        let key =
            std::env::var(auth_key_env).map_err(|_| FetchError::NotConfigured(auth_key_env))?;
        let authed = ApiKey::new(
            ApiKey::new(client, "Authorization-User", user),
            "Authorization-Key",
            key,
        );
        let body = data_dashboard_body(profile, query, now);
        let payload = fetch_json_post(&authed, base, &body).await?;
        return extract_rows(&payload)
            .ok_or_else(|| FetchError::Malformed("no row array in payload".into()));
    }

    let mut last_err: Option<FetchError> = None;
    for url in candidate_urls(profile, query, base, now) {
        let fetched = match profile.kind {
            UpstreamKind::OpenFda { .. } => match std::env::var("OPENFDA_API_KEY") {
                Ok(key) => fetch_json(&UrlParam::openfda(client, key), &url).await,
                Err(_) => fetch_json(client, &url).await,
            },
            UpstreamKind::Socrata { .. } => match std::env::var("CDC_APP_TOKEN") {
                Ok(token) => fetch_json(&ApiKey::socrata(client, token), &url).await,
                Err(_) => fetch_json(client, &url).await,
            },
            _ => fetch_json(client, &url).await,
        };
        match fetched {
            Ok(payload) => match extract_rows(&payload) {
                Some(rows) => return Ok(rows),
                None => {
                    last_err = Some(FetchError::Malformed("no row array in payload".into()));
                }
            },
            Err(e) => {
                debug!(%url, error = %e, "candidate query failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or(FetchError::Malformed("no candidate queries".into())))
}

/// Fetches and normalizes one feed. Configuration gaps and upstream failures
/// come back as [`FeedFailure`] for the fallback layer to settle; this
/// function itself never panics on upstream shape.
#[instrument(skip(client, query), fields(feed_id = profile.id))]
pub async fn fetch_feed<C: HttpClient>(
    client: &C,
    profile: &FeedProfile,
    query: &FeedQuery,
    now: DateTime<Utc>,
) -> FeedResult {
    // A feed with no per-row geography cannot serve a state scope; reject
    // before fetching so the envelope detail names the real cause instead
    // of "no rows".
    if profile.region_style == RegionStyle::None {
        if let Scope::State(_) = query.scope {
            return Err(FeedFailure::empty(FetchError::NoGeography(profile.id)));
        }
    }

    let base = base_url(profile).map_err(FeedFailure::empty)?;

    let rows = fetch_payload(client, profile, query, &base, now)
        .await
        .map_err(FeedFailure::empty)?;

    let events: Vec<NormalizedEvent> = normalize_rows(profile, &rows, query, now);
    debug!(raw = rows.len(), normalized = events.len(), "feed normalized");
    Ok(events)
}
