//! HTTP access to upstream government feeds.
//!
//! All calls go through the [`HttpClient`] trait so auth decorators compose
//! and tests can substitute canned responses. Every request carries a bounded
//! timeout; upstream failures are classified by [`FetchError`] and never
//! bubble out of the feed layer unclassified.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Longest a detail string captured from an upstream error body may get.
/// Keeps large upstream HTML/error payloads out of response envelopes.
const DETAIL_MAX: usize = 300;

/// Failure taxonomy for upstream calls.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A required URL or credential environment variable is absent. The call
    /// is never attempted.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// The configured upstream URL does not parse.
    #[error("invalid upstream url: {0}")]
    BadUrl(String),

    /// Network-level failure, including the request timeout.
    #[error("upstream transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned {status}: {detail}")]
    UpstreamStatus { status: u16, detail: String },

    /// Upstream answered 2xx but the body was not the JSON we expected.
    #[error("upstream payload malformed: {0}")]
    Malformed(String),

    /// The feed has no per-row geography, so a state scope cannot be served.
    /// The call is never attempted.
    #[error("feed {0} has no geography; state scope is not supported")]
    NoGeography(&'static str),
}

/// Truncates an upstream error body to [`DETAIL_MAX`] characters.
pub fn truncate_detail(detail: &str) -> String {
    if detail.chars().count() <= DETAIL_MAX {
        detail.to_string()
    } else {
        detail.chars().take(DETAIL_MAX).collect()
    }
}

/// GETs `url` and parses the body as JSON.
pub async fn fetch_json<C: HttpClient>(client: &C, url: &str) -> Result<Value, FetchError> {
    let parsed = url
        .parse()
        .map_err(|_| FetchError::BadUrl(url.to_string()))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);
    execute_json(client, req).await
}

/// POSTs a JSON `body` to `url` and parses the response as JSON. Used by the
/// FDA Data Dashboard, whose query interface is POST-only.
pub async fn fetch_json_post<C: HttpClient>(
    client: &C,
    url: &str,
    body: &Value,
) -> Result<Value, FetchError> {
    let parsed = url
        .parse()
        .map_err(|_| FetchError::BadUrl(url.to_string()))?;
    let mut req = reqwest::Request::new(reqwest::Method::POST, parsed);
    req.headers_mut().insert(
        reqwest::header::CONTENT_TYPE,
        reqwest::header::HeaderValue::from_static("application/json"),
    );
    *req.body_mut() = Some(reqwest::Body::from(body.to_string()));
    execute_json(client, req).await
}

async fn execute_json<C: HttpClient>(
    client: &C,
    req: reqwest::Request,
) -> Result<Value, FetchError> {
    let url = req.url().clone();
    let resp = client.execute(req).await?;
    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        debug!(%url, status = status.as_u16(), "upstream non-2xx");
        return Err(FetchError::UpstreamStatus {
            status: status.as_u16(),
            detail: truncate_detail(&body),
        });
    }

    let text = resp.text().await?;
    serde_json::from_str(&text).map_err(|e| FetchError::Malformed(truncate_detail(&e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_detail_caps_length() {
        let long = "x".repeat(1000);
        assert_eq!(truncate_detail(&long).chars().count(), DETAIL_MAX);
        assert_eq!(truncate_detail("short"), "short");
    }

    #[tokio::test]
    async fn test_bad_url_is_classified() {
        let client = BasicClient::new();
        let err = fetch_json(&client, "not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::BadUrl(_)));
    }
}
