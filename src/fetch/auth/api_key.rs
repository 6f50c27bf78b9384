use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects a credential as an HTTP header.
///
/// `header_name` is the header field to set (e.g. `"X-App-Token"` for
/// Socrata endpoints, or `"Authorization-User"`/`"Authorization-Key"` for
/// the FDA Data Dashboard). `key` is the raw value written into that header.
pub struct ApiKey<C> {
    pub inner: C,
    pub header_name: String,
    pub key: String,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            inner,
            header_name: header_name.into(),
            key: key.into(),
        }
    }

    /// Convenience constructor for the Socrata `X-App-Token` scheme used by
    /// the CDC endpoints.
    pub fn socrata(inner: C, token: impl Into<String>) -> Self {
        Self::new(inner, "X-App-Token", token)
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(self.header_name.as_bytes()),
            HeaderValue::from_str(&self.key),
        ) {
            req.headers_mut().insert(name, value);
        }
        self.inner.execute(req).await
    }
}
