use crate::fetch::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that appends a credential as a URL query
/// parameter.
///
/// openFDA takes its key this way: `?api_key=<key>`. `param_name` is the
/// query parameter name and `key` its value.
pub struct UrlParam<C> {
    pub inner: C,
    pub param_name: String,
    pub key: String,
}

impl<C> UrlParam<C> {
    /// Convenience constructor for the openFDA `api_key` parameter.
    pub fn openfda(inner: C, key: impl Into<String>) -> Self {
        Self {
            inner,
            param_name: "api_key".to_string(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.url_mut()
            .query_pairs_mut()
            .append_pair(&self.param_name, &self.key);
        self.inner.execute(req).await
    }
}
