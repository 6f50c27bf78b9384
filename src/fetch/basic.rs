use super::client::HttpClient;
use async_trait::async_trait;
use std::time::Duration;

/// Total request budget for any upstream call. Public government APIs are
/// routinely slow or rate-limited; past this point the fallback path is more
/// useful than the answer.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(9);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(4);

/// Plain [`HttpClient`] with bounded timeouts and gzip decoding.
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent("outbreak_feeds/0.1")
            .build()
            .unwrap_or_default();
        Self(client)
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
