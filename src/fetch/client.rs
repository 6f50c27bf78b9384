use async_trait::async_trait;
use reqwest::{Request, Response};

/// Minimal HTTP execution seam.
///
/// Feed services depend on this trait instead of a concrete client, which is
/// what lets [`super::auth::ApiKey`] and [`super::auth::UrlParam`] wrap any
/// client and lets tests inject canned responses.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

// Decorators take their inner client by value; this lets a shared client be
// wrapped by reference at the call site.
#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for &C {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        (**self).execute(req).await
    }
}
