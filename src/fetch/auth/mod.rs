//! Credential decorators for upstream calls.
//!
//! Each upstream wants its key somewhere different: Socrata as an
//! `X-App-Token` header, openFDA as an `api_key` query parameter, the FDA
//! Data Dashboard as a pair of `Authorization-*` headers. Decorators wrap an
//! inner [`super::HttpClient`] and compose, so the Data Dashboard pair is
//! just two [`ApiKey`] layers.

mod api_key;
mod url_param;

pub use api_key::ApiKey;
pub use url_param::UrlParam;
