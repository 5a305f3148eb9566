//! Upstream DoH transport client.
//!
//! When the [resolver][crate::resolver] signals delegation, the original
//! query representation is forwarded here untouched: the base64url `dns`
//! parameter for GET, the raw binary body for POST, or the whole query
//! string for JSON-style DoH. The upstream's status, headers and body come
//! back unchanged; this module performs no interpretation, no retries and
//! no response rewriting.

use crate::config::Config;
use crate::error::Error;
use axum::response::IntoResponse;
use bytes::Bytes;
use hyper::http::{header, HeaderMap, StatusCode};
use std::sync::Arc;

/// Media type of binary DNS messages over HTTP (RFC 8484).
pub const CONTENT_TYPE_DNS_MESSAGE: &str = "application/dns-message";

/// Media type of JSON-style DoH queries.
pub const CONTENT_TYPE_DNS_JSON: &str = "application/dns-json";

/// `DynUpstream` is a type alias for an [`Upstream`] shared with the
/// request handlers through an [`Arc`]. The client is read-only, so no lock
/// is involved.
pub type DynUpstream = Arc<dyn Upstream + Send + Sync>;

/// An async trait describing the upstream DoH transport.
///
/// Each operation forwards one query representation verbatim and returns
/// the upstream response as-is.
#[async_trait::async_trait]
pub trait Upstream {
    /// Forward a GET query: `{upstream}?dns={base64url wire query}`.
    async fn forward_get(&self, dns_b64: &str) -> Result<UpstreamResponse, Error>;

    /// Forward a POST query with the raw wire-format body.
    async fn forward_post(&self, body: Bytes) -> Result<UpstreamResponse, Error>;

    /// Forward a JSON-style query string, e.g. `name=example.com&type=A`.
    async fn forward_json(&self, query_string: &str) -> Result<UpstreamResponse, Error>;
}

/// Upstream response passed back to the client unchanged.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.headers, self.body).into_response()
    }
}

/// [`reqwest`]-backed implementation talking to a fixed DoH endpoint pair.
pub struct HttpUpstream {
    client: reqwest::Client,
    doh_url: String,
    doh_json_url: String,
}

impl HttpUpstream {
    /// Build the shared HTTP client for the configured endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] if the TLS backend can't be initialized.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()?;
        Ok(HttpUpstream {
            client,
            doh_url: config.upstream_url.clone(),
            doh_json_url: config.upstream_json_url.clone(),
        })
    }

    async fn passthrough(response: reqwest::Response) -> Result<UpstreamResponse, Error> {
        let status = response.status();
        let headers = end_to_end_headers(response.headers());
        let body = response.bytes().await?;
        tracing::debug!(status = %status, bytes = body.len(), "upstream response relayed");
        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait::async_trait]
impl Upstream for HttpUpstream {
    async fn forward_get(&self, dns_b64: &str) -> Result<UpstreamResponse, Error> {
        tracing::debug!(upstream = %self.doh_url, "delegating GET query");
        let response = self
            .client
            .get(&self.doh_url)
            .query(&[("dns", dns_b64)])
            .header(header::ACCEPT, CONTENT_TYPE_DNS_MESSAGE)
            .send()
            .await?;
        Self::passthrough(response).await
    }

    async fn forward_post(&self, body: Bytes) -> Result<UpstreamResponse, Error> {
        tracing::debug!(upstream = %self.doh_url, bytes = body.len(), "delegating POST query");
        let response = self
            .client
            .post(&self.doh_url)
            .header(header::ACCEPT, CONTENT_TYPE_DNS_MESSAGE)
            .header(header::CONTENT_TYPE, CONTENT_TYPE_DNS_MESSAGE)
            .body(body)
            .send()
            .await?;
        Self::passthrough(response).await
    }

    async fn forward_json(&self, query_string: &str) -> Result<UpstreamResponse, Error> {
        tracing::debug!(upstream = %self.doh_json_url, "delegating JSON query");
        let url = if query_string.is_empty() {
            self.doh_json_url.clone()
        } else {
            format!("{}?{query_string}", self.doh_json_url)
        };
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, CONTENT_TYPE_DNS_JSON)
            .send()
            .await?;
        Self::passthrough(response).await
    }
}

// Hop-by-hop headers describe the upstream connection, not the payload,
// and must not be echoed onto ours.
fn end_to_end_headers(upstream: &HeaderMap) -> HeaderMap {
    const HOP_BY_HOP: [&str; 4] = [
        "connection",
        "keep-alive",
        "transfer-encoding",
        "content-length",
    ];
    let mut headers = HeaderMap::new();
    for (name, value) in upstream {
        if !HOP_BY_HOP.contains(&name.as_str()) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}
