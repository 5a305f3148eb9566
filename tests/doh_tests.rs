//! In-process tests for the DoH entry point.
//!
//! These drive the real router with a stub upstream so the local-answer
//! path, the delegation path and the passthrough contract can all be
//! checked without network access.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bytes::Bytes;
use dohshim::config::Config;
use dohshim::error::Error;
use dohshim::wire::{build_response, DnsQuery, Question, RecordType, ResourceRecord};
use dohshim::{api, DynUpstream, HttpUpstream, Upstream, UpstreamResponse};
use hyper::http::{HeaderMap, HeaderValue};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

const DNS_MESSAGE: &str = "application/dns-message";
const DNS_JSON: &str = "application/dns-json";

/// Stub upstream recording every call and replying with canned bytes.
struct StubUpstream {
    body: Bytes,
    calls: Mutex<Vec<String>>,
}

impl StubUpstream {
    fn new(body: &[u8]) -> Arc<Self> {
        Arc::new(StubUpstream {
            body: Bytes::copy_from_slice(body),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self) -> UpstreamResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(DNS_MESSAGE));
        headers.insert("x-upstream", HeaderValue::from_static("stub"));
        UpstreamResponse {
            status: StatusCode::OK,
            headers,
            body: self.body.clone(),
        }
    }
}

#[async_trait]
impl Upstream for StubUpstream {
    async fn forward_get(&self, dns_b64: &str) -> Result<UpstreamResponse, Error> {
        self.calls.lock().unwrap().push(format!("get:{dns_b64}"));
        Ok(self.respond())
    }

    async fn forward_post(&self, body: Bytes) -> Result<UpstreamResponse, Error> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("post:{}", body.len()));
        Ok(self.respond())
    }

    async fn forward_json(&self, query_string: &str) -> Result<UpstreamResponse, Error> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("json:{query_string}"));
        Ok(self.respond())
    }
}

fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        upstream_url: "https://upstream.invalid/dns-query".to_string(),
        upstream_json_url: "https://upstream.invalid/dns-query".to_string(),
        request_timeout: Duration::from_secs(5),
        upstream_timeout: Duration::from_secs(5),
        overrides: override_entries(),
    }
}

fn override_entries() -> HashMap<String, HashMap<String, Vec<IpAddr>>> {
    let mut example = HashMap::new();
    example.insert("A".to_string(), vec!["0.0.0.0".parse().unwrap()]);
    example.insert(
        "AAAA".to_string(),
        vec!["2606:2800:220:1:248:1893:25c8:1946".parse().unwrap()],
    );
    let mut custom = HashMap::new();
    custom.insert("AAAA".to_string(), vec!["::1".parse().unwrap()]);

    let mut raw = HashMap::new();
    raw.insert("example.com".to_string(), example);
    raw.insert("custom.example".to_string(), custom);
    raw
}

fn test_router(upstream: DynUpstream) -> axum::Router {
    let config = Arc::new(test_config());
    let overrides = Arc::new(config.override_table().unwrap());
    api::router(config, overrides, upstream)
}

/// Single-question wire query with RD set.
fn build_query(domain: &str, qtype: u16, id: u16) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&id.to_be_bytes());
    buf.extend_from_slice(&[0x01, 0x00]);
    buf.extend_from_slice(&[0x00, 0x01]);
    buf.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    for label in domain.split('.') {
        buf.push(u8::try_from(label.len()).unwrap());
        buf.extend_from_slice(label.as_bytes());
    }
    buf.push(0);
    buf.extend_from_slice(&qtype.to_be_bytes());
    buf.extend_from_slice(&[0x00, 0x01]);
    buf
}

/// The response bytes the interceptor should synthesize for a query.
fn expected_local_response(query: &[u8], addrs: &[IpAddr]) -> Vec<u8> {
    let parsed = DnsQuery::parse(query).unwrap();
    let question = &parsed.questions[0];
    let records: Vec<ResourceRecord> = addrs
        .iter()
        .map(|addr| {
            let (rtype, rdata) = match addr {
                IpAddr::V4(v4) => (RecordType::A, v4.octets().to_vec()),
                IpAddr::V6(v6) => (RecordType::AAAA, v6.octets().to_vec()),
            };
            ResourceRecord {
                name: question.qname.clone(),
                rtype,
                class: question.qclass,
                ttl: 300,
                rdata,
            }
        })
        .collect();
    let questions: Vec<Question> = parsed.questions.clone();
    // QR and RA set on top of the query flags.
    build_response(
        parsed.header.id,
        parsed.header.flags | 0x8000 | 0x0080,
        &questions,
        &records,
    )
    .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Bytes {
    hyper::body::to_bytes(response.into_body()).await.unwrap()
}

#[tokio::test]
async fn get_overridden_a_query_is_answered_locally() {
    let stub = StubUpstream::new(b"unused");
    let router = test_router(stub.clone());

    let query = build_query("example.com", 1, 0x1234);
    let b64 = URL_SAFE_NO_PAD.encode(&query);
    let response = router
        .oneshot(
            Request::get(format!("/dns-query?dns={b64}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        DNS_MESSAGE
    );
    let expected = expected_local_response(&query, &["0.0.0.0".parse().unwrap()]);
    assert_eq!(body_bytes(response).await, expected);
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn get_overridden_aaaa_query_is_answered_locally() {
    let stub = StubUpstream::new(b"unused");
    let router = test_router(stub.clone());

    let query = build_query("custom.example", 28, 0x7777);
    let b64 = URL_SAFE_NO_PAD.encode(&query);
    let response = router
        .oneshot(
            Request::get(format!("/dns-query?dns={b64}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let expected = expected_local_response(&query, &["::1".parse().unwrap()]);
    assert_eq!(body_bytes(response).await, expected);
}

#[tokio::test]
async fn get_unknown_domain_is_delegated_verbatim() {
    let upstream_reply = build_query("unknown.test", 1, 0x4242);
    let stub = StubUpstream::new(&upstream_reply);
    let router = test_router(stub.clone());

    let query = build_query("unknown.test", 1, 0x4242);
    let b64 = URL_SAFE_NO_PAD.encode(&query);
    let response = router
        .oneshot(
            Request::get(format!("/dns-query?dns={b64}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-upstream").unwrap(), "stub");
    // Identity passthrough: body equals the upstream bytes unchanged.
    assert_eq!(body_bytes(response).await, Bytes::from(upstream_reply));
    assert_eq!(stub.calls(), vec![format!("get:{b64}")]);
}

#[tokio::test]
async fn get_unsupported_qtype_is_delegated() {
    let stub = StubUpstream::new(b"txt-response");
    let router = test_router(stub.clone());

    // TXT query for a domain that has A/AAAA overrides.
    let query = build_query("example.com", 16, 1);
    let b64 = URL_SAFE_NO_PAD.encode(&query);
    let response = router
        .oneshot(
            Request::get(format!("/dns-query?dns={b64}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, Bytes::from_static(b"txt-response"));
    assert_eq!(stub.calls().len(), 1);
}

#[tokio::test]
async fn get_json_accept_forwards_whole_query_string() {
    let stub = StubUpstream::new(br#"{"Status":0}"#);
    let router = test_router(stub.clone());

    let response = router
        .oneshot(
            Request::get("/dns-query?name=example.org&type=A")
                .header(header::ACCEPT, DNS_JSON)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, Bytes::from_static(br#"{"Status":0}"#));
    assert_eq!(stub.calls(), vec!["json:name=example.org&type=A".to_string()]);
}

#[tokio::test]
async fn post_overridden_query_is_answered_locally() {
    let stub = StubUpstream::new(b"unused");
    let router = test_router(stub.clone());

    let query = build_query("example.com", 28, 0xabcd);
    let response = router
        .oneshot(
            Request::post("/dns-query")
                .header(header::CONTENT_TYPE, DNS_MESSAGE)
                .body(Body::from(query.clone()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let expected = expected_local_response(
        &query,
        &["2606:2800:220:1:248:1893:25c8:1946".parse().unwrap()],
    );
    assert_eq!(body_bytes(response).await, expected);
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn post_unknown_domain_is_delegated() {
    let stub = StubUpstream::new(b"upstream-bytes");
    let router = test_router(stub.clone());

    let query = build_query("unknown.test", 28, 2);
    let query_len = query.len();
    let response = router
        .oneshot(
            Request::post("/dns-query")
                .header(header::CONTENT_TYPE, DNS_MESSAGE)
                .body(Body::from(query))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(body_bytes(response).await, Bytes::from_static(b"upstream-bytes"));
    assert_eq!(stub.calls(), vec![format!("post:{query_len}")]);
}

#[tokio::test]
async fn post_without_dns_content_type_is_404() {
    let stub = StubUpstream::new(b"unused");
    let router = test_router(stub.clone());

    let response = router
        .oneshot(
            Request::post("/dns-query")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(response).await.is_empty());
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn get_without_dns_param_or_json_accept_is_404() {
    let stub = StubUpstream::new(b"unused");
    let router = test_router(stub.clone());

    let response = router
        .oneshot(Request::get("/dns-query").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn unknown_path_is_404() {
    let stub = StubUpstream::new(b"unused");
    let router = test_router(stub.clone());

    let response = router
        .oneshot(Request::get("/healthcheck").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_with_invalid_base64_is_400() {
    let stub = StubUpstream::new(b"unused");
    let router = test_router(stub.clone());

    let response = router
        .oneshot(
            Request::get("/dns-query?dns=%25bad%25")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn truncated_query_is_400_not_a_crash() {
    let stub = StubUpstream::new(b"unused");
    let router = test_router(stub.clone());

    let mut query = build_query("example.com", 1, 3);
    query.truncate(16); // Cut mid-label.
    let b64 = URL_SAFE_NO_PAD.encode(&query);
    let response = router
        .oneshot(
            Request::get(format!("/dns-query?dns={b64}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn unreachable_upstream_surfaces_as_502() {
    // Real transport client pointed at a closed local port: the delegated
    // call fails and the failure propagates, never a fabricated answer.
    let config = Arc::new(Config {
        upstream_url: "http://127.0.0.1:9/dns-query".to_string(),
        upstream_json_url: "http://127.0.0.1:9/dns-query".to_string(),
        upstream_timeout: Duration::from_secs(1),
        ..test_config()
    });
    let overrides = Arc::new(config.override_table().unwrap());
    let upstream: DynUpstream = Arc::new(HttpUpstream::new(&config).unwrap());
    let router = api::router(config, overrides, upstream);

    let query = build_query("unknown.test", 1, 5);
    let b64 = URL_SAFE_NO_PAD.encode(&query);
    let response = router
        .oneshot(
            Request::get(format!("/dns-query?dns={b64}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
