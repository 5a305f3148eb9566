use crate::api::api_error::APIError;
use crate::api::server::AppState;
use crate::error::Error;
use crate::resolver::{resolve, Resolution};
use crate::upstream::{CONTENT_TYPE_DNS_JSON, CONTENT_TYPE_DNS_MESSAGE};
use crate::wire::{build_response, DnsQuery, FLAG_QR, FLAG_RA};
use axum::body::Bytes;
use axum::extract::{Query, RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use base64::engine::general_purpose;
use base64::{alphabet, engine, Engine};
use lazy_static::lazy_static;
use serde::Deserialize;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

lazy_static! {
    // RFC 8484: the dns parameter is base64url without padding.
    static ref BASE64_ENGINE: engine::GeneralPurpose =
        engine::GeneralPurpose::new(&alphabet::URL_SAFE, general_purpose::NO_PAD);
}

pub(super) fn new(state: AppState) -> Router {
    Router::new()
        .route("/dns-query", get(query_get).post(query_post))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .with_state(state)
}

#[derive(Deserialize, Debug, Default)]
struct DnsParams {
    dns: Option<String>,
}

async fn query_get(
    State(state): State<AppState>,
    Query(params): Query<DnsParams>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, APIError> {
    if let Some(dns_b64) = params.dns {
        let query_bytes = BASE64_ENGINE.decode(&dns_b64).map_err(Error::from)?;
        return match answer_locally(&state, &query_bytes)? {
            Some(message) => Ok(dns_message_response(message)),
            None => Ok(state.upstream.forward_get(&dns_b64).await?.into_response()),
        };
    }

    if accepts_dns_json(&headers) {
        let query_string = raw_query.unwrap_or_default();
        return Ok(state
            .upstream
            .forward_json(&query_string)
            .await?
            .into_response());
    }

    Ok(StatusCode::NOT_FOUND.into_response())
}

async fn query_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, APIError> {
    if !is_dns_message(&headers) {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }
    match answer_locally(&state, &body)? {
        Some(message) => Ok(dns_message_response(message)),
        None => Ok(state.upstream.forward_post(body).await?.into_response()),
    }
}

#[allow(clippy::unused_async)]
async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Parse the wire query and synthesize a response when the override table
/// matches; `None` means the original query must be delegated untouched.
fn answer_locally(state: &AppState, query_bytes: &[u8]) -> Result<Option<Vec<u8>>, Error> {
    let query = DnsQuery::parse(query_bytes)?;
    match resolve(&query, &state.overrides) {
        Resolution::Local(records) => {
            if let Some(question) = query.questions.first() {
                tracing::info!(
                    qname = %question.qname,
                    answers = records.len(),
                    "answering from override table"
                );
            }
            let message = build_response(
                query.header.id,
                response_flags(query.header.flags),
                &query.questions,
                &records,
            )?;
            Ok(Some(message))
        }
        Resolution::Delegate => {
            tracing::debug!("no override match, delegating upstream");
            Ok(None)
        }
    }
}

/// QR and RA are set on top of the query's flags; the remaining bits are
/// carried through unchanged.
fn response_flags(query_flags: u16) -> u16 {
    query_flags | FLAG_QR | FLAG_RA
}

fn dns_message_response(message: Vec<u8>) -> Response {
    (
        [(header::CONTENT_TYPE, CONTENT_TYPE_DNS_MESSAGE)],
        message,
    )
        .into_response()
}

fn accepts_dns_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .map_or(false, |accept| accept.as_bytes() == CONTENT_TYPE_DNS_JSON.as_bytes())
}

fn is_dns_message(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .map_or(false, |ct| ct.as_bytes() == CONTENT_TYPE_DNS_MESSAGE.as_bytes())
}
