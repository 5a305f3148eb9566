//! HTTP entry point for DoH queries.
//!
//! # Endpoints
//!
//! ## `/dns-query` (GET)
//!
//!   With a `dns` query parameter holding an unpadded base64url DNS
//!   wire-format query: the query is decoded and resolved. A match in the
//!   override table returns HTTP 200 with a synthesized binary response and
//!   `Content-Type: application/dns-message`; otherwise the request is
//!   delegated upstream with the `dns` parameter untouched and the upstream
//!   response is relayed verbatim.
//!
//!   With `Accept: application/dns-json` and no `dns` parameter: the whole
//!   query string is forwarded to the upstream JSON-DoH endpoint and the
//!   response is passed through unchanged.
//!
//! ## `/dns-query` (POST)
//!
//!   With `Content-Type: application/dns-message` and a raw binary body:
//!   same resolution path as the GET binary case, delegating the original
//!   body bytes on a miss.
//!
//! Any other method, path or header combination returns HTTP 404 with an
//! empty body.

mod api_error;
mod routes;
pub mod server;

pub use server::{new, router};
