//! Error types.

use crate::wire::RecordType;
use std::net::IpAddr;

/// Error enumerates the possible DoH Shim error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when an inbound DNS query can't be decoded: buffer shorter
    /// than the header, a name without its terminating zero label, or a
    /// label or field reading past the end of the message. Surfaces to
    /// clients as HTTP 400.
    #[error("malformed DNS query: {0}")]
    MalformedQuery(&'static str),

    /// Returned when a synthesized response would exceed the fixed message
    /// capacity. The check happens before the buffer is touched; there is
    /// no silent truncation. Surfaces to clients as HTTP 500.
    #[error("DNS response exceeds the {capacity}-byte message capacity")]
    BufferOverflow { capacity: usize },

    /// Returned when the `dns` query parameter of a GET request is not
    /// valid unpadded base64url.
    #[error("\"dns\" query parameter is not valid base64url")]
    BadDnsParam(#[from] base64::DecodeError),

    /// Returned when an override table entry uses a record type key other
    /// than `A` or `AAAA`.
    #[error("unknown override record type \"{0}\" (expected A or AAAA)")]
    UnknownRecordType(String),

    /// Returned when an override address's family doesn't match its record
    /// type key, e.g. an IPv6 literal listed under `A`.
    #[error("override for \"{domain}\" lists {addr} under the {rtype} record type")]
    OverrideFamilyMismatch {
        domain: String,
        rtype: RecordType,
        addr: IpAddr,
    },

    /// Returned when the delegated request to the upstream DoH resolver
    /// fails at the transport level. Surfaces to clients as HTTP 502; no
    /// answer is ever fabricated in its place.
    #[error("upstream DoH request failed")]
    Upstream(#[from] reqwest::Error),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when the JSON configuration file can't be decoded.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),
}
