//! DoH Shim
//!
//! A small DNS-over-HTTPS query interceptor. Inbound wire-format queries
//! are decoded and checked against a static override table: a match is
//! answered locally from the configured addresses, everything else is
//! forwarded untouched to an upstream DoH resolver and the upstream
//! response is relayed verbatim.
//!
//! The override table is loaded once at startup and never mutated; the
//! request path itself is stateless.
//!
#![warn(clippy::pedantic)]

pub mod api;
#[doc(hidden)]
pub mod banner;
pub mod config;
pub mod error;
pub mod overrides;
pub mod resolver;
pub mod upstream;
pub mod wire;

pub use api::new as new_http;
pub use config::{Config, SharedConfig};
pub use error::Error;
pub use overrides::OverrideTable;
pub use upstream::{DynUpstream, HttpUpstream, Upstream, UpstreamResponse};
