use crate::api::routes;
use crate::config::SharedConfig;
use crate::overrides::OverrideTable;
use crate::upstream::DynUpstream;
use axum::Router;
use std::future::Future;
use std::sync::Arc;

#[derive(Clone)]
pub(super) struct AppState {
    pub config: SharedConfig,
    pub overrides: Arc<OverrideTable>,
    pub upstream: DynUpstream,
}

/// Serve the DoH router on the configured bind address.
pub fn new(
    config: SharedConfig,
    overrides: Arc<OverrideTable>,
    upstream: DynUpstream,
) -> impl Future<Output = hyper::Result<()>> {
    let addr = config.bind_addr;
    axum::Server::bind(&addr).serve(router(config, overrides, upstream).into_make_service())
}

/// Assemble the service router. Split out from [`new`] so tests can drive
/// it in-process without binding a socket.
pub fn router(
    config: SharedConfig,
    overrides: Arc<OverrideTable>,
    upstream: DynUpstream,
) -> Router {
    routes::new(AppState {
        config,
        overrides,
        upstream,
    })
}
