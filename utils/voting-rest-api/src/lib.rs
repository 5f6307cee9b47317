#![doc = include_str!("../README.md")]

pub mod api;
mod config;
pub mod metrics;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use voting_ledger_bridge::{LedgerBridge, LedgerClient};

pub use crate::config::{Config, HttpConfig, RestApiConfigFile};
pub use crate::metrics::Metrics;

pub type AppState<L> = Arc<AppStateInner<L>>;

/// The application state, to which every request handler has access.
pub struct AppStateInner<L> {
    pub bridge: LedgerBridge<L>,
    pub http: HttpConfig,
    pub metrics: Metrics,
}

/// Every route of the service, with request tracing and permissive CORS.
pub fn app<L: LedgerClient>(app_state: AppState<L>) -> Router {
    let metrics = app_state.metrics.clone();
    Router::new()
        .nest("/api", api::router(app_state))
        .nest("/metrics", metrics::router(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
