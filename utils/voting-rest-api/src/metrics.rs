use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use voting_ledger_bridge::retrieval::RetrievalStrategy;
use voting_ledger_bridge::BridgeError;

pub fn router(metrics: Metrics) -> Router {
    Router::new()
        .route("/", get(metrics_handler))
        .with_state(metrics)
}

/// Counters exposed on `/metrics`. Clones share the same registry.
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    votes: IntCounterVec,
    candidate_listings: IntCounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let votes = IntCounterVec::new(
            Opts::new("voting_bridge_votes_total", "Vote submissions by outcome"),
            &["outcome"],
        )?;
        let candidate_listings = IntCounterVec::new(
            Opts::new(
                "voting_bridge_candidate_listings_total",
                "Successful candidate listings by retrieval strategy",
            ),
            &["strategy"],
        )?;
        registry.register(Box::new(votes.clone()))?;
        registry.register(Box::new(candidate_listings.clone()))?;

        Ok(Self {
            registry,
            votes,
            candidate_listings,
        })
    }

    /// `outcome` is `confirmed` or the error category.
    pub fn record_vote(&self, result: Result<(), &BridgeError>) {
        let outcome = match result {
            Ok(()) => "confirmed",
            Err(err) => err.category(),
        };
        self.votes.with_label_values(&[outcome]).inc();
    }

    pub fn record_listing(&self, strategy: RetrievalStrategy) {
        self.candidate_listings
            .with_label_values(&[strategy.as_str()])
            .inc();
    }
}

async fn metrics_handler(State(metrics): State<Metrics>) -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];

    // Gather the metrics.
    let metric_families = metrics.registry.gather();
    // Encode them to send.
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => ([("content-type", encoder.format_type().to_string())], buffer).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}
