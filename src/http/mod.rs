use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;

use crate::metrics::Metrics;
use crate::pipeline::RequestPipeline;
use crate::retrieval::Retriever;

pub mod health;
pub mod metrics;
pub mod query;

pub struct AppState {
    pub pipeline: RequestPipeline,
    pub retriever: Box<dyn Retriever>,
    pub metrics: Arc<Metrics>,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/metrics", get(metrics::metrics))
        .route("/query", post(query::query))
        .layer(middleware::from_fn_with_state(state.clone(), track_request))
        .with_state(state)
}

/// Measures every request and feeds the recorder on the way out, whatever
/// the outcome.
async fn track_request(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let endpoint = endpoint_label(request.uri().path());
    state.metrics.inc_active();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = if response.status().is_client_error() || response.status().is_server_error() {
        "error"
    } else {
        "success"
    };
    state
        .metrics
        .record_request(endpoint, status, started.elapsed().as_secs_f64());
    state.metrics.dec_active();
    response
}

// Fixed label set; raw paths would blow up metric cardinality.
fn endpoint_label(path: &str) -> &'static str {
    match path {
        "/query" => "query",
        "/health" => "health",
        "/metrics" => "metrics",
        "/" => "root",
        _ => "unknown",
    }
}
