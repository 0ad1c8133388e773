//! Prometheus metrics for the request pipeline.
//!
//! All counters and the histogram live in an owned [`Registry`] built once at
//! startup and shared through `Arc`, so tests can run side by side without
//! colliding on process-global state. Recording never fails and never alters
//! control flow; the only non-monotonic series is the in-flight gauge.

use prometheus::{
    Counter, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    IntGaugeVec, Opts, Registry, TextEncoder,
};
use tracing::warn;

/// Fixed latency buckets in seconds.
const LATENCY_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.0, 5.0, 10.0];

pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    request_latency: HistogramVec,
    llm_tokens: IntCounterVec,
    llm_cost_usd: Counter,
    active_requests: IntGauge,
    cache_hits: IntCounter,
    cache_misses: IntCounter,
    model_routing: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("rag_requests_total", "Total number of RAG requests"),
            &["endpoint", "status"],
        )?;
        registry.register(Box::new(requests.clone()))?;

        let request_latency = HistogramVec::new(
            HistogramOpts::new("rag_request_latency_seconds", "Request latency in seconds")
                .buckets(LATENCY_BUCKETS.to_vec()),
            &["endpoint"],
        )?;
        registry.register(Box::new(request_latency.clone()))?;

        let llm_tokens = IntCounterVec::new(
            Opts::new("llm_tokens_total", "Total tokens consumed"),
            &["model", "type"],
        )?;
        registry.register(Box::new(llm_tokens.clone()))?;

        let llm_cost_usd = Counter::new("llm_cost_usd_total", "Total cost in USD")?;
        registry.register(Box::new(llm_cost_usd.clone()))?;

        let active_requests = IntGauge::new(
            "rag_active_requests",
            "Number of requests currently being processed",
        )?;
        registry.register(Box::new(active_requests.clone()))?;

        let cache_hits = IntCounter::new("rag_cache_hits_total", "Number of cache hits")?;
        registry.register(Box::new(cache_hits.clone()))?;

        let cache_misses = IntCounter::new("rag_cache_misses_total", "Number of cache misses")?;
        registry.register(Box::new(cache_misses.clone()))?;

        let model_routing = IntCounterVec::new(
            Opts::new("model_routing_total", "Model routing decisions"),
            &["model"],
        )?;
        registry.register(Box::new(model_routing.clone()))?;

        let app_info = IntGaugeVec::new(
            Opts::new("rag_app_info", "RAG application info"),
            &["name", "version"],
        )?;
        registry.register(Box::new(app_info.clone()))?;
        app_info
            .with_label_values(&[env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")])
            .set(1);

        Ok(Self {
            registry,
            requests,
            request_latency,
            llm_tokens,
            llm_cost_usd,
            active_requests,
            cache_hits,
            cache_misses,
            model_routing,
        })
    }

    /// One finished request: count by endpoint/status, observe latency.
    pub fn record_request(&self, endpoint: &str, status: &str, duration_secs: f64) {
        self.requests.with_label_values(&[endpoint, status]).inc();
        self.request_latency
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }

    pub fn inc_active(&self) {
        self.active_requests.inc();
    }

    pub fn dec_active(&self) {
        self.active_requests.dec();
    }

    /// Token and cost accounting for one generation call.
    pub fn record_generation(
        &self,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
        cost_usd: f64,
    ) {
        self.llm_tokens
            .with_label_values(&[model, "input"])
            .inc_by(input_tokens);
        self.llm_tokens
            .with_label_values(&[model, "output"])
            .inc_by(output_tokens);
        if cost_usd.is_finite() && cost_usd >= 0.0 {
            self.llm_cost_usd.inc_by(cost_usd);
        }
    }

    pub fn record_cache_outcome(&self, hit: bool) {
        if hit {
            self.cache_hits.inc();
        } else {
            self.cache_misses.inc();
        }
    }

    pub fn record_routing(&self, model: &str) {
        self.model_routing.with_label_values(&[model]).inc();
    }

    /// Text exposition of everything in the registry.
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(err) = encoder.encode(&self.registry.gather(), &mut buf) {
            warn!(error = %err, "metrics encoding failed");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_exposes_contract_metric_names() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("query", "success", 0.2);
        metrics.record_generation("gpt-3.5-turbo", 100, 50, 0.000125);
        metrics.record_cache_outcome(true);
        metrics.record_cache_outcome(false);
        metrics.record_routing("gpt-4");

        let out = metrics.render();
        assert!(out.contains("rag_requests_total"));
        assert!(out.contains("rag_request_latency_seconds"));
        assert!(out.contains("llm_tokens_total"));
        assert!(out.contains("llm_cost_usd_total"));
        assert!(out.contains("rag_active_requests"));
        assert!(out.contains("rag_cache_hits_total 1"));
        assert!(out.contains("rag_cache_misses_total 1"));
        assert!(out.contains("model_routing_total"));
        assert!(out.contains("rag_app_info"));
    }

    #[test]
    fn token_counters_accumulate_by_direction() {
        let metrics = Metrics::new().unwrap();
        metrics.record_generation("gpt-4", 70, 30, 0.0039);
        metrics.record_generation("gpt-4", 30, 20, 0.0021);

        let out = metrics.render();
        assert!(out.contains(r#"llm_tokens_total{model="gpt-4",type="input"} 100"#));
        assert!(out.contains(r#"llm_tokens_total{model="gpt-4",type="output"} 50"#));
    }

    #[test]
    fn gauge_tracks_in_flight_requests() {
        let metrics = Metrics::new().unwrap();
        metrics.inc_active();
        metrics.inc_active();
        metrics.dec_active();
        assert!(metrics.render().contains("rag_active_requests 1"));
    }
}
