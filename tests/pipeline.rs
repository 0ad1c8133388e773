//! End-to-end pipeline tests against a mock generation provider.
//!
//! A local wiremock server emulates the OpenAI chat-completions endpoint so
//! the full HTTP request path is exercised without a real API. Coverage:
//! cache miss then hit, tier routing on the wire, provider failure leaving
//! the cache unpopulated, unusable provider payloads, and a dead cache
//! backend degrading to plain generation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ragserve::cache::{CacheKey, CacheStore, MemoryCache};
use ragserve::config::{Config, ModelPricing, TierConfig};
use ragserve::error::CacheError;
use ragserve::llm::OpenAiGenerator;
use ragserve::metrics::Metrics;
use ragserve::pipeline::RequestPipeline;
use ragserve::router::ModelRouter;
use ragserve::tracking::{ExperimentTracker, TracingTracker};
use ragserve::types::QueryResponse;

fn test_config(base_url: &str) -> Config {
    Config {
        openai_api_key: "sk-test".into(),
        openai_base_url: base_url.into(),
        redis_url: None,
        cache_ttl_secs: 3600,
        premium: TierConfig {
            model: "gpt-4".into(),
            pricing: ModelPricing {
                input_per_1k: 0.03,
                output_per_1k: 0.06,
            },
        },
        economy: TierConfig {
            model: "gpt-3.5-turbo".into(),
            pricing: ModelPricing {
                input_per_1k: 0.0005,
                output_per_1k: 0.0015,
            },
        },
        bind_addr: "127.0.0.1:0".into(),
    }
}

fn build_pipeline(base_url: &str, cache: Arc<dyn CacheStore>) -> (RequestPipeline, Arc<Metrics>) {
    let metrics = Arc::new(Metrics::new().unwrap());
    let tracker: Arc<dyn ExperimentTracker> = Arc::new(TracingTracker);
    let generator = Arc::new(OpenAiGenerator::new(&test_config(base_url), tracker));
    let pipeline = RequestPipeline::new(
        cache,
        ModelRouter,
        generator,
        Arc::clone(&metrics),
        Duration::from_secs(3600),
    );
    (pipeline, metrics)
}

fn completion_body(model: &str, answer: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test-001",
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": answer },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 120,
            "completion_tokens": 40,
            "total_tokens": 160
        }
    })
}

fn default_chunks() -> Vec<String> {
    vec![
        "DB-SI 4: Los extintores se colocan a 1.20m de altura.".to_string(),
        "DB-SI 4: Deben estar señalizados con carteles fotoluminiscentes.".to_string(),
    ]
}

#[tokio::test]
async fn cache_miss_then_hit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "gpt-3.5-turbo",
            "Los extintores se colocan a 1,20 m del suelo (DB-SI 4).",
        )))
        // The second, identical request must be served from the cache.
        .expect(1)
        .mount(&server)
        .await;

    let (pipeline, metrics) = build_pipeline(&server.uri(), Arc::new(MemoryCache::new()));
    let query = "¿A qué altura se ponen los extintores?";
    let chunks = default_chunks();

    let first = pipeline.handle(query, &chunks).await.unwrap();
    assert_eq!(first.metadata.source.as_deref(), Some("live"));
    assert_eq!(first.metadata.model, "gpt-3.5-turbo");
    assert_eq!(first.metrics.tokens, 160);
    assert!(first.metrics.cost_usd > 0.0);
    assert!(!first.metadata.run_id.is_empty());

    let second = pipeline.handle(query, &chunks).await.unwrap();
    assert_eq!(second.metadata.source.as_deref(), Some("cache"));
    assert_eq!(second.answer, first.answer);
    assert_eq!(second.metadata.run_id, first.metadata.run_id);

    let exposition = metrics.render();
    assert!(exposition.contains("rag_cache_misses_total 1"));
    assert!(exposition.contains("rag_cache_hits_total 1"));
    assert!(exposition.contains(r#"model_routing_total{model="gpt-3.5-turbo"} 1"#));
}

#[tokio::test]
async fn complexity_keyword_reaches_provider_on_premium_model() {
    let server = MockServer::start().await;
    // Only a request carrying the premium model id matches; a mis-routed
    // call falls through to wiremock's 404 and fails the assertions below.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-4" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("gpt-4", "Comparación de ambos casos...")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (pipeline, _metrics) = build_pipeline(&server.uri(), Arc::new(MemoryCache::new()));
    let response = pipeline
        .handle("compara estos dos casos", &default_chunks())
        .await
        .unwrap();

    assert_eq!(response.metadata.model, "gpt-4");
    assert_eq!(response.metadata.source.as_deref(), Some("live"));
}

#[tokio::test]
async fn provider_failure_leaves_cache_unpopulated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        // Both calls must reach the provider: a failure never populates
        // the cache, so the retry cannot be a hit.
        .expect(2)
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryCache::new());
    let (pipeline, metrics) = build_pipeline(&server.uri(), cache);
    let query = "¿A qué altura se ponen los extintores?";
    let chunks = default_chunks();

    let first = pipeline.handle(query, &chunks).await;
    let err = first.unwrap_err();
    assert!(err.to_string().contains("500"));

    let second = pipeline.handle(query, &chunks).await;
    assert!(second.is_err());

    assert!(metrics.render().contains("rag_cache_misses_total 2"));
}

#[tokio::test]
async fn empty_choices_is_an_unusable_response() {
    let server = MockServer::start().await;
    let body = json!({
        "id": "chatcmpl-test-002",
        "object": "chat.completion",
        "model": "gpt-3.5-turbo",
        "choices": [],
        "usage": { "prompt_tokens": 10, "completion_tokens": 0, "total_tokens": 10 }
    });
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let (pipeline, _metrics) = build_pipeline(&server.uri(), Arc::new(MemoryCache::new()));
    let err = pipeline
        .handle("¿qué dice el DB-SI?", &default_chunks())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unusable response"));
}

/// Cache backend that fails every operation, standing in for an unreachable
/// Redis.
struct FailingCache;

fn backend_down() -> CacheError {
    serde_json::from_str::<serde_json::Value>("not json")
        .unwrap_err()
        .into()
}

#[async_trait]
impl CacheStore for FailingCache {
    async fn get(&self, _key: &CacheKey) -> Result<Option<QueryResponse>, CacheError> {
        Err(backend_down())
    }

    async fn set(
        &self,
        _key: &CacheKey,
        _entry: &QueryResponse,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Err(backend_down())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        Err(backend_down())
    }
}

#[tokio::test]
async fn unreachable_cache_degrades_to_generation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "gpt-3.5-turbo",
            "Respuesta generada sin caché.",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let (pipeline, _metrics) = build_pipeline(&server.uri(), Arc::new(FailingCache));
    let response = pipeline
        .handle("¿A qué altura se ponen los extintores?", &default_chunks())
        .await
        .unwrap();

    assert_eq!(response.metadata.source.as_deref(), Some("live"));
    assert_eq!(response.answer, "Respuesta generada sin caché.");
}
