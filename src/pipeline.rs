//! Request orchestration: cache lookup, tier routing, generation, metrics,
//! cache population.
//!
//! The pipeline holds no per-request state, so any number of requests may run
//! through it concurrently. Two identical concurrent requests can both miss
//! and both generate; the second write simply overwrites the first.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::cache::{derive_key, CacheStore};
use crate::error::GenerationError;
use crate::llm::Generator;
use crate::metrics::Metrics;
use crate::prompts;
use crate::router::ModelRouter;
use crate::types::{AnswerMetadata, AnswerMetrics, QueryResponse};

pub struct RequestPipeline {
    cache: Arc<dyn CacheStore>,
    router: ModelRouter,
    generator: Arc<dyn Generator>,
    metrics: Arc<Metrics>,
    cache_ttl: Duration,
}

impl RequestPipeline {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        router: ModelRouter,
        generator: Arc<dyn Generator>,
        metrics: Arc<Metrics>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            router,
            generator,
            metrics,
            cache_ttl,
        }
    }

    /// Answer one query. Cache errors degrade to a miss; generation errors
    /// surface to the caller and leave the cache untouched.
    pub async fn handle(
        &self,
        query: &str,
        context_chunks: &[String],
    ) -> Result<QueryResponse, GenerationError> {
        let key = derive_key(query, context_chunks);

        // A dead cache must not take generation down with it.
        let cached = match self.cache.get(&key).await {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "cache lookup failed, treating as miss");
                None
            }
        };

        if let Some(mut entry) = cached {
            self.metrics.record_cache_outcome(true);
            info!(query, "cache_hit");
            entry.metadata.source = Some("cache".into());
            return Ok(entry);
        }
        self.metrics.record_cache_outcome(false);

        let tier = self.router.route(query, context_chunks);
        let model = self.generator.model_id(tier);
        self.metrics.record_routing(model);
        info!(model, query, "model_selected");

        let result = match self.generator.generate(query, context_chunks, tier).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "rag_generation_failed");
                return Err(err);
            }
        };

        self.metrics.record_generation(
            &result.model,
            result.input_tokens,
            result.output_tokens,
            result.cost_usd,
        );

        let mut response = QueryResponse {
            answer: result.answer,
            metrics: AnswerMetrics {
                latency_ms: result.latency_ms,
                cost_usd: result.cost_usd,
                tokens: result.total_tokens,
            },
            metadata: AnswerMetadata {
                model: result.model,
                prompt_version: prompts::PROMPT_VERSION.into(),
                run_id: result.run_id,
                source: None,
            },
        };

        // The answer is already in hand; a failed write only costs the next
        // identical request a regeneration.
        if let Err(err) = self.cache.set(&key, &response, self.cache_ttl).await {
            warn!(error = %err, "cache write failed");
        }

        response.metadata.source = Some("live".into());
        Ok(response)
    }
}
