//! Generation client for the OpenAI chat-completions API.
//!
//! [`OpenAiGenerator`] owns the tier-to-model mapping and the pricing table,
//! builds prompts from the retrieved context, measures the call, and reports
//! every run to the experiment tracker. One failed call is one failed
//! request: there is no retry and no timeout here.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{Config, ModelPricing, TierConfig};
use crate::error::GenerationError;
use crate::prompts;
use crate::router::Tier;
use crate::tracking::ExperimentTracker;

const TEMPERATURE: f64 = 0.3;
const MAX_TOKENS: u32 = 1000;
const SYSTEM_ROLE: &str = "cte_expert";

/// One completed generation call.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub answer: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
    pub latency_ms: f64,
    pub model: String,
    pub run_id: String,
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier the given tier resolves to.
    fn model_id(&self, tier: Tier) -> &str;

    async fn generate(
        &self,
        query: &str,
        context_chunks: &[String],
        tier: Tier,
    ) -> Result<GenerationResult, GenerationError>;
}

/// Price of one call from the per-1000-token rates.
pub fn compute_cost(pricing: &ModelPricing, input_tokens: u64, output_tokens: u64) -> f64 {
    input_tokens as f64 / 1000.0 * pricing.input_per_1k
        + output_tokens as f64 / 1000.0 * pricing.output_per_1k
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

pub struct OpenAiGenerator {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    premium: TierConfig,
    economy: TierConfig,
    tracker: Arc<dyn ExperimentTracker>,
}

impl OpenAiGenerator {
    pub fn new(config: &Config, tracker: Arc<dyn ExperimentTracker>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            premium: config.premium.clone(),
            economy: config.economy.clone(),
            tracker,
        }
    }

    fn tier_config(&self, tier: Tier) -> &TierConfig {
        match tier {
            Tier::Premium => &self.premium,
            Tier::Economy => &self.economy,
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn model_id(&self, tier: Tier) -> &str {
        &self.tier_config(tier).model
    }

    async fn generate(
        &self,
        query: &str,
        context_chunks: &[String],
        tier: Tier,
    ) -> Result<GenerationResult, GenerationError> {
        let tier_config = self.tier_config(tier);
        let model = tier_config.model.as_str();

        let run_id = self.tracker.start_run(&format!("api_query_{model}")).await;
        self.tracker
            .log_param(&run_id, "prompt_version", prompts::PROMPT_VERSION)
            .await;
        self.tracker
            .log_param(&run_id, "prompt_updated", prompts::PROMPT_LAST_UPDATED)
            .await;
        self.tracker.log_param(&run_id, "model", model).await;
        self.tracker
            .log_param(&run_id, "temperature", &TEMPERATURE.to_string())
            .await;
        self.tracker
            .log_param(&run_id, "num_chunks", &context_chunks.len().to_string())
            .await;

        let system_prompt = prompts::system_prompt(SYSTEM_ROLE);
        let user_prompt = prompts::render_user_prompt(context_chunks, query);
        self.tracker
            .log_text(&run_id, "system_prompt.txt", system_prompt)
            .await;
        self.tracker
            .log_text(&run_id, "final_prompt.txt", &user_prompt)
            .await;

        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        debug!(model, tier = tier.as_str(), "calling generation provider");
        let started = Instant::now();
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(
                model,
                status = status.as_u16(),
                "generation provider rejected the call"
            );
            return Err(GenerationError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| GenerationError::InvalidResponse(err.to_string()))?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let answer = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("no choices in completion".into()))?;
        let usage = body
            .usage
            .ok_or_else(|| GenerationError::InvalidResponse("no usage in completion".into()))?;

        let cost_usd = compute_cost(
            &tier_config.pricing,
            usage.prompt_tokens,
            usage.completion_tokens,
        );

        self.tracker
            .log_metric(&run_id, "latency_ms", latency_ms)
            .await;
        self.tracker
            .log_metric(&run_id, "total_tokens", usage.total_tokens as f64)
            .await;
        self.tracker.log_metric(&run_id, "cost_usd", cost_usd).await;
        self.tracker.log_text(&run_id, "response.txt", &answer).await;

        info!(
            query,
            prompt_version = prompts::PROMPT_VERSION,
            latency_ms,
            cost_usd,
            "rag_generation_complete"
        );

        Ok(GenerationResult {
            answer,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            cost_usd,
            latency_ms,
            model: model.to_string(),
            run_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn premium_pricing() -> ModelPricing {
        ModelPricing {
            input_per_1k: 0.03,
            output_per_1k: 0.06,
        }
    }

    fn economy_pricing() -> ModelPricing {
        ModelPricing {
            input_per_1k: 0.0005,
            output_per_1k: 0.0015,
        }
    }

    #[test]
    fn cost_is_never_negative() {
        assert_eq!(compute_cost(&premium_pricing(), 0, 0), 0.0);
        assert!(compute_cost(&economy_pricing(), 1, 0) >= 0.0);
    }

    #[test]
    fn cost_grows_with_token_counts() {
        let pricing = premium_pricing();
        let base = compute_cost(&pricing, 100, 50);
        assert!(compute_cost(&pricing, 101, 50) > base);
        assert!(compute_cost(&pricing, 100, 51) > base);
    }

    #[test]
    fn premium_rates_exceed_economy_rates() {
        let premium = compute_cost(&premium_pricing(), 1000, 1000);
        let economy = compute_cost(&economy_pricing(), 1000, 1000);
        assert!(premium > economy);
    }

    #[test]
    fn cost_matches_published_rates() {
        // 1000 input + 1000 output on premium: 0.03 + 0.06
        let premium = compute_cost(&premium_pricing(), 1000, 1000);
        assert!((premium - 0.09).abs() < 1e-12);

        let economy = compute_cost(&economy_pricing(), 2000, 0);
        assert!((economy - 0.001).abs() < 1e-12);
    }
}
