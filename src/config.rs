//! Loads runtime configuration for the ragserve service by reading required
//! environment variables, applying sensible defaults, and exposing the values
//! through the strongly typed `Config` struct.
use anyhow::{Context, Result};
use dotenvy::dotenv;

/// Price per 1000 tokens, split by direction. The rates are fixed per tier;
/// only the model identifiers are configurable.
#[derive(Debug, Clone)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

/// One generation tier: the model it resolves to and what that model costs.
#[derive(Debug, Clone)]
pub struct TierConfig {
    pub model: String,
    pub pricing: ModelPricing,
}

#[derive(Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    /// Unset means no Redis: the service falls back to an in-process cache.
    pub redis_url: Option<String>,
    pub cache_ttl_secs: u64,
    pub premium: TierConfig,
    pub economy: TierConfig,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present
        let openai_api_key =
            std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is required")?;
        let openai_base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let redis_url = std::env::var("REDIS_URL").ok();
        let cache_ttl_secs: u64 = std::env::var("CACHE_TTL_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .context("CACHE_TTL_SECS must be an integer number of seconds")?;
        let premium_model = std::env::var("PREMIUM_MODEL").unwrap_or_else(|_| "gpt-4".into());
        let economy_model =
            std::env::var("ECONOMY_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".into());
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());

        Ok(Config {
            openai_api_key,
            openai_base_url,
            redis_url,
            cache_ttl_secs,
            premium: TierConfig {
                model: premium_model,
                pricing: ModelPricing {
                    input_per_1k: 0.03,
                    output_per_1k: 0.06,
                },
            },
            economy: TierConfig {
                model: economy_model,
                pricing: ModelPricing {
                    input_per_1k: 0.0005,
                    output_per_1k: 0.0015,
                },
            },
            bind_addr,
        })
    }
}
