use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ragserve::cache::{CacheStore, MemoryCache, RedisCache};
use ragserve::config::Config;
use ragserve::http::{app, AppState};
use ragserve::llm::OpenAiGenerator;
use ragserve::metrics::Metrics;
use ragserve::pipeline::RequestPipeline;
use ragserve::retrieval::StaticRetriever;
use ragserve::router::ModelRouter;
use ragserve::tracking::TracingTracker;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let cache: Arc<dyn CacheStore> = match &config.redis_url {
        Some(url) => {
            info!("using redis answer cache");
            Arc::new(RedisCache::open(url)?)
        }
        None => {
            info!("REDIS_URL not set, using in-process answer cache");
            Arc::new(MemoryCache::new())
        }
    };

    let metrics = Arc::new(Metrics::new()?);
    let tracker = Arc::new(TracingTracker);
    let generator = Arc::new(OpenAiGenerator::new(&config, tracker));
    let pipeline = RequestPipeline::new(
        cache,
        ModelRouter,
        generator,
        Arc::clone(&metrics),
        Duration::from_secs(config.cache_ttl_secs),
    );

    let state = Arc::new(AppState {
        pipeline,
        retriever: Box::new(StaticRetriever::with_default_corpus()),
        metrics,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "ragserve listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
