use serde::{Deserialize, Serialize};

// ============================
// Wire & domain types
// ============================

fn default_top_k() -> usize {
    5
}

/// Inbound question. `top_k` caps how many context chunks the retrieval
/// collaborator hands back.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// Per-answer measurements surfaced to the caller and stored with the
/// cached entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerMetrics {
    pub latency_ms: f64,
    pub cost_usd: f64,
    pub tokens: u64,
}

/// Provenance of an answer. `source` is filled in by the pipeline when it
/// responds ("cache" or "live") and left out of stored entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerMetadata {
    pub model: String,
    pub prompt_version: String,
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// The answer payload for one query. This is both the wire shape of
/// `POST /query` and the value the cache stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub metrics: AnswerMetrics,
    pub metadata: AnswerMetadata,
}
