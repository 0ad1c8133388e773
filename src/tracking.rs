//! Experiment-tracking collaborator.
//!
//! Generation calls are correlated with an external audit trail through an
//! opaque run identifier. Tracking is observability only: implementations
//! are infallible by signature and must never influence whether a request
//! succeeds.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

#[async_trait]
pub trait ExperimentTracker: Send + Sync {
    /// Open a run and return its identifier.
    async fn start_run(&self, name: &str) -> String;

    async fn log_param(&self, run_id: &str, key: &str, value: &str);

    async fn log_metric(&self, run_id: &str, key: &str, value: f64);

    /// Attach a text artifact (prompts, responses) to the run.
    async fn log_text(&self, run_id: &str, name: &str, content: &str);
}

/// Tracker that emits runs as structured log events. Stands in for a remote
/// tracking backend; the run ids it hands out are valid correlation tokens
/// either way.
#[derive(Debug, Default)]
pub struct TracingTracker;

#[async_trait]
impl ExperimentTracker for TracingTracker {
    async fn start_run(&self, name: &str) -> String {
        let run_id = Uuid::new_v4().to_string();
        debug!(run = name, run_id = %run_id, "experiment run started");
        run_id
    }

    async fn log_param(&self, run_id: &str, key: &str, value: &str) {
        debug!(run_id, key, value, "experiment param");
    }

    async fn log_metric(&self, run_id: &str, key: &str, value: f64) {
        debug!(run_id, key, value, "experiment metric");
    }

    async fn log_text(&self, run_id: &str, name: &str, content: &str) {
        debug!(run_id, name, content_len = content.len(), "experiment artifact");
    }
}
