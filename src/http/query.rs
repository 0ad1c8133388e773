use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use tracing::{error, info};

use super::AppState;
use crate::error::ApiError;
use crate::types::{QueryRequest, QueryResponse};

pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    if body.query.trim().is_empty() {
        return Err(ApiError::Validation("query must not be empty".into()));
    }
    info!(query = %body.query, "request_received");

    let context_chunks = state.retriever.retrieve(&body.query, body.top_k);

    match state.pipeline.handle(&body.query, &context_chunks).await {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            error!(error = %err, "query_failed");
            Err(err.into())
        }
    }
}
