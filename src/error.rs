use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failures talking to the generation provider. Fatal to the request that
/// triggered them; there is no retry.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The HTTP call itself failed (connect, TLS, body transfer).
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned HTTP {status}: {detail}")]
    Api { status: u16, detail: String },

    /// The provider answered 200 but the payload was unusable.
    #[error("provider returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// Failures talking to the cache backend. Never fatal: the pipeline treats
/// them as a miss and generates.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("corrupt cache entry: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// What the HTTP layer sends back when a request cannot be served.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_api_error_display() {
        let err = GenerationError::Api {
            status: 429,
            detail: "quota exceeded".into(),
        };
        assert_eq!(
            err.to_string(),
            "provider returned HTTP 429: quota exceeded"
        );
    }

    #[test]
    fn invalid_response_display() {
        let err = GenerationError::InvalidResponse("no choices in completion".into());
        assert_eq!(
            err.to_string(),
            "provider returned an unusable response: no choices in completion"
        );
    }

    #[test]
    fn corrupt_cache_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: CacheError = serde_err.into();
        assert!(err.to_string().starts_with("corrupt cache entry:"));
    }
}
