//! Request-level error taxonomy.
//!
//! Every failure a caller can see falls into one of three kinds, each with a
//! machine-distinguishable `kind` string and a human-readable message. Startup
//! plumbing (downloads, model load) uses `anyhow` instead; those errors are
//! fatal and never reach a request.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchError {
    /// Corpus/model/index still loading. Recoverable: the caller retries later.
    #[error("service is still loading the corpus and embedding model")]
    NotReady,

    /// Neither `text` nor `url` was supplied. Terminal for the request.
    #[error("request must include either 'text' or 'url'")]
    MissingInput,

    /// Network error, bad HTTP status, or insufficient text from a URL,
    /// collapsed into one kind with a descriptive reason.
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    /// Unexpected inference failure. Not part of the client-facing taxonomy;
    /// surfaces as a plain 500.
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl MatchError {
    /// Stable machine-readable kind, independent of the display message.
    pub fn kind(&self) -> &'static str {
        match self {
            MatchError::NotReady => "not_ready",
            MatchError::MissingInput => "invalid_input",
            MatchError::ExtractionFailed(_) => "extraction_failed",
            MatchError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for MatchError {
    fn into_response(self) -> Response {
        let status = match &self {
            MatchError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            MatchError::MissingInput => StatusCode::BAD_REQUEST,
            MatchError::ExtractionFailed(_) => StatusCode::BAD_REQUEST,
            MatchError::Internal(e) => {
                log::error!("Internal error handling request: {e:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings_are_stable() {
        assert_eq!(MatchError::NotReady.kind(), "not_ready");
        assert_eq!(MatchError::MissingInput.kind(), "invalid_input");
        assert_eq!(MatchError::ExtractionFailed("x".into()).kind(), "extraction_failed");
    }

    #[test]
    fn test_extraction_message_carries_reason() {
        let e = MatchError::ExtractionFailed("HTTP 404 fetching https://x".into());
        assert!(e.to_string().contains("HTTP 404"));
    }
}
