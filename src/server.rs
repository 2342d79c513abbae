// server.rs — Thin axum surface over the match engine.
//
// One real endpoint (`POST /analyze`) plus health and static assets. The
// ready state sits behind a `OnceLock`: requests that arrive before the
// startup task finishes observe an explicit not-ready sentinel instead of
// partially initialized globals.

use std::sync::{Arc, OnceLock};

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::services::{ServeDir, ServeFile};

use crate::config;
use crate::error::MatchError;
use crate::matcher::{MatchResult, Matcher};

#[derive(Default)]
pub struct AppState {
    ready: OnceLock<Arc<Matcher>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            ready: OnceLock::new(),
        }
    }

    /// Publish the ready state. Called exactly once, by the startup task.
    pub fn set_ready(&self, matcher: Arc<Matcher>) {
        if self.ready.set(matcher).is_err() {
            log::warn!("set_ready called more than once; keeping the first value");
        }
    }

    fn matcher(&self) -> Result<Arc<Matcher>, MatchError> {
        self.ready.get().cloned().ok_or(MatchError::NotReady)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.get().is_some()
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = ServeDir::new(config::server::STATIC_DIR);
    let index_page = ServeFile::new(format!("{}/index.html", config::server::STATIC_DIR));

    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route_service("/", index_page)
        .nest_service("/static", static_dir)
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "version": config::SERVICE_VERSION,
        "ready": state.is_ready(),
        // null until the corpus is loaded
        "kurals": state.ready.get().map(|m| m.corpus_len()),
    }))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<MatchResult>, MatchError> {
    let matcher = state.matcher()?;

    // The URL fetch and candle inference are blocking; keep them off the
    // async workers.
    let result = tokio::task::spawn_blocking(move || {
        matcher.find_match(req.text.as_deref(), req.url.as_deref())
    })
    .await
    .map_err(|e| MatchError::Internal(anyhow::anyhow!("match task failed: {e}")))??;

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusRecord;
    use crate::matcher::test_support::TrigramEmbedder;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn ready_state() -> Arc<AppState> {
        let records: Vec<CorpusRecord> = [
            json!({"Number": 1, "Translation": "patience is strength", "explanation": "endurance wins"}),
            json!({"Number": 2, "Translation": "speak kindly", "explanation": "words matter"}),
        ]
        .into_iter()
        .map(|v| match v {
            Value::Object(m) => CorpusRecord::new(m),
            _ => unreachable!(),
        })
        .collect();

        let matcher = Matcher::build(records, Box::new(TrigramEmbedder)).unwrap();
        let state = Arc::new(AppState::new());
        state.set_ready(Arc::new(matcher));
        state
    }

    #[tokio::test]
    async fn test_analyze_before_ready_is_503() {
        let server = TestServer::new(router(Arc::new(AppState::new()))).unwrap();
        let resp = server
            .post("/analyze")
            .json(&json!({"text": "anything"}))
            .await;
        assert_eq!(resp.status_code(), 503);
        let body: Value = resp.json();
        assert_eq!(body["error"]["kind"], "not_ready");
    }

    #[tokio::test]
    async fn test_analyze_without_text_or_url_is_400() {
        let server = TestServer::new(router(ready_state())).unwrap();
        let resp = server.post("/analyze").json(&json!({})).await;
        assert_eq!(resp.status_code(), 400);
        let body: Value = resp.json();
        assert_eq!(body["error"]["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn test_analyze_returns_best_match_fields() {
        let server = TestServer::new(router(ready_state())).unwrap();
        let resp = server
            .post("/analyze")
            .json(&json!({"text": "be patient and strong"}))
            .await;
        assert_eq!(resp.status_code(), 200);
        let body: Value = resp.json();
        assert_eq!(body["number"], json!(1));
        assert_eq!(body["eng"], json!("patience is strength"));
        // Fields absent from the record render as null.
        assert_eq!(body["line1"], Value::Null);
    }

    #[tokio::test]
    async fn test_analyze_bad_url_is_extraction_failure() {
        let server = TestServer::new(router(ready_state())).unwrap();
        let resp = server
            .post("/analyze")
            .json(&json!({"url": "http://127.0.0.1:9/"}))
            .await;
        assert_eq!(resp.status_code(), 400);
        let body: Value = resp.json();
        assert_eq!(body["error"]["kind"], "extraction_failed");
    }

    #[tokio::test]
    async fn test_health_reports_readiness() {
        let server = TestServer::new(router(Arc::new(AppState::new()))).unwrap();
        let body: Value = server.get("/health").await.json();
        assert_eq!(body["ready"], json!(false));

        let server = TestServer::new(router(ready_state())).unwrap();
        let body: Value = server.get("/health").await.json();
        assert_eq!(body["ready"], json!(true));
        assert_eq!(body["version"], json!(config::SERVICE_VERSION));
    }
}
