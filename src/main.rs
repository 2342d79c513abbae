mod config;
mod corpus;
mod embeddings;
mod error;
mod extract;
mod index;
mod logging;
mod matcher;
mod server;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use crate::embeddings::download::ensure_model_files;
use crate::embeddings::engine::EmbeddingEngine;
use crate::index::EmbeddingIndex;
use crate::matcher::Matcher;
use crate::server::AppState;

fn main() {
    if let Err(e) = real_main() {
        // Keep stderr noisy for bug reports; logs also go to file.
        eprintln!("[kural-match] fatal error: {e:?}");
        log::error!("Fatal error: {:?}", e);
        std::process::exit(1);
    }
}

#[tokio::main]
async fn real_main() -> anyhow::Result<()> {
    logging::init_logging()?;

    let state = Arc::new(AppState::new());

    // Download, load, and embed in the background; the server binds right
    // away and answers 503 until the ready state is published.
    let init_state = state.clone();
    tokio::task::spawn_blocking(move || match build_ready_state() {
        Ok(matcher) => init_state.set_ready(Arc::new(matcher)),
        Err(e) => {
            eprintln!("[kural-match] startup failed: {e:?}");
            log::error!("Startup failed: {:?}", e);
            std::process::exit(1);
        }
    });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(config::server::DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log::info!("Listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, server::router(state))
        .await
        .context("server error")?;

    Ok(())
}

/// Blocking startup phase: corpus download + load, model download + load,
/// embedding generation, index build. Runs exactly once per process.
fn build_ready_state() -> anyhow::Result<Matcher> {
    let corpus_path = corpus::ensure_corpus_file()?;
    let records = corpus::load_corpus(&corpus_path)?;

    let model_dir = ensure_model_files()?;
    let engine = EmbeddingEngine::load(&model_dir)?;

    let texts: Vec<String> = records.iter().map(corpus::embeddable_text).collect();
    log::info!("Generating embeddings for {} kurals...", texts.len());
    let vectors = engine.embed_all(&texts)?;
    let embedding_index = EmbeddingIndex::from_vectors(vectors)?;

    log::info!("Embeddings ready; accepting match requests");
    Ok(Matcher::from_parts(records, embedding_index, Box::new(engine)))
}
