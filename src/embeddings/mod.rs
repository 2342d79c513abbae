// embeddings/ — Local sentence embedding using candle (pure Rust).
//
// Provides:
// - Model download + SHA256 verification
// - BERT inference with attention-mask-aware mean pooling
// - The `TextEmbedder` seam the index and tests program against

pub mod download;
pub mod engine;

/// Anything that can turn text into a fixed-dimensionality vector.
///
/// The corpus and every query must go through the *same* embedder so that
/// preprocessing and tokenization are identical on both sides; embedding
/// asymmetry between query and corpus vectors silently ruins ranking.
pub trait TextEmbedder: Send + Sync {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}
