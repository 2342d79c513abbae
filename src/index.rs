// index.rs — In-memory embedding index over the corpus.
//
// One vector per corpus text, same ordinal position; the ordinal is the join
// key back to the record. Built once at startup, read-only afterwards. At
// ~1330 vectors of 384 dims a single-pass scan is faster than any ANN
// structure would ever pay for itself.

use anyhow::bail;

use crate::embeddings::TextEmbedder;

/// The winning ordinal and its cosine similarity to the query.
#[derive(Debug, Clone, Copy)]
pub struct BestMatch {
    pub ordinal: usize,
    pub score: f32,
}

/// Ordered embedding vectors for the whole corpus.
pub struct EmbeddingIndex {
    vectors: Vec<Vec<f32>>,
}

impl EmbeddingIndex {
    /// Embed every text in order. Fails on an empty corpus: an index over
    /// nothing can never return a valid ordinal.
    pub fn build(embedder: &dyn TextEmbedder, texts: &[String]) -> anyhow::Result<Self> {
        if texts.is_empty() {
            bail!("cannot build an embedding index over an empty corpus");
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(embedder.embed(text)?);
        }

        Ok(Self { vectors })
    }

    /// Build directly from an engine's batch output (startup path, where the
    /// engine already embedded the corpus with progress logging).
    pub fn from_vectors(vectors: Vec<Vec<f32>>) -> anyhow::Result<Self> {
        if vectors.is_empty() {
            bail!("cannot build an embedding index over an empty corpus");
        }
        Ok(Self { vectors })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Embed the query with the same embedder the corpus used, then single-pass
    /// max scan over cosine similarity. Ties go to the lowest ordinal (strict
    /// `>` keeps the first maximum encountered); identical queries always
    /// return the identical ordinal.
    pub fn query(&self, embedder: &dyn TextEmbedder, text: &str) -> anyhow::Result<BestMatch> {
        let query_vec = embedder.embed(text)?;

        let mut best = BestMatch {
            ordinal: 0,
            score: f32::NEG_INFINITY,
        };
        for (ordinal, vector) in self.vectors.iter().enumerate() {
            let score = cosine_similarity(&query_vec, vector);
            if score > best.score {
                best = BestMatch { ordinal, score };
            }
        }

        Ok(best)
    }
}

/// Cosine of the angle between two vectors; 0.0 when either has zero norm
/// (a degenerate embedding matches nothing rather than everything).
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Maps each known phrase to a fixed vector; unknown text embeds to zero.
    struct FixtureEmbedder(Vec<(&'static str, Vec<f32>)>);

    impl TextEmbedder for FixtureEmbedder {
        fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            Ok(self
                .0
                .iter()
                .find(|(t, _)| *t == text)
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| vec![0.0; 3]))
        }
    }

    fn fixture() -> FixtureEmbedder {
        FixtureEmbedder(vec![
            ("north", vec![0.0, 1.0, 0.0]),
            ("mostly north", vec![0.1, 1.0, 0.0]),
            ("east", vec![1.0, 0.0, 0.0]),
            ("up", vec![0.0, 0.0, 1.0]),
        ])
    }

    #[test]
    fn test_cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        // Magnitude-invariant
        assert!((cosine_similarity(&[2.0, 0.0], &[5.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_empty_corpus_fails_to_build() {
        let embedder = fixture();
        assert!(EmbeddingIndex::build(&embedder, &[]).is_err());
        assert!(EmbeddingIndex::from_vectors(vec![]).is_err());
    }

    #[test]
    fn test_query_returns_highest_similarity_ordinal() {
        let embedder = fixture();
        let texts: Vec<String> = ["east", "north", "up"].iter().map(|s| s.to_string()).collect();
        let index = EmbeddingIndex::build(&embedder, &texts).unwrap();

        let best = index.query(&embedder, "mostly north").unwrap();
        assert_eq!(best.ordinal, 1);
        assert!(best.score > 0.9);
    }

    #[test]
    fn test_ordinal_always_in_range() {
        let embedder = fixture();
        let texts: Vec<String> = ["east", "north"].iter().map(|s| s.to_string()).collect();
        let index = EmbeddingIndex::build(&embedder, &texts).unwrap();

        // Even a query that matches nothing (zero vector) yields a valid ordinal.
        let best = index.query(&embedder, "no such phrase").unwrap();
        assert!(best.ordinal < index.len());
    }

    #[test]
    fn test_exact_tie_goes_to_lowest_ordinal() {
        let embedder = fixture();
        // Two identical corpus vectors: the first occurrence must win.
        let texts: Vec<String> = ["north", "north", "east"].iter().map(|s| s.to_string()).collect();
        let index = EmbeddingIndex::build(&embedder, &texts).unwrap();

        let best = index.query(&embedder, "north").unwrap();
        assert_eq!(best.ordinal, 0);
    }

    #[test]
    fn test_identical_query_is_deterministic() {
        let embedder = fixture();
        let texts: Vec<String> = ["east", "north", "up"].iter().map(|s| s.to_string()).collect();
        let index = EmbeddingIndex::build(&embedder, &texts).unwrap();

        let a = index.query(&embedder, "mostly north").unwrap();
        let b = index.query(&embedder, "mostly north").unwrap();
        assert_eq!(a.ordinal, b.ordinal);
    }
}
