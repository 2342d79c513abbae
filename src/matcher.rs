// matcher.rs — Orchestrates query resolution, embedding lookup, and output projection.
//
// A `Matcher` is the whole ready state of the service: corpus records, the
// embedding index over them, and the embedder both sides share. Built once at
// startup, then read-only, so concurrent requests need no locking.

use serde::Serialize;
use serde_json::Value;

use crate::corpus::{self, CorpusRecord};
use crate::embeddings::TextEmbedder;
use crate::error::MatchError;
use crate::extract;
use crate::index::EmbeddingIndex;

/// The single best-matching kural, projected to the output field subset the
/// frontend expects. Missing fields serialize as null rather than erroring.
#[derive(Debug, Serialize)]
pub struct MatchResult {
    pub number: Option<Value>,
    pub line1: Option<Value>,
    pub line2: Option<Value>,
    pub eng: Option<Value>,
    pub eng_exp: Option<Value>,
    pub mv: Option<Value>,
    pub score: f32,
}

pub struct Matcher {
    records: Vec<CorpusRecord>,
    index: EmbeddingIndex,
    embedder: Box<dyn TextEmbedder>,
}

impl Matcher {
    /// Derive embeddable text for every record and build the index over it.
    pub fn build(records: Vec<CorpusRecord>, embedder: Box<dyn TextEmbedder>) -> anyhow::Result<Self> {
        let texts: Vec<String> = records.iter().map(corpus::embeddable_text).collect();
        let index = EmbeddingIndex::build(embedder.as_ref(), &texts)?;
        Ok(Self {
            records,
            index,
            embedder,
        })
    }

    /// Startup path: the index was already built (with progress logging);
    /// just wire the parts together.
    pub fn from_parts(
        records: Vec<CorpusRecord>,
        index: EmbeddingIndex,
        embedder: Box<dyn TextEmbedder>,
    ) -> Self {
        log::debug!("Matcher ready: {} records, {} vectors", records.len(), index.len());
        Self {
            records,
            index,
            embedder,
        }
    }

    pub fn corpus_len(&self) -> usize {
        self.records.len()
    }

    /// Resolve the query to one text and return the closest kural.
    ///
    /// A url takes precedence: when present it is fetched and extracted, and
    /// any directly supplied text is ignored — exactly one resolved text is
    /// embedded per request. Neither present is a client input error, caught
    /// before any embedding work happens.
    pub fn find_match(&self, text: Option<&str>, url: Option<&str>) -> Result<MatchResult, MatchError> {
        let resolved = match (text, url) {
            (_, Some(url)) => extract::extract_from_url(url)?,
            (Some(text), None) => text.to_owned(),
            (None, None) => return Err(MatchError::MissingInput),
        };

        self.match_text(&resolved)
    }

    fn match_text(&self, text: &str) -> Result<MatchResult, MatchError> {
        let best = self
            .index
            .query(self.embedder.as_ref(), text)
            .map_err(MatchError::Internal)?;

        // The index guarantees the ordinal is in range for a non-empty corpus.
        let record = &self.records[best.ordinal];
        log::info!(
            "Matched kural #{:?} (ordinal {}, score {:.4})",
            record.get("Number"),
            best.ordinal,
            best.score
        );

        Ok(project(record, best.score))
    }
}

fn project(record: &CorpusRecord, score: f32) -> MatchResult {
    MatchResult {
        number: record.get("Number").cloned(),
        line1: record.get("Line1").cloned(),
        line2: record.get("Line2").cloned(),
        eng: record.get("Translation").cloned(),
        eng_exp: record.get("explanation").cloned(),
        mv: record.get("mv").cloned(),
        score,
    }
}
