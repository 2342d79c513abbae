// corpus.rs — Thirukkural dataset loading and embeddable-text derivation.
//
// The upstream JSON is loosely typed: field presence and naming are not
// guaranteed, so records are kept as raw JSON maps with known-key accessors
// plus a generic iterator over string-valued fields. Cargo enables
// serde_json's preserve_order feature so "field order" means document order.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context};
use serde_json::{Map, Value};

use crate::config;

/// One aphorism entry, as loaded. Immutable after load.
#[derive(Debug, Clone)]
pub struct CorpusRecord(Map<String, Value>);

impl CorpusRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Raw field access (for output projection; missing fields stay missing).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// First non-empty string among `keys`, in order. Case-sensitive.
    fn first_string(&self, keys: &[&str]) -> &str {
        for key in keys {
            if let Some(s) = self.0.get(*key).and_then(|v| v.as_str()) {
                if !s.is_empty() {
                    return s;
                }
            }
        }
        ""
    }

    /// All string-typed values in the record's natural field order.
    fn string_values(&self) -> impl Iterator<Item = &str> {
        self.0.values().filter_map(|v| v.as_str())
    }
}

/// Derive the text to embed for one record.
///
/// First non-empty wins per group: primary is `eng` / `Translation` /
/// `translation`, secondary is `eng_exp` / `explanation` / `meaning`. If both
/// groups come up empty, fall back to space-joining every string value in the
/// record; otherwise the output is `"{primary} {secondary}"` with a single
/// separating space, even when one side is empty.
///
/// Always produces a string. A record with no string fields yields an empty
/// string, which embeds as a zero vector and simply ranks poorly.
pub fn embeddable_text(record: &CorpusRecord) -> String {
    let primary = record.first_string(config::corpus::PRIMARY_TEXT_KEYS);
    let secondary = record.first_string(config::corpus::SECONDARY_TEXT_KEYS);

    if primary.is_empty() && secondary.is_empty() {
        record.string_values().collect::<Vec<_>>().join(" ")
    } else {
        format!("{primary} {secondary}")
    }
}

/// Local corpus file path (~/.kural-match/data/thirukkural.json).
pub fn corpus_file() -> anyhow::Result<PathBuf> {
    let home = home_dir()?;
    Ok(home
        .join(config::corpus::CORPUS_DIR_REL)
        .join(config::corpus::CORPUS_FILE_NAME))
}

/// Download the dataset on first startup; no-op when already cached.
/// Returns the local file path.
pub fn ensure_corpus_file() -> anyhow::Result<PathBuf> {
    let path = corpus_file()?;
    if path.exists() {
        log::info!("Corpus already cached at {}", path.display());
        return Ok(path);
    }

    let dir = path.parent().context("corpus path has no parent")?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create corpus dir {}", dir.display()))?;

    let url = config::corpus::CORPUS_URL;
    log::info!("Downloading corpus from {url}");

    let resp = ureq::get(url)
        .timeout(std::time::Duration::from_secs(config::corpus::DOWNLOAD_TIMEOUT_SECS))
        .call()
        .with_context(|| format!("failed to download {url}"))?;

    let status = resp.status();
    if status != 200 {
        bail!("HTTP {status} downloading {url}");
    }

    let mut body = Vec::new();
    resp.into_reader()
        .read_to_end(&mut body)
        .with_context(|| format!("failed to read response body for {url}"))?;

    // Write atomically: write to .tmp, then rename.
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, &body)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, &path)
        .with_context(|| format!("failed to rename {} -> {}", tmp_path.display(), path.display()))?;

    log::info!("Corpus download complete ({} bytes)", body.len());
    Ok(path)
}

/// Load and parse the local corpus file.
///
/// Accepts either a bare JSON array of records or an object wrapping that
/// array under a `kural` key (both shapes occur upstream).
pub fn load_corpus(path: &std::path::Path) -> anyhow::Result<Vec<CorpusRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    let data: Value = serde_json::from_str(&raw)
        .with_context(|| format!("parse {}", path.display()))?;

    let entries = match data {
        Value::Object(mut map) => match map.remove("kural") {
            Some(Value::Array(entries)) => entries,
            _ => bail!("corpus object has no 'kural' array"),
        },
        Value::Array(entries) => entries,
        _ => bail!("corpus is neither a JSON array nor an object"),
    };

    let records: Vec<CorpusRecord> = entries
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(fields) => Some(CorpusRecord::new(fields)),
            _ => None,
        })
        .collect();

    if records.is_empty() {
        bail!("corpus at {} contains no records", path.display());
    }

    log::info!("Loaded {} kurals from {}", records.len(), path.display());
    Ok(records)
}

fn home_dir() -> anyhow::Result<PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .context("cannot determine home directory (neither HOME nor USERPROFILE is set)")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> CorpusRecord {
        match serde_json::from_str::<Value>(json).unwrap() {
            Value::Object(m) => CorpusRecord::new(m),
            _ => panic!("test record must be a JSON object"),
        }
    }

    #[test]
    fn test_primary_and_secondary_joined_with_one_space() {
        let r = record(r#"{"Translation": "patience is strength", "explanation": "endurance wins"}"#);
        assert_eq!(embeddable_text(&r), "patience is strength endurance wins");
    }

    #[test]
    fn test_alternate_field_names_resolve_same_output() {
        let a = record(r#"{"eng": "speak kindly", "eng_exp": "words matter"}"#);
        let b = record(r#"{"translation": "speak kindly", "meaning": "words matter"}"#);
        assert_eq!(embeddable_text(&a), "speak kindly words matter");
        assert_eq!(embeddable_text(&b), "speak kindly words matter");
    }

    #[test]
    fn test_priority_order_within_group() {
        // `eng` beats `Translation` beats `translation`.
        let r = record(r#"{"translation": "third", "Translation": "second", "eng": "first"}"#);
        assert!(embeddable_text(&r).starts_with("first"));

        let r = record(r#"{"translation": "third", "Translation": "second"}"#);
        assert!(embeddable_text(&r).starts_with("second"));
    }

    #[test]
    fn test_single_space_even_when_one_side_empty() {
        let r = record(r#"{"Translation": "only primary"}"#);
        assert_eq!(embeddable_text(&r), "only primary ");

        let r = record(r#"{"explanation": "only secondary"}"#);
        assert_eq!(embeddable_text(&r), " only secondary");
    }

    #[test]
    fn test_unknown_keys_fall_back_to_all_string_values_in_order() {
        let r = record(r#"{"Line1": "first line", "Line2": "second line", "Number": 7}"#);
        // Non-string values are skipped; field order is document order.
        assert_eq!(embeddable_text(&r), "first line second line");
    }

    #[test]
    fn test_no_string_fields_yields_empty_string() {
        let r = record(r#"{"Number": 1, "chapter": 2}"#);
        assert_eq!(embeddable_text(&r), "");
    }

    #[test]
    fn test_empty_string_fields_do_not_win_priority() {
        let r = record(r#"{"eng": "", "Translation": "real text"}"#);
        assert!(embeddable_text(&r).starts_with("real text"));
    }

    #[test]
    fn test_load_corpus_accepts_bare_array_and_wrapped_object() {
        let dir = std::env::temp_dir();

        let bare = dir.join("kural_test_bare.json");
        std::fs::write(&bare, r#"[{"Number": 1, "Translation": "a"}]"#).unwrap();
        let records = load_corpus(&bare).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("Number").and_then(|v| v.as_i64()), Some(1));

        let wrapped = dir.join("kural_test_wrapped.json");
        std::fs::write(&wrapped, r#"{"kural": [{"Number": 2}, {"Number": 3}]}"#).unwrap();
        let records = load_corpus(&wrapped).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_load_corpus_rejects_empty_and_malformed() {
        let dir = std::env::temp_dir();

        let empty = dir.join("kural_test_empty.json");
        std::fs::write(&empty, "[]").unwrap();
        assert!(load_corpus(&empty).is_err());

        let scalar = dir.join("kural_test_scalar.json");
        std::fs::write(&scalar, "42").unwrap();
        assert!(load_corpus(&scalar).is_err());
    }
}
