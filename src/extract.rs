// extract.rs — Fetch a URL and reduce the page to plain natural-language text.
//
// Pre-strips non-content elements from the raw HTML before parsing (their
// text would pollute the embedding with boilerplate), then pulls text from
// content-like containers with a paragraph fallback. Whitespace runs collapse
// to single spaces so the tokenizer sees one flat sentence stream.

use scraper::{Html, Selector};

use crate::config;
use crate::error::MatchError;

// Elements whose entire content is noise for embedding purposes.
const NONCONTENT_TAGS: &[&str] = &["script", "style", "nav", "footer", "header"];

/// Fetch `url` and return its readable text.
///
/// All failure modes (network/timeout, non-2xx status, too little text)
/// surface as [`MatchError::ExtractionFailed`] with a human-readable reason.
pub fn extract_from_url(url: &str) -> Result<String, MatchError> {
    let html = fetch_page(url)?;
    extract_text(&html)
}

fn fetch_page(url: &str) -> Result<String, MatchError> {
    let resp = ureq::get(url)
        .timeout(std::time::Duration::from_secs(config::extract::FETCH_TIMEOUT_SECS))
        .set("User-Agent", config::extract::USER_AGENT)
        .call()
        .map_err(|e| match e {
            ureq::Error::Status(code, _) => {
                MatchError::ExtractionFailed(format!("HTTP {code} fetching {url}"))
            }
            ureq::Error::Transport(t) => {
                MatchError::ExtractionFailed(format!("failed to fetch {url}: {t}"))
            }
        })?;

    resp.into_string()
        .map_err(|e| MatchError::ExtractionFailed(format!("failed to read body of {url}: {e}")))
}

/// Reduce an HTML document to plain text.
///
/// Primary strategy: collect text from everything content-like, meaning
/// `article` / `main` / `[role="main"]` containers plus generic
/// `div`/`section` containers whose class attribute contains a
/// content-indicating keyword (case-insensitive substring). If that pool is
/// empty, fall back to every `<p>` element.
///
/// Fails when the final text is shorter than `MIN_TEXT_CHARS` characters —
/// too little signal to embed meaningfully.
pub fn extract_text(html: &str) -> Result<String, MatchError> {
    let cleaned = strip_noncontent_tags(html);
    let document = Html::parse_document(&cleaned);

    // Article/main containers and class-hinted generic containers form one
    // content-like pool; paragraphs are only the fallback.
    let mut chunks = collect_text(&document, &["article", "main", "[role=\"main\"]"]);
    chunks.extend(collect_class_hinted_text(&document));
    if chunks.is_empty() {
        chunks = collect_text(&document, &["p"]);
    }

    let text = collapse_whitespace(&chunks.join(" "));
    let text = truncate_chars(&text, config::extract::MAX_TEXT_CHARS);

    // Character count, not byte count: short non-ASCII text must fail too.
    let char_count = text.chars().count();
    if char_count < config::extract::MIN_TEXT_CHARS {
        return Err(MatchError::ExtractionFailed(format!(
            "extracted only {char_count} characters of text (minimum {})",
            config::extract::MIN_TEXT_CHARS
        )));
    }

    Ok(text)
}

fn collect_text(document: &Html, selectors: &[&str]) -> Vec<String> {
    let mut chunks = Vec::new();
    for selector_str in selectors {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for element in document.select(&selector) {
            let text: String = element.text().collect::<Vec<_>>().join(" ");
            if !text.trim().is_empty() {
                chunks.push(text);
            }
        }
    }
    chunks
}

/// Text of `div`/`section` elements whose class names suggest page content
/// ("content", "article", "post", "entry" as substrings, case-insensitive).
fn collect_class_hinted_text(document: &Html) -> Vec<String> {
    let mut chunks = Vec::new();
    let Ok(selector) = Selector::parse("div[class], section[class]") else {
        return chunks;
    };
    for element in document.select(&selector) {
        let class = element.value().attr("class").unwrap_or("").to_lowercase();
        let is_contentish = config::extract::CONTENT_CLASS_HINTS
            .iter()
            .any(|hint| class.contains(hint));
        if !is_contentish {
            continue;
        }
        let text: String = element.text().collect::<Vec<_>>().join(" ");
        if !text.trim().is_empty() {
            chunks.push(text);
        }
    }
    chunks
}

/// Remove non-content tags and everything inside them before parsing.
fn strip_noncontent_tags(html: &str) -> String {
    let mut result = html.to_owned();
    for tag in NONCONTENT_TAGS {
        result = strip_tag(&result, tag);
    }
    result
}

/// Remove all instances of one HTML tag and its content, case-insensitively.
fn strip_tag(html: &str, tag: &str) -> String {
    let mut result = String::with_capacity(html.len());
    // ASCII-only folding: tag names are ASCII, and full Unicode lowercasing
    // can change byte length (e.g. 'İ'), desyncing these offsets from `html`.
    let lower = html.to_ascii_lowercase();
    let open_tag = format!("<{tag}");
    let close_tag = format!("</{tag}>");

    let mut pos = 0;
    loop {
        let start = match lower[pos..].find(&open_tag) {
            Some(offset) => pos + offset,
            None => {
                result.push_str(&html[pos..]);
                break;
            }
        };

        // Verify this is actually the target tag (not e.g. <navigate> for <nav>).
        let after_tag = start + open_tag.len();
        if after_tag < lower.len() {
            let next_byte = lower.as_bytes()[after_tag];
            if !matches!(next_byte, b' ' | b'>' | b'/' | b'\n' | b'\r' | b'\t') {
                result.push_str(&html[pos..after_tag]);
                pos = after_tag;
                continue;
            }
        }

        result.push_str(&html[pos..start]);

        let end = match lower[start..].find(&close_tag) {
            Some(offset) => start + offset + close_tag.len(),
            None => {
                // No closing tag: skip just the opening tag.
                match lower[start..].find('>') {
                    Some(offset) => start + offset + 1,
                    None => html.len(),
                }
            }
        };

        pos = end;
    }

    result
}

/// Collapse every whitespace run (including newlines) into a single space.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text.to_owned();
    }
    let mut end = max_chars;
    while !text.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    text[..end].trim_end().to_owned()
}
