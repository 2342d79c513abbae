// IMPORTANT:
// Keep ALL numeric values centralized here (repo rule: no hardcoded numeric values scattered around).

// NOTE: SERVICE_VERSION must stay in sync with the `version` field in Cargo.toml.
pub const SERVICE_VERSION: &str = "0.3.0";

pub mod logging {
    pub const LOG_DIR_REL: &str = ".kural-match/logs";
    pub const LOG_FILE_NAME: &str = "kural_match.log";

    pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
    pub const LOG_ROTATE_KEEP_FILES: usize = 5;

    // Embedding the full corpus takes a while; log progress every N records.
    pub const EMBED_PROGRESS_EVERY: usize = 100;
}

pub mod server {
    pub const DEFAULT_PORT: u16 = 8000;
    pub const STATIC_DIR: &str = "static";
}

pub mod corpus {
    // Upstream dataset (JSON array of kural objects, possibly wrapped in a "kural" key).
    pub const CORPUS_URL: &str =
        "https://raw.githubusercontent.com/tk120404/thirukkural/refs/heads/master/thirukkural.json";

    // Local storage (relative to home); downloaded once, read on subsequent startups.
    pub const CORPUS_DIR_REL: &str = ".kural-match/data";
    pub const CORPUS_FILE_NAME: &str = "thirukkural.json";

    pub const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

    // Field-priority fallback for building embeddable text (first match wins).
    // The upstream schema is not strictly typed, so each group lists the names
    // observed across dataset revisions.
    pub const PRIMARY_TEXT_KEYS: &[&str] = &["eng", "Translation", "translation"];
    pub const SECONDARY_TEXT_KEYS: &[&str] = &["eng_exp", "explanation", "meaning"];
}

pub mod embedding {
    pub const EMBEDDING_DIMS: usize = 384;
    pub const EMBEDDING_MODEL_NAME: &str = "all-MiniLM-L6-v2";

    // Max word-piece tokens for all-MiniLM-L6-v2 (model context limit is 256).
    // We pre-truncate to control what gets embedded.
    pub const MAX_TOKENS: usize = 256;

    // Model download URL base (lazy download on first startup).
    pub const MODEL_URL_BASE: &str =
        "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main";

    // SHA256 hashes for integrity verification
    pub const MODEL_SAFETENSORS_SHA256: &str =
        "53aa51172d142c89d9012cce15ae4d6cc0ca6895895114379cacb4fab128d9db";
    pub const TOKENIZER_JSON_SHA256: &str =
        "be50c3628f2bf5bb5e3a7f17b1f74611b2561a3a27eeab05e5aa30f411572037";
    pub const CONFIG_JSON_SHA256: &str =
        "953f9c0d463486b10a6871cc2fd59f223b2c70184f49815e7efbcab5d8908b41";

    pub const DOWNLOAD_TIMEOUT_SECS: u64 = 90;

    // Local model storage directory (relative to home)
    pub const MODEL_DIR_REL: &str = ".kural-match/models/all-MiniLM-L6-v2";
}

pub mod extract {
    pub const FETCH_TIMEOUT_SECS: u64 = 10;

    // Some servers reject unidentified clients, so present a browser-like identity.
    pub const USER_AGENT: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

    // Below this many characters there is too little signal to embed meaningfully.
    pub const MIN_TEXT_CHARS: usize = 50;

    // Cap extracted text well above the model context window; anything past
    // MAX_TOKENS is discarded by the tokenizer anyway.
    pub const MAX_TEXT_CHARS: usize = 100_000;

    // Class-attribute substrings that mark a generic container as content-like.
    pub const CONTENT_CLASS_HINTS: &[&str] = &["content", "article", "post", "entry"];
}
