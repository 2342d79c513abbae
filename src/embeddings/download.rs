// download.rs — Model file download with SHA256 verification.
//
// Downloads all-MiniLM-L6-v2 weights on first startup and caches them at
// ~/.kural-match/models/. Files are verified against known SHA256 hashes so a
// truncated or tampered download never reaches the inference path.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use sha2::{Digest, Sha256};

use crate::config;

const MODEL_FILES: &[&str] = &["model.safetensors", "tokenizer.json", "config.json"];

/// Local model directory (~/.kural-match/models/all-MiniLM-L6-v2/).
pub fn model_dir() -> anyhow::Result<PathBuf> {
    let home = home_dir()?;
    Ok(home.join(config::embedding::MODEL_DIR_REL))
}

/// Check whether all required model files exist locally.
pub fn model_files_exist() -> anyhow::Result<bool> {
    let dir = model_dir()?;
    Ok(MODEL_FILES.iter().all(|f| dir.join(f).exists()))
}

/// Download all model files if not already cached. Returns the model directory.
pub fn ensure_model_files() -> anyhow::Result<PathBuf> {
    let dir = model_dir()?;

    if model_files_exist()? {
        log::info!("Model files already cached at {}", dir.display());
        return Ok(dir);
    }

    log::info!(
        "Downloading {} to {}",
        config::embedding::EMBEDDING_MODEL_NAME,
        dir.display()
    );
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create model dir {}", dir.display()))?;

    let base = config::embedding::MODEL_URL_BASE;
    let hashes = [
        config::embedding::MODEL_SAFETENSORS_SHA256,
        config::embedding::TOKENIZER_JSON_SHA256,
        config::embedding::CONFIG_JSON_SHA256,
    ];

    for (file, expected_sha256) in MODEL_FILES.iter().zip(hashes) {
        download_and_verify(&format!("{base}/{file}"), &dir.join(file), expected_sha256)?;
    }

    log::info!("Model download complete");
    Ok(dir)
}

/// Download a file and verify its SHA256 hash before putting it in place.
fn download_and_verify(url: &str, dest: &Path, expected_sha256: &str) -> anyhow::Result<()> {
    let filename = dest.file_name().unwrap_or_default().to_string_lossy();
    log::info!("Downloading {} from {}", filename, url);

    let resp = ureq::get(url)
        .timeout(std::time::Duration::from_secs(config::embedding::DOWNLOAD_TIMEOUT_SECS))
        .call()
        .with_context(|| format!("failed to download {url}"))?;

    let status = resp.status();
    if status != 200 {
        bail!("HTTP {status} downloading {url}");
    }

    // Read body into memory (model is ~87 MB, fits in RAM)
    let mut body = Vec::new();
    resp.into_reader()
        .read_to_end(&mut body)
        .with_context(|| format!("failed to read response body for {url}"))?;

    verify_sha256(&body, expected_sha256)
        .with_context(|| format!("integrity check failed for {filename}"))?;
    log::info!("SHA256 verified for {} ({})", filename, &expected_sha256[..12]);

    // Write atomically: write to .tmp, then rename
    let tmp_path = dest.with_extension("tmp");
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;
    file.write_all(&body)?;
    file.flush()?;
    drop(file);

    fs::rename(&tmp_path, dest)
        .with_context(|| format!("failed to rename {} -> {}", tmp_path.display(), dest.display()))?;

    Ok(())
}

fn verify_sha256(body: &[u8], expected: &str) -> anyhow::Result<()> {
    let mut hasher = Sha256::new();
    hasher.update(body);
    let actual = hex::encode(hasher.finalize());
    if actual != expected {
        bail!("SHA256 mismatch: expected {expected}, got {actual}");
    }
    Ok(())
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

    #[test]
    fn test_verify_sha256_accepts_matching_hash() {
        // sha256("hello") — fixed vector
        let expected = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert!(verify_sha256(b"hello", expected).is_ok());
    }

    #[test]
    fn test_verify_sha256_rejects_mismatch() {
        let wrong = "0000000000000000000000000000000000000000000000000000000000000000";
        assert!(verify_sha256(b"hello", wrong).is_err());
    }
}
