// engine.rs — Candle BERT embedding engine with attention-mask-aware mean pooling.
//
// Loads all-MiniLM-L6-v2 from safetensors and produces 384-dim sentence
// embeddings, L2-normalized as sentence-transformers does. Mean pooling is
// over non-padding tokens only (not naive average, not the CLS token); a
// naive average would let padding drag every vector toward the origin.

use std::path::Path;

use anyhow::{bail, Context};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use crate::config;
use crate::embeddings::TextEmbedder;

/// Holds the loaded model and tokenizer. Built once at startup, read-only
/// afterwards, so concurrent requests can share it without locking.
pub struct EmbeddingEngine {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl EmbeddingEngine {
    /// Load the model from a local directory containing model.safetensors,
    /// tokenizer.json, and config.json.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let device = Device::Cpu;

        let config_path = model_dir.join("config.json");
        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("read {}", config_path.display()))?;
        let bert_config: BertConfig = serde_json::from_str(&config_str)
            .with_context(|| format!("parse {}", config_path.display()))?;

        log::info!(
            "Loading embedding model {}: hidden_size={}, layers={}",
            config::embedding::EMBEDDING_MODEL_NAME,
            bert_config.hidden_size,
            bert_config.num_hidden_layers,
        );

        let weights_path = model_dir.join("model.safetensors");
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path.clone()], DType::F32, &device)
                .with_context(|| format!("load weights from {}", weights_path.display()))?
        };
        let model = BertModel::load(vb, &bert_config).context("load BERT model")?;

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;

        log::info!("Embedding model loaded (dims={})", bert_config.hidden_size);

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    /// Embed every corpus text in order, logging progress as we go.
    /// This is the dominant startup cost (~1330 kurals at a few ms each).
    pub fn embed_all(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            vectors.push(self.embed(text)?);
            if (i + 1) % config::logging::EMBED_PROGRESS_EVERY == 0 {
                log::info!("Embedded {}/{} corpus texts", i + 1, texts.len());
            }
        }
        Ok(vectors)
    }

    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        if text.trim().is_empty() {
            // Zero vector for empty input; cosine against it is 0 everywhere,
            // so degenerate records just rank last.
            return Ok(vec![0.0; config::embedding::EMBEDDING_DIMS]);
        }

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        // Pre-truncate to the model context window.
        let len = encoding.get_ids().len().min(config::embedding::MAX_TOKENS);
        let token_ids = &encoding.get_ids()[..len];
        let attention_mask = &encoding.get_attention_mask()[..len];

        // [1, seq_len] tensors
        let token_ids_t = Tensor::new(token_ids, &self.device)?.unsqueeze(0)?;
        let attention_mask_t = Tensor::new(attention_mask, &self.device)?.unsqueeze(0)?;
        let token_type_ids = token_ids_t.zeros_like()?;

        // Forward pass → [1, seq_len, hidden_size]
        let hidden = self
            .model
            .forward(&token_ids_t, &token_type_ids, Some(&attention_mask_t))?;

        let pooled = mean_pooling(&hidden, &attention_mask_t)?;
        let normalized = l2_normalize(&pooled)?;
        let vector: Vec<f32> = normalized.squeeze(0)?.to_vec1()?;

        if vector.len() != config::embedding::EMBEDDING_DIMS {
            bail!(
                "unexpected embedding dims: got {}, expected {}",
                vector.len(),
                config::embedding::EMBEDDING_DIMS
            );
        }

        Ok(vector)
    }
}

impl TextEmbedder for EmbeddingEngine {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_text(text)
    }
}

/// Attention-mask-aware mean pooling.
///
/// hidden: [batch, seq_len, hidden_size]; mask: [batch, seq_len] of 0/1.
/// Output: [batch, hidden_size] = sum(hidden * mask) / sum(mask).
fn mean_pooling(hidden: &Tensor, attention_mask: &Tensor) -> anyhow::Result<Tensor> {
    let mask = attention_mask
        .to_dtype(DType::F32)?
        .unsqueeze(2)?
        .broadcast_as(hidden.shape())?;

    let summed = (hidden * &mask)?.sum(1)?;
    // Clamp to avoid div by zero on an all-padding sequence.
    let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;

    Ok((summed / counts)?)
}

/// L2 normalize along the last dimension (sentence-transformers default).
fn l2_normalize(tensor: &Tensor) -> anyhow::Result<Tensor> {
    let norm = tensor.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
    Ok(tensor.broadcast_div(&norm)?)
}
