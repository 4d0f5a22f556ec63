//! Local sentence embedder using candle + sentence-transformers weights.

use super::Embedder;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use std::path::Path;
use tokenizers::Tokenizer;

fn embedding_err(context: &str, err: impl std::fmt::Display) -> RagError {
    RagError::Embedding(format!("{}: {}", context, err))
}

/// BERT sentence embedder with mean pooling and L2 normalization.
pub struct LocalEmbedder {
    model_id: String,
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl LocalEmbedder {
    /// Load a sentence-transformers model by Hugging Face id.
    pub fn load(model_id: &str) -> Result<Self> {
        let device = Device::Cpu;

        let api = Api::new().map_err(|e| embedding_err("Failed to create HF Hub API", e))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .map_err(|e| embedding_err("Failed to get config.json", e))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| embedding_err("Failed to get tokenizer.json", e))?;
        let weights_path = repo
            .get("model.safetensors")
            .or_else(|_| repo.get("pytorch_model.bin"))
            .map_err(|e| embedding_err("Failed to get model weights", e))?;

        let raw_config =
            std::fs::read_to_string(&config_path).map_err(|e| RagError::io(&config_path, e))?;
        let config: BertConfig = serde_json::from_str(&raw_config)
            .map_err(|e| embedding_err("Failed to parse config", e))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| embedding_err("Failed to load tokenizer", e))?;

        let vb = Self::var_builder(&weights_path, &device)?;
        let model =
            BertModel::load(vb, &config).map_err(|e| embedding_err("Failed to load BERT model", e))?;

        tracing::info!(model = model_id, dim = config.hidden_size, "local embedder loaded");

        Ok(Self {
            model_id: model_id.to_string(),
            model,
            tokenizer,
            device,
        })
    }

    fn var_builder(weights_path: &Path, device: &Device) -> Result<VarBuilder<'static>> {
        let is_pth = weights_path.extension().and_then(|e| e.to_str()) == Some("bin");
        if is_pth {
            return VarBuilder::from_pth(weights_path, DTYPE, device)
                .map_err(|e| embedding_err("Failed to load model weights", e));
        }
        // SAFETY: the weights file is owned by the HF cache and not modified while mapped.
        unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, device)
                .map_err(|e| embedding_err("Failed to load model weights", e))
        }
    }

    /// Generate embeddings for a batch of texts.
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.forward(texts)
            .map_err(|e| embedding_err(&format!("{} forward pass", self.model_id), e))
    }

    fn forward(&self, texts: &[&str]) -> std::result::Result<Vec<Vec<f32>>, Box<dyn std::error::Error + Send + Sync>> {
        let encodings = self.tokenizer.encode_batch(texts.to_vec(), true)?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids_vec = Vec::with_capacity(texts.len() * max_len);
        let mut attention_mask_vec = Vec::with_capacity(texts.len() * max_len);

        for encoding in &encodings {
            let mut padded_ids = encoding.get_ids().to_vec();
            let mut padded_mask = encoding.get_attention_mask().to_vec();
            padded_ids.resize(max_len, 0);
            padded_mask.resize(max_len, 0);
            input_ids_vec.extend(padded_ids);
            attention_mask_vec.extend(padded_mask);
        }

        let batch_size = texts.len();
        let shape = (batch_size, max_len);

        let input_ids = Tensor::from_vec(input_ids_vec, shape, &self.device)?;
        let attention_mask = Tensor::from_vec(attention_mask_vec, shape, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean pooling over the sequence, ignoring padding.
        let mask = attention_mask
            .unsqueeze(2)?
            .to_dtype(output.dtype())?
            .broadcast_as(output.shape())?;
        let summed = (output * &mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        let pooled = (summed / counts)?;

        let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        let normalized = pooled.broadcast_div(&norms)?;

        Ok(normalized.to_vec2::<f32>()?)
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding(format!("{} returned no vector", self.model_id)))
    }
}
