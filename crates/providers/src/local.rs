//! Sentence-transformer embeddings computed in-process with candle.
//!
//! The model directory must hold `config.json`, `tokenizer.json` and
//! `model.safetensors` in the Hugging Face BERT layout (all-MiniLM-L6-v2 by
//! default). The compute device is picked once, when the provider is built.

use crate::{EmbedResponse, EmbeddingProvider, ProviderError};
use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::info;

const MAX_TOKENS: usize = 256;

fn model_err(e: impl std::fmt::Display) -> ProviderError {
    ProviderError::ModelUnavailable(e.to_string())
}

/// CUDA, then Metal, else CPU.
pub fn select_device(force_cpu: bool) -> Result<Device, ProviderError> {
    if force_cpu {
        return Ok(Device::Cpu);
    }
    if cuda_is_available() {
        return Device::new_cuda(0).map_err(model_err);
    }
    if metal_is_available() {
        return Device::new_metal(0).map_err(model_err);
    }
    Ok(Device::Cpu)
}

pub struct LocalEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
}

impl LocalEmbedder {
    pub fn load(model_dir: &Path, force_cpu: bool) -> Result<Self, ProviderError> {
        let device = select_device(force_cpu)?;
        info!(device = ?device, dir = %model_dir.display(), "loading embedding model");

        let config_raw = std::fs::read_to_string(model_dir.join("config.json")).map_err(model_err)?;
        let config: Config = serde_json::from_str(&config_raw).map_err(model_err)?;
        let tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json")).map_err(model_err)?;
        let weights = candle_core::safetensors::load(model_dir.join("model.safetensors"), &device)
            .map_err(model_err)?;
        let vb = VarBuilder::from_tensors(weights, DTYPE, &device);
        let model = BertModel::load(vb, &config).map_err(model_err)?;

        let mut embedder = Self {
            model,
            tokenizer,
            device,
            dim: 0,
        };
        embedder.dim = embedder.embed_text("dimension check")?.len();
        Ok(embedder)
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let enc = self.tokenizer.encode(text, true).map_err(model_err)?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        ids.truncate(MAX_TOKENS);
        mask.truncate(MAX_TOKENS);

        let input_ids = Tensor::new(ids.as_slice(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(model_err)?;
        let token_type_ids = input_ids.zeros_like().map_err(model_err)?;
        let attention = Tensor::new(mask.as_slice(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(model_err)?;

        let pooled = (|| -> candle_core::Result<Vec<f32>> {
            let hidden = self
                .model
                .forward(&input_ids, &token_type_ids, Some(&attention))?;
            // Mean over real tokens, then L2 normalise.
            let weights = attention.to_dtype(hidden.dtype())?.unsqueeze(2)?;
            let summed = hidden.broadcast_mul(&weights)?.sum(1)?;
            let count = weights.sum(1)?;
            let mean = summed.broadcast_div(&count)?;
            let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?;
            mean.broadcast_div(&norm)?
                .squeeze(0)?
                .to_dtype(DType::F32)?
                .to_vec1::<f32>()
        })()
        .map_err(model_err)?;
        Ok(pooled)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for LocalEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        let vectors = texts
            .iter()
            .map(|t| self.embed_text(t))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EmbedResponse { vectors })
    }

    fn dimensions(&self) -> usize {
        self.dim
    }
}
