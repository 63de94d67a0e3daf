use crate::error::{IndexError, Result};
use providers::{EmbeddingProvider, ProviderRegistry};
use std::sync::Arc;

/// Single-text view over a batch [`EmbeddingProvider`].
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Resolves the preferred provider, or `name` when given.
    pub fn from_registry(registry: &ProviderRegistry, name: Option<&str>) -> Result<Self> {
        registry
            .embedding(name)
            .map(Self::new)
            .map_err(IndexError::from_embedding)
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let resp = self
            .provider
            .embed(&[text.to_string()])
            .await
            .map_err(IndexError::from_embedding)?;
        let vector = resp.vectors.into_iter().next().ok_or_else(|| {
            IndexError::EmbeddingUnavailable("provider returned no vector".to_string())
        })?;
        if vector.len() != self.provider.dimensions() {
            return Err(IndexError::EmbeddingUnavailable(format!(
                "expected {} dimensions, got {}",
                self.provider.dimensions(),
                vector.len()
            )));
        }
        Ok(vector)
    }
}
