pub mod batcher;
pub mod ollama;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use docslice_core::config::EmbeddingConfig;

pub use batcher::embed_chunks;
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use traits::{Embedder, EmbeddingError};

const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Build the embedder named by `config.provider` ("ollama" or "openai").
pub fn embedder_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(
            config
                .base_url
                .clone()
                .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string()),
            config.model.clone(),
            config.dimensions,
        ))),
        "openai" => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| EmbeddingError::NotConfigured("EMBEDDING_API_KEY is not set".into()))?;
            Ok(Arc::new(OpenAiEmbedder::new(
                api_key,
                config.model.clone(),
                config.base_url.clone(),
                config.dimensions,
            )))
        }
        other => Err(EmbeddingError::NotConfigured(format!(
            "unknown embedding provider: {other}"
        ))),
    }
}
