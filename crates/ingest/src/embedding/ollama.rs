use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{check_dimensions, Embedder, EmbeddingError};

/// Ollama's batch endpoint, `/api/embed`.
pub struct OllamaEmbedder {
    client: Client,
    url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    pub fn new(url: String, model: String, dimensions: usize) -> Self {
        Self {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            model,
            dimensions,
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(model = %self.model, count = texts.len(), "Ollama embed request");

        let response = self
            .client
            .post(format!("{}/api/embed", self.url))
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(EmbeddingError::from_response(response).await);
        }

        let parsed: EmbedResponse = response.json().await?;
        check_dimensions(&parsed.embeddings, self.dimensions)?;
        Ok(parsed.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
