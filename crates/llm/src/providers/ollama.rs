use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cancel::run_cancellable;
use crate::provider::{ChatBackend, ChatRequest, ContentPart, DeltaSink, LlmError, Message};
use crate::stream::{collect_stream, decode_ndjson_line};

pub const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Vision chat against a local Ollama instance (`/api/chat`).
pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
}

impl OllamaProvider {
    pub fn new(url: Option<String>) -> Self {
        let url = url.unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string());
        Self {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn build_request_body(request: &ChatRequest, stream: bool) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(message_to_ollama).collect();
        let mut options = json!({});
        if let Some(temperature) = request.temperature {
            options["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            options["num_predict"] = json!(max_tokens);
        }
        json!({
            "model": request.model,
            "messages": messages,
            "stream": stream,
            "options": options,
        })
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/api/chat", self.url);
        debug!("Ollama request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_response(status, &body));
        }
        Ok(response)
    }
}

/// Ollama wants plain text content plus a list of raw base64 images.
fn message_to_ollama(message: &Message) -> Value {
    let images: Vec<&str> = message
        .content
        .iter()
        .filter_map(|part| match part {
            ContentPart::ImageUrl(url) => Some(strip_data_url(url)),
            _ => None,
        })
        .collect();

    let mut value = json!({
        "role": message.role.as_str(),
        "content": message.joined_text(),
    });
    if !images.is_empty() {
        value["images"] = json!(images);
    }
    value
}

fn strip_data_url(url: &str) -> &str {
    match url.split_once(";base64,") {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload,
        _ => url,
    }
}

#[async_trait]
impl ChatBackend for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn complete(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        let body = Self::build_request_body(request, false);
        run_cancellable(cancel, async {
            let response = self.send(&body).await?;
            let resp: Value = response.json().await?;
            resp["message"]["content"]
                .as_str()
                .map(String::from)
                .ok_or_else(|| LlmError::ParseError("missing message.content".into()))
        })
        .await
    }

    async fn complete_streaming(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
        on_delta: DeltaSink<'_>,
    ) -> Result<String, LlmError> {
        let body = Self::build_request_body(request, true);
        run_cancellable(cancel, async {
            let response = self.send(&body).await?;
            collect_stream(response.bytes_stream(), decode_ndjson_line, on_delta).await
        })
        .await
    }
}
