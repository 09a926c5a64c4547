//! OpenAI-compatible chat completions. Serves both OpenRouter (cloud, bearer
//! key, plugin block) and vLLM (local, no key, transcription endpoint).

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cancel::run_cancellable;
use crate::provider::{
    AudioUpload, ChatBackend, ChatRequest, ContentPart, DeltaSink, LlmError, Message, Transcriber,
};
use crate::stream::{collect_stream, decode_sse_line};

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api";
pub const VLLM_DEFAULT_URL: &str = "http://localhost:8000";

pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    name: &'static str,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatProvider {
    pub fn new(name: &'static str, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// OpenRouter cloud endpoint. `base_url` defaults to [`OPENROUTER_BASE_URL`].
    pub fn openrouter(api_key: String, base_url: Option<String>) -> Self {
        Self::new(
            "openrouter",
            base_url.unwrap_or_else(|| OPENROUTER_BASE_URL.to_string()),
            Some(api_key),
        )
    }

    /// A vLLM server, [`VLLM_DEFAULT_URL`] unless given.
    pub fn vllm(base_url: Option<String>) -> Self {
        Self::new(
            "vllm",
            base_url.unwrap_or_else(|| VLLM_DEFAULT_URL.to_string()),
            None,
        )
    }

    fn chat_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }

    /// Build the JSON body for `/v1/chat/completions`.
    pub(crate) fn build_request_body(request: &ChatRequest, stream: bool) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(message_to_openai).collect();
        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "stream": stream,
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(plugins) = &request.plugins {
            body["plugins"] = plugins.clone();
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, LlmError> {
        let url = self.chat_url();
        debug!(provider = self.name, url = %url, "chat completion request");

        let response = self
            .authorize(self.client.post(&url))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_response(status, &body));
        }
        Ok(response)
    }
}

fn message_to_openai(message: &Message) -> Value {
    let parts: Vec<Value> = message
        .content
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => json!({ "type": "text", "text": text }),
            ContentPart::ImageUrl(url) => json!({ "type": "image_url", "image_url": { "url": url } }),
            ContentPart::File { filename, data_url } => json!({
                "type": "file",
                "file": { "filename": filename, "file_data": data_url },
            }),
            ContentPart::InputAudio { data, format } => json!({
                "type": "input_audio",
                "input_audio": { "data": data, "format": format },
            }),
            ContentPart::VideoUrl(url) => json!({ "type": "video_url", "video_url": { "url": url } }),
        })
        .collect();

    // Plain text messages stay as strings for servers without content arrays.
    let content = match message.content.as_slice() {
        [ContentPart::Text(text)] => json!(text),
        _ => json!(parts),
    };
    json!({ "role": message.role.as_str(), "content": content })
}

#[async_trait]
impl ChatBackend for OpenAiCompatProvider {
    fn name(&self) -> &'static str {
        self.name
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
            if let Some(message) = resp["error"]["message"].as_str() {
                return Err(LlmError::ApiError {
                    status: resp["error"]["code"].as_u64().unwrap_or(500) as u16,
                    message: message.to_string(),
                });
            }
            resp["choices"][0]["message"]["content"]
                .as_str()
                .map(String::from)
                .ok_or_else(|| LlmError::ParseError("missing choices[0].message.content".into()))
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
            collect_stream(response.bytes_stream(), decode_sse_line, on_delta).await
        })
        .await
    }
}

#[async_trait]
impl Transcriber for OpenAiCompatProvider {
    async fn transcribe(
        &self,
        model: &str,
        audio: AudioUpload<'_>,
        prompt: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        let url = format!("{}/v1/audio/transcriptions", self.base_url);
        let file_part = reqwest::multipart::Part::bytes(audio.bytes.to_vec())
            .file_name(audio.filename.to_string())
            .mime_str(audio.mime)?;
        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", model.to_string())
            .text("response_format", "json");
        if let Some(prompt) = prompt.filter(|p| !p.trim().is_empty()) {
            form = form.text("prompt", prompt.to_string());
        }

        debug!(provider = self.name, url = %url, "transcription request");

        run_cancellable(cancel, async {
            let response = self
                .authorize(self.client.post(&url))
                .multipart(form)
                .send()
                .await?;
            let status = response.status().as_u16();
            if !response.status().is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::from_response(status, &body));
            }
            let resp: Value = response.json().await?;
            resp["text"]
                .as_str()
                .map(String::from)
                .ok_or_else(|| LlmError::ParseError("missing text in transcription".into()))
        })
        .await
    }
}
