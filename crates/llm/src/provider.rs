use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// A chat message for a multimodal model.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl Message {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn user(content: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }

    /// All text parts joined with newlines.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One piece of a multimodal message. Binary payloads travel as data URLs
/// (`data:<mime>;base64,<payload>`) or raw base64 for audio.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    ImageUrl(String),
    File { filename: String, data_url: String },
    InputAudio { data: String, format: String },
    VideoUrl(String),
}

/// A single chat completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Provider-specific plugin block (OpenRouter `plugins`), passed through verbatim.
    pub plugins: Option<serde_json::Value>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            plugins: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_plugins(mut self, plugins: serde_json::Value) -> Self {
        self.plugins = Some(plugins);
        self
    }
}

/// Receives text fragments as the model produces them.
pub type DeltaSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// A chat backend. One implementation per inference server.
///
/// Every call takes the caller's cancellation token; once it fires the
/// in-flight request is dropped and [`LlmError::Cancelled`] is returned.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Send a chat completion request and return the assistant's response text.
    async fn complete(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError>;

    /// Like [`complete`](Self::complete) but reports text as it arrives.
    /// Backends without streaming deliver the whole answer as one delta.
    async fn complete_streaming(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
        on_delta: DeltaSink<'_>,
    ) -> Result<String, LlmError> {
        let text = self.complete(request, cancel).await?;
        on_delta(&text);
        Ok(text)
    }
}

/// Audio file to send to a transcription endpoint.
#[derive(Debug, Clone)]
pub struct AudioUpload<'a> {
    pub filename: &'a str,
    pub mime: &'a str,
    pub bytes: &'a [u8],
}

/// Speech-to-text backends.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        model: &str,
        audio: AudioUpload<'_>,
        prompt: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("stream error: {0}")]
    StreamError(String),
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("request cancelled")]
    Cancelled,
}

impl LlmError {
    /// Build an API error from a non-2xx response body, preferring the
    /// remote-supplied message over a generic status line.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|v| {
                v["error"]["message"]
                    .as_str()
                    .or_else(|| v["error"].as_str())
                    .or_else(|| v["message"].as_str())
                    .or_else(|| v["detail"].as_str())
                    .map(String::from)
            })
            .unwrap_or_else(|| format!("request failed with status {status}"));
        LlmError::ApiError { status, message }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, LlmError::Cancelled)
    }
}
