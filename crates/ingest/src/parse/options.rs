//! Inputs to a parse call.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use docslice_core::config::DEFAULT_EXTRACTION_PROMPT;
use docslice_core::{Config, Pipeline, ValidationError};
use tokio_util::sync::CancellationToken;

use super::progress::{PageStreamCallback, Progress, ProgressCallback};
use crate::source::SourceFile;

/// How OpenRouter's file-parser plugin reads a PDF.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PdfEngine {
    /// Let the model read the PDF directly.
    #[default]
    Native,
    PdfText,
    MistralOcr,
}

impl PdfEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfEngine::Native => "native",
            PdfEngine::PdfText => "pdf-text",
            PdfEngine::MistralOcr => "mistral-ocr",
        }
    }
}

impl fmt::Display for PdfEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PdfEngine {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" => Ok(PdfEngine::Native),
            "pdf-text" => Ok(PdfEngine::PdfText),
            "mistral-ocr" => Ok(PdfEngine::MistralOcr),
            other => Err(ValidationError::Other(format!("unknown PDF engine: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OpenRouterParams {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub prompt: Option<String>,
    /// Split PDFs into batches of this many pages, one request each.
    pub pages_per_batch: Option<usize>,
    pub pdf_engine: PdfEngine,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OllamaParams {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VllmParams {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SpreadsheetParams {
    pub column: Option<String>,
    /// First sheet when unset.
    pub sheet: Option<String>,
}

/// A file, the pipeline to run on it, and everything that pipeline needs.
#[derive(Clone)]
pub struct ParseOptions {
    pub file: SourceFile,
    pub pipeline: Pipeline,
    pub openrouter: OpenRouterParams,
    pub ollama: OllamaParams,
    pub vllm: VllmParams,
    pub spreadsheet: SpreadsheetParams,
    /// Observed by remote pipelines only.
    pub cancel: CancellationToken,
    pub on_progress: Option<ProgressCallback>,
    pub on_page_stream: Option<PageStreamCallback>,
    /// Deadline for remote pipelines. None waits indefinitely.
    pub timeout: Option<Duration>,
}

impl ParseOptions {
    pub fn new(file: SourceFile, pipeline: Pipeline) -> Self {
        Self {
            file,
            pipeline,
            openrouter: OpenRouterParams::default(),
            ollama: OllamaParams::default(),
            vllm: VllmParams::default(),
            spreadsheet: SpreadsheetParams::default(),
            cancel: CancellationToken::new(),
            on_progress: None,
            on_page_stream: None,
            timeout: None,
        }
    }

    /// Backend parameters filled from configuration.
    pub fn from_config(
        file: SourceFile,
        pipeline: Pipeline,
        config: &Config,
    ) -> Result<Self, ValidationError> {
        let mut opts = Self::new(file, pipeline);
        opts.openrouter = OpenRouterParams {
            api_key: config.openrouter.api_key.clone(),
            model: Some(config.openrouter.model.clone()),
            prompt: Some(config.openrouter.prompt.clone()),
            pages_per_batch: config.openrouter.pages_per_batch,
            pdf_engine: config.openrouter.pdf_engine.parse()?,
            base_url: Some(config.openrouter.base_url.clone()),
        };
        opts.ollama = OllamaParams {
            endpoint: Some(config.ollama.url.clone()),
            model: Some(config.ollama.model.clone()),
            prompt: Some(config.ollama.prompt.clone()),
        };
        opts.vllm = VllmParams {
            endpoint: Some(config.vllm.url.clone()),
            model: Some(config.vllm.model.clone()),
            prompt: Some(config.vllm.prompt.clone()),
        };
        opts.timeout = config.request_timeout();
        Ok(opts)
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.spreadsheet.column = Some(column.into());
        self
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.spreadsheet.sheet = Some(sheet.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn on_page_stream(
        mut self,
        callback: impl Fn(usize, &str) + Send + Sync + 'static,
    ) -> Self {
        self.on_page_stream = Some(Arc::new(callback));
        self
    }
}

/// `Some(value)` unless missing or blank.
pub(super) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

pub(super) fn prompt_or_default(prompt: &Option<String>) -> &str {
    non_blank(prompt).unwrap_or(DEFAULT_EXTRACTION_PROMPT)
}
