use std::sync::Arc;
use std::time::Instant;

use docslice_core::Pipeline;
use docslice_llm::LlmError;
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use super::error::ParseError;
use super::options::ParseOptions;
use super::{local, remote, ParseResult};
use crate::document::{PageRenderer, PdftoppmRenderer};

/// Extraction routine for one pipeline.
pub type Handler =
    for<'a> fn(&'a DocumentParser, &'a ParseOptions) -> BoxFuture<'a, Result<ParseResult, ParseError>>;

/// The handler table.
pub fn handler_for(pipeline: Pipeline) -> Handler {
    match pipeline {
        Pipeline::SimpleText => local::simple_text,
        Pipeline::ExcelSpreadsheet | Pipeline::CsvSpreadsheet => local::spreadsheet,
        Pipeline::OpenrouterPdf => remote::openrouter_pdf,
        Pipeline::OpenrouterImage => remote::openrouter_image,
        Pipeline::OpenrouterAudio => remote::openrouter_audio,
        Pipeline::OpenrouterVideo => remote::openrouter_video,
        Pipeline::OllamaPdf => remote::ollama_pdf,
        Pipeline::OllamaImage => remote::ollama_image,
        Pipeline::VllmPdf => remote::vllm_pdf,
        Pipeline::VllmImage => remote::vllm_image,
        Pipeline::VllmAudio => remote::vllm_audio,
        Pipeline::VllmVideo => remote::vllm_video,
    }
}

/// Runs parse requests. Holds the collaborators handlers need beyond the
/// options themselves.
pub struct DocumentParser {
    pub(super) renderer: Arc<dyn PageRenderer>,
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self {
            renderer: Arc::new(PdftoppmRenderer::default()),
        }
    }
}

impl DocumentParser {
    pub fn new(renderer: Arc<dyn PageRenderer>) -> Self {
        Self { renderer }
    }

    pub async fn parse(&self, opts: &ParseOptions) -> Result<ParseResult, ParseError> {
        let pipeline = opts.pipeline;
        pipeline.check_extension(&opts.file.extension())?;
        debug!(file = opts.file.name(), %pipeline, bytes = opts.file.len(), "parse started");

        let started = Instant::now();
        let handler = handler_for(pipeline);
        let result = if pipeline.is_remote() {
            self.run_remote(handler, opts).await
        } else {
            handler(self, opts).await
        };

        match &result {
            Ok(parsed) => info!(
                file = opts.file.name(),
                %pipeline,
                chars = parsed.content.chars().count(),
                rows = parsed.rows.as_ref().map(Vec::len),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "parse completed"
            ),
            Err(ParseError::Cancelled) => info!(file = opts.file.name(), %pipeline, "parse cancelled"),
            Err(e) => warn!(file = opts.file.name(), %pipeline, error = %e, "parse failed"),
        }
        result
    }

    /// Remote handlers never start once cancelled, and are dropped (aborting
    /// any request in flight) when the deadline passes.
    async fn run_remote(
        &self,
        handler: Handler,
        opts: &ParseOptions,
    ) -> Result<ParseResult, ParseError> {
        if opts.cancel.is_cancelled() {
            return Err(ParseError::Cancelled);
        }
        let fut = handler(self, opts);
        match opts.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| ParseError::Backend(LlmError::Timeout(limit)))?,
            None => fut.await,
        }
    }
}

/// Parse with the default [`DocumentParser`].
pub async fn parse(opts: &ParseOptions) -> Result<ParseResult, ParseError> {
    DocumentParser::default().parse(opts).await
}
