//! Handlers that send the file to an inference backend.

use docslice_core::ValidationError;
use docslice_llm::{
    AudioUpload, ChatBackend, ChatRequest, ContentPart, Message, OllamaProvider,
    OpenAiCompatProvider, Transcriber,
};
use futures::future::BoxFuture;
use serde_json::json;
use tracing::debug;

use super::dispatch::DocumentParser;
use super::error::ParseError;
use super::options::{non_blank, prompt_or_default, ParseOptions};
use super::progress::ProgressReporter;
use super::ParseResult;
use crate::document::{media, split_pdf_batches};

type HandlerFuture<'a> = BoxFuture<'a, Result<ParseResult, ParseError>>;

const VLLM_MAX_TOKENS: u32 = 4096;
const VLLM_TEMPERATURE: f32 = 0.2;

// ── Handler table entries ───────────────────────────────────────────────────

pub(super) fn openrouter_pdf<'a>(_: &'a DocumentParser, opts: &'a ParseOptions) -> HandlerFuture<'a> {
    Box::pin(openrouter_pdf_impl(opts))
}

pub(super) fn openrouter_image<'a>(_: &'a DocumentParser, opts: &'a ParseOptions) -> HandlerFuture<'a> {
    Box::pin(openrouter_image_impl(opts))
}

pub(super) fn openrouter_audio<'a>(_: &'a DocumentParser, opts: &'a ParseOptions) -> HandlerFuture<'a> {
    Box::pin(openrouter_audio_impl(opts))
}

pub(super) fn openrouter_video<'a>(_: &'a DocumentParser, opts: &'a ParseOptions) -> HandlerFuture<'a> {
    Box::pin(openrouter_video_impl(opts))
}

pub(super) fn ollama_pdf<'a>(parser: &'a DocumentParser, opts: &'a ParseOptions) -> HandlerFuture<'a> {
    Box::pin(ollama_pdf_impl(parser, opts))
}

pub(super) fn ollama_image<'a>(_: &'a DocumentParser, opts: &'a ParseOptions) -> HandlerFuture<'a> {
    Box::pin(ollama_image_impl(opts))
}

pub(super) fn vllm_pdf<'a>(parser: &'a DocumentParser, opts: &'a ParseOptions) -> HandlerFuture<'a> {
    Box::pin(vllm_pdf_impl(parser, opts))
}

pub(super) fn vllm_image<'a>(_: &'a DocumentParser, opts: &'a ParseOptions) -> HandlerFuture<'a> {
    Box::pin(vllm_image_impl(opts))
}

pub(super) fn vllm_audio<'a>(_: &'a DocumentParser, opts: &'a ParseOptions) -> HandlerFuture<'a> {
    Box::pin(vllm_audio_impl(opts))
}

pub(super) fn vllm_video<'a>(_: &'a DocumentParser, opts: &'a ParseOptions) -> HandlerFuture<'a> {
    Box::pin(vllm_video_impl(opts))
}

// ── OpenRouter ──────────────────────────────────────────────────────────────

struct OpenRouter<'a> {
    provider: OpenAiCompatProvider,
    model: &'a str,
    prompt: &'a str,
}

fn openrouter(opts: &ParseOptions) -> Result<OpenRouter<'_>, ParseError> {
    let api_key = non_blank(&opts.openrouter.api_key)
        .ok_or(ValidationError::MissingParameter("OpenRouter API key"))?;
    let model = non_blank(&opts.openrouter.model)
        .ok_or(ValidationError::MissingParameter("OpenRouter model"))?;
    Ok(OpenRouter {
        provider: OpenAiCompatProvider::openrouter(
            api_key.to_string(),
            opts.openrouter.base_url.clone(),
        ),
        model,
        prompt: prompt_or_default(&opts.openrouter.prompt),
    })
}

/// The whole PDF, or page batches when a batch size is set.
fn pdf_parts(opts: &ParseOptions) -> Result<Vec<(String, Vec<u8>)>, ParseError> {
    match opts.openrouter.pages_per_batch {
        Some(per_batch) if per_batch > 0 => {
            let stem = opts.file.stem();
            Ok(split_pdf_batches(opts.file.bytes(), per_batch)?
                .into_iter()
                .map(|b| {
                    let name = format!("{stem}-p{}-{}.pdf", b.first_page, b.last_page);
                    (name, b.bytes)
                })
                .collect())
        }
        _ => Ok(vec![(opts.file.name().to_string(), opts.file.bytes().to_vec())]),
    }
}

async fn openrouter_pdf_impl(opts: &ParseOptions) -> Result<ParseResult, ParseError> {
    let backend = openrouter(opts)?;
    let parts = pdf_parts(opts)?;
    let plugins = json!([{
        "id": "file-parser",
        "pdf": { "engine": opts.openrouter.pdf_engine.as_str() },
    }]);

    let total = parts.len();
    let mut progress = ProgressReporter::new(opts.on_progress.clone());
    progress.report(0, total);

    let mut texts = Vec::with_capacity(total);
    for (i, (filename, bytes)) in parts.into_iter().enumerate() {
        let request = ChatRequest::new(
            backend.model,
            vec![Message::user(vec![
                ContentPart::Text(backend.prompt.to_string()),
                ContentPart::File {
                    filename,
                    data_url: media::data_url("application/pdf", &bytes),
                },
            ])],
        )
        .with_plugins(plugins.clone());
        debug!(batch = i + 1, total, engine = %opts.openrouter.pdf_engine, "sending PDF to OpenRouter");
        texts.push(backend.provider.complete(&request, &opts.cancel).await?);
        progress.report(i + 1, total);
    }
    Ok(ParseResult::text(join_sections(texts)))
}

async fn openrouter_image_impl(opts: &ParseOptions) -> Result<ParseResult, ParseError> {
    let backend = openrouter(opts)?;
    let request = ChatRequest::new(
        backend.model,
        vec![Message::user(vec![
            ContentPart::Text(backend.prompt.to_string()),
            ContentPart::ImageUrl(media::data_url(&opts.file.mime(), opts.file.bytes())),
        ])],
    );
    let text = backend.provider.complete(&request, &opts.cancel).await?;
    Ok(ParseResult::text(text.trim()))
}

async fn openrouter_audio_impl(opts: &ParseOptions) -> Result<ParseResult, ParseError> {
    let backend = openrouter(opts)?;
    let request = ChatRequest::new(
        backend.model,
        vec![Message::user(vec![
            ContentPart::Text(backend.prompt.to_string()),
            ContentPart::InputAudio {
                data: media::encode_base64(opts.file.bytes()),
                format: media::audio_format(&opts.file.extension()),
            },
        ])],
    );
    let text = backend.provider.complete(&request, &opts.cancel).await?;
    Ok(ParseResult::text(text.trim()))
}

async fn openrouter_video_impl(opts: &ParseOptions) -> Result<ParseResult, ParseError> {
    let backend = openrouter(opts)?;
    video(&backend.provider, opts, backend.model, backend.prompt, std::convert::identity).await
}

// ── Ollama ──────────────────────────────────────────────────────────────────

fn ollama(opts: &ParseOptions) -> Result<(OllamaProvider, &str, &str), ParseError> {
    let model =
        non_blank(&opts.ollama.model).ok_or(ValidationError::MissingParameter("Ollama model"))?;
    Ok((
        OllamaProvider::new(opts.ollama.endpoint.clone()),
        model,
        prompt_or_default(&opts.ollama.prompt),
    ))
}

async fn ollama_pdf_impl(
    parser: &DocumentParser,
    opts: &ParseOptions,
) -> Result<ParseResult, ParseError> {
    let (provider, model, prompt) = ollama(opts)?;
    vision_pages(parser, &provider, opts, model, prompt, std::convert::identity).await
}

async fn ollama_image_impl(opts: &ParseOptions) -> Result<ParseResult, ParseError> {
    let (provider, model, prompt) = ollama(opts)?;
    let request = image_request(model, prompt, &opts.file.mime(), opts.file.bytes());
    let text = provider.complete(&request, &opts.cancel).await?;
    Ok(ParseResult::text(text.trim()))
}

// ── vLLM ────────────────────────────────────────────────────────────────────

fn vllm(opts: &ParseOptions) -> Result<(OpenAiCompatProvider, &str, &str), ParseError> {
    let model =
        non_blank(&opts.vllm.model).ok_or(ValidationError::MissingParameter("vLLM model"))?;
    Ok((
        OpenAiCompatProvider::vllm(opts.vllm.endpoint.clone()),
        model,
        prompt_or_default(&opts.vllm.prompt),
    ))
}

fn vllm_sampling(request: ChatRequest) -> ChatRequest {
    request
        .with_max_tokens(VLLM_MAX_TOKENS)
        .with_temperature(VLLM_TEMPERATURE)
}

async fn vllm_pdf_impl(
    parser: &DocumentParser,
    opts: &ParseOptions,
) -> Result<ParseResult, ParseError> {
    let (provider, model, prompt) = vllm(opts)?;
    vision_pages(parser, &provider, opts, model, prompt, vllm_sampling).await
}

async fn vllm_image_impl(opts: &ParseOptions) -> Result<ParseResult, ParseError> {
    let (provider, model, prompt) = vllm(opts)?;
    let request = vllm_sampling(image_request(model, prompt, &opts.file.mime(), opts.file.bytes()));
    let text = provider.complete(&request, &opts.cancel).await?;
    Ok(ParseResult::text(text.trim()))
}

/// Transcription; the prompt is only a hint here, so no default is sent.
async fn vllm_audio_impl(opts: &ParseOptions) -> Result<ParseResult, ParseError> {
    let (provider, model, _) = vllm(opts)?;
    let mime = opts.file.mime();
    let audio = AudioUpload {
        filename: opts.file.name(),
        mime: &mime,
        bytes: opts.file.bytes(),
    };
    let text = provider
        .transcribe(model, audio, non_blank(&opts.vllm.prompt), &opts.cancel)
        .await?;
    Ok(ParseResult::text(text.trim()))
}

async fn vllm_video_impl(opts: &ParseOptions) -> Result<ParseResult, ParseError> {
    let (provider, model, prompt) = vllm(opts)?;
    video(&provider, opts, model, prompt, vllm_sampling).await
}

// ── Shared flows ────────────────────────────────────────────────────────────

fn image_request(model: &str, prompt: &str, mime: &str, bytes: &[u8]) -> ChatRequest {
    ChatRequest::new(
        model,
        vec![Message::user(vec![
            ContentPart::Text(prompt.to_string()),
            ContentPart::ImageUrl(media::data_url(mime, bytes)),
        ])],
    )
}

/// One request carrying the whole video, reported as a single unit of work.
async fn video(
    backend: &dyn ChatBackend,
    opts: &ParseOptions,
    model: &str,
    prompt: &str,
    tune: fn(ChatRequest) -> ChatRequest,
) -> Result<ParseResult, ParseError> {
    let mut progress = ProgressReporter::new(opts.on_progress.clone());
    progress.report(0, 1);
    let request = tune(ChatRequest::new(
        model,
        vec![Message::user(vec![
            ContentPart::Text(prompt.to_string()),
            ContentPart::VideoUrl(media::data_url(&opts.file.mime(), opts.file.bytes())),
        ])],
    ));
    debug!(backend = backend.name(), bytes = opts.file.len(), "sending video");
    let text = backend.complete(&request, &opts.cancel).await?;
    progress.report(1, 1);
    Ok(ParseResult::text(text.trim()))
}

/// Rasterise the PDF and send each page image on its own, in order.
async fn vision_pages(
    parser: &DocumentParser,
    backend: &dyn ChatBackend,
    opts: &ParseOptions,
    model: &str,
    prompt: &str,
    tune: fn(ChatRequest) -> ChatRequest,
) -> Result<ParseResult, ParseError> {
    let pages = tokio::select! {
        biased;
        _ = opts.cancel.cancelled() => return Err(ParseError::Cancelled),
        pages = parser.renderer.render_pages(opts.file.bytes()) => pages?,
    };

    let total = pages.len();
    let mut progress = ProgressReporter::new(opts.on_progress.clone());
    progress.report(0, total);

    let mut texts = Vec::with_capacity(total);
    for (i, png) in pages.iter().enumerate() {
        let page = i + 1;
        let request = tune(image_request(model, prompt, "image/png", png));
        debug!(backend = backend.name(), page, total, "sending page");
        let text = match &opts.on_page_stream {
            Some(stream) => {
                let sink = |delta: &str| stream(page, delta);
                backend.complete_streaming(&request, &opts.cancel, &sink).await?
            }
            None => backend.complete(&request, &opts.cancel).await?,
        };
        texts.push(text);
        progress.report(page, total);
    }
    Ok(ParseResult::text(join_sections(texts)))
}

/// Trimmed, non-empty sections separated by a blank line.
fn join_sections(texts: Vec<String>) -> String {
    texts
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_drop_blanks() {
        let joined = join_sections(vec![" one ".into(), "\n".into(), "two".into()]);
        assert_eq!(joined, "one\n\ntwo");
    }

    #[test]
    fn vllm_sampling_matches_vision_defaults() {
        let request = vllm_sampling(ChatRequest::new("m", Vec::new()));
        assert_eq!(request.max_tokens, Some(4096));
        assert_eq!(request.temperature, Some(0.2));
    }
}
