use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use docslice_core::{Pipeline, ValidationError};
use docslice_ingest::document::{ExtractionError, PageRenderer};
use docslice_ingest::parse::{DocumentParser, ParseError, ParseOptions, Progress};
use docslice_ingest::SourceFile;
use docslice_llm::{CancellationToken, LlmError};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

struct FakeRenderer {
    pages: usize,
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render_pages(&self, _pdf: &[u8]) -> Result<Vec<Vec<u8>>, ExtractionError> {
        Ok((0..self.pages).map(|i| vec![0x89, b'P', b'N', b'G', i as u8]).collect())
    }
}

fn parser_with_pages(pages: usize) -> DocumentParser {
    DocumentParser::new(Arc::new(FakeRenderer { pages }))
}

fn blank_pdf(n: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for _ in 0..n {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(Object::Reference(page_id));
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => n as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn chat_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": text } }]
    }))
}

fn progress_log() -> (Arc<Mutex<Vec<Progress>>>, impl Fn(Progress) + Send + Sync + 'static) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    (log, move |p: Progress| sink.lock().unwrap().push(p))
}

fn openrouter_opts(file: SourceFile, pipeline: Pipeline, server: &MockServer) -> ParseOptions {
    let mut opts = ParseOptions::new(file, pipeline);
    opts.openrouter.api_key = Some("sk-or-test".into());
    opts.openrouter.model = Some("google/gemini-2.5-flash".into());
    opts.openrouter.base_url = Some(server.uri());
    opts
}

fn body(request: &Request) -> Value {
    serde_json::from_slice(&request.body).unwrap()
}

// ── Local pipelines ─────────────────────────────────────────────────

#[tokio::test]
async fn simple_text_reads_plain_files() {
    let file = SourceFile::new("notes.txt", b"\n  Meeting notes\n\nAction items  \n".to_vec());
    let opts = ParseOptions::new(file, Pipeline::SimpleText);
    let result = DocumentParser::default().parse(&opts).await.unwrap();
    assert_eq!(result.content, "Meeting notes\n\nAction items");
    assert_eq!(result.rows, None);
}

#[tokio::test]
async fn spreadsheet_without_column_is_validation_error() {
    let file = SourceFile::new("faq.csv", b"question,answer\nwhy,because\n".to_vec());
    for opts in [
        ParseOptions::new(file.clone(), Pipeline::CsvSpreadsheet),
        ParseOptions::new(file.clone(), Pipeline::CsvSpreadsheet).with_column("   "),
    ] {
        let err = DocumentParser::default().parse(&opts).await.unwrap_err();
        assert!(matches!(err, ParseError::Validation(ValidationError::ColumnRequired)));
        assert_eq!(err.to_string(), "Column must be specified");
    }
}

#[tokio::test]
async fn column_required_before_workbook_is_opened() {
    // Not a valid workbook: reading it would be a decode error.
    let file = SourceFile::new("broken.xlsx", b"garbage".to_vec());
    let opts = ParseOptions::new(file, Pipeline::ExcelSpreadsheet);
    let err = DocumentParser::default().parse(&opts).await.unwrap_err();
    assert!(matches!(err, ParseError::Validation(ValidationError::ColumnRequired)));
}

#[tokio::test]
async fn csv_column_becomes_rows() {
    let csv = "id,question\n1,What is chunking?\n2,\n3,How big is a chunk?\n";
    let file = SourceFile::new("faq.csv", csv.as_bytes().to_vec());
    let opts = ParseOptions::new(file, Pipeline::CsvSpreadsheet).with_column("question");
    let result = DocumentParser::default().parse(&opts).await.unwrap();
    assert_eq!(
        result.rows,
        Some(vec!["What is chunking?".to_string(), "How big is a chunk?".to_string()])
    );
    assert_eq!(result.content, "What is chunking?\n\nHow big is a chunk?");
}

fn faq_workbook() -> Vec<u8> {
    let mut book = rust_xlsxwriter::Workbook::new();
    {
        let cover = book.add_worksheet();
        cover.set_name("Cover").unwrap();
        cover.write_string(0, 0, "title").unwrap();
        cover.write_string(1, 0, "Support FAQ").unwrap();
    }
    {
        let faq = book.add_worksheet();
        faq.set_name("FAQ").unwrap();
        faq.write_string(0, 0, "question").unwrap();
        faq.write_string(0, 1, "question").unwrap();
        faq.write_string(1, 0, "old wording").unwrap();
        faq.write_string(1, 1, "How do I reset my password?").unwrap();
        faq.write_string(3, 1, "Can I export my data?").unwrap();
    }
    book.save_to_buffer().unwrap()
}

#[tokio::test]
async fn excel_named_sheet_becomes_rows() {
    let file = SourceFile::new("faq.xlsx", faq_workbook());
    let opts = ParseOptions::new(file, Pipeline::ExcelSpreadsheet)
        .with_column("question")
        .with_sheet("FAQ");
    let result = DocumentParser::default().parse(&opts).await.unwrap();
    assert_eq!(
        result.rows,
        Some(vec![
            "How do I reset my password?".to_string(),
            "Can I export my data?".to_string()
        ])
    );
    assert_eq!(result.content, "How do I reset my password?\n\nCan I export my data?");
}

#[tokio::test]
async fn excel_defaults_to_first_sheet() {
    let file = SourceFile::new("faq.xlsx", faq_workbook());
    let opts = ParseOptions::new(file, Pipeline::ExcelSpreadsheet).with_column("title");
    let result = DocumentParser::default().parse(&opts).await.unwrap();
    assert_eq!(result.rows, Some(vec!["Support FAQ".to_string()]));
}

#[tokio::test]
async fn excel_unknown_sheet_is_validation_error() {
    let file = SourceFile::new("faq.xlsx", faq_workbook());
    let opts = ParseOptions::new(file, Pipeline::ExcelSpreadsheet)
        .with_column("question")
        .with_sheet("Archive");
    let err = DocumentParser::default().parse(&opts).await.unwrap_err();
    assert!(matches!(err, ParseError::Validation(ValidationError::SheetNotFound(s)) if s == "Archive"));
}

#[tokio::test]
async fn unknown_column_is_validation_error() {
    let file = SourceFile::new("faq.csv", b"question\nq\n".to_vec());
    let opts = ParseOptions::new(file, Pipeline::CsvSpreadsheet).with_column("answer");
    let err = DocumentParser::default().parse(&opts).await.unwrap_err();
    assert!(matches!(err, ParseError::Validation(ValidationError::ColumnNotFound(c)) if c == "answer"));
}

#[tokio::test]
async fn incompatible_extension_rejected() {
    let file = SourceFile::new("photo.png", vec![1, 2, 3]);
    let opts = ParseOptions::new(file, Pipeline::SimpleText);
    let err = DocumentParser::default().parse(&opts).await.unwrap_err();
    assert!(matches!(err, ParseError::Validation(ValidationError::IncompatibleExtension { .. })));
}

#[tokio::test]
async fn corrupt_pdf_is_decode_error() {
    let file = SourceFile::new("broken.pdf", b"%PDF-1.4 nonsense".to_vec());
    let opts = ParseOptions::new(file, Pipeline::SimpleText);
    let err = DocumentParser::default().parse(&opts).await.unwrap_err();
    assert!(matches!(err, ParseError::Decode(_)));
}

#[tokio::test]
async fn local_pipelines_ignore_cancellation() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let file = SourceFile::new("a.md", b"# Heading".to_vec());
    let opts = ParseOptions::new(file, Pipeline::SimpleText).with_cancel(cancel);
    let result = DocumentParser::default().parse(&opts).await.unwrap();
    assert_eq!(result.content, "# Heading");
}

// ── Cancellation ────────────────────────────────────────────────────

#[tokio::test]
async fn cancelled_remote_pipelines_send_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(chat_reply("should not be reached"))
        .expect(0)
        .mount(&server)
        .await;

    let cases = [
        (Pipeline::OpenrouterPdf, "doc.pdf"),
        (Pipeline::OpenrouterImage, "scan.png"),
        (Pipeline::OpenrouterAudio, "talk.mp3"),
        (Pipeline::OpenrouterVideo, "clip.mp4"),
        (Pipeline::OllamaPdf, "doc.pdf"),
        (Pipeline::OllamaImage, "scan.jpg"),
        (Pipeline::VllmPdf, "doc.pdf"),
        (Pipeline::VllmImage, "scan.webp"),
        (Pipeline::VllmAudio, "talk.wav"),
        (Pipeline::VllmVideo, "clip.webm"),
    ];
    for (pipeline, name) in cases {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut opts = openrouter_opts(SourceFile::new(name, blank_pdf(1)), pipeline, &server)
            .with_cancel(cancel);
        opts.ollama.endpoint = Some(server.uri());
        opts.ollama.model = Some("llava".into());
        opts.vllm.endpoint = Some(server.uri());
        opts.vllm.model = Some("qwen".into());

        let err = parser_with_pages(2).parse(&opts).await.unwrap_err();
        assert!(err.is_cancelled(), "{pipeline}: {err}");
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_during_request_aborts_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(chat_reply("late").set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let opts = openrouter_opts(
        SourceFile::new("scan.png", vec![1, 2, 3]),
        Pipeline::OpenrouterImage,
        &server,
    )
    .with_cancel(cancel.clone());

    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });
    let started = std::time::Instant::now();
    let err = DocumentParser::default().parse(&opts).await.unwrap_err();
    trigger.await.unwrap();

    assert!(matches!(err, ParseError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn deadline_becomes_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(chat_reply("late").set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let opts = openrouter_opts(
        SourceFile::new("scan.png", vec![1, 2, 3]),
        Pipeline::OpenrouterImage,
        &server,
    )
    .with_timeout(Duration::from_millis(100));

    let err = DocumentParser::default().parse(&opts).await.unwrap_err();
    assert!(matches!(err, ParseError::Backend(LlmError::Timeout(_))), "{err}");
}

// ── OpenRouter ──────────────────────────────────────────────────────

#[tokio::test]
async fn openrouter_requires_key_and_model() {
    let server = MockServer::start().await;
    let mut opts = openrouter_opts(SourceFile::new("scan.png", vec![1]), Pipeline::OpenrouterImage, &server);
    opts.openrouter.api_key = None;
    let err = DocumentParser::default().parse(&opts).await.unwrap_err();
    assert!(matches!(
        err,
        ParseError::Validation(ValidationError::MissingParameter("OpenRouter API key"))
    ));

    opts.openrouter.api_key = Some("sk".into());
    opts.openrouter.model = None;
    let err = DocumentParser::default().parse(&opts).await.unwrap_err();
    assert!(matches!(err, ParseError::Validation(ValidationError::MissingParameter(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn openrouter_image_sends_data_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-or-test"))
        .respond_with(chat_reply("  A receipt for 12 EUR.  "))
        .expect(1)
        .mount(&server)
        .await;

    let opts = openrouter_opts(SourceFile::new("receipt.png", b"png".to_vec()), Pipeline::OpenrouterImage, &server);
    let result = DocumentParser::default().parse(&opts).await.unwrap();
    assert_eq!(result.content, "A receipt for 12 EUR.");

    let requests = server.received_requests().await.unwrap();
    let sent = body(&requests[0]);
    let parts = &sent["messages"][0]["content"];
    assert_eq!(parts[0]["type"], "text");
    assert!(parts[0]["text"].as_str().unwrap().contains("Extract all text"));
    assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,cG5n");
}

#[tokio::test]
async fn openrouter_pdf_batches_pages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_reply("batch text"))
        .expect(2)
        .mount(&server)
        .await;

    let (log, on_progress) = progress_log();
    let mut opts = openrouter_opts(SourceFile::new("report.pdf", blank_pdf(3)), Pipeline::OpenrouterPdf, &server)
        .on_progress(on_progress);
    opts.openrouter.pages_per_batch = Some(2);
    opts.openrouter.pdf_engine = "mistral-ocr".parse().unwrap();
    opts.openrouter.prompt = Some("Transcribe".into());

    let result = DocumentParser::default().parse(&opts).await.unwrap();
    assert_eq!(result.content, "batch text\n\nbatch text");

    let seen: Vec<(usize, usize)> = log.lock().unwrap().iter().map(|p| (p.completed, p.total)).collect();
    assert_eq!(seen, vec![(0, 2), (1, 2), (2, 2)]);

    let requests = server.received_requests().await.unwrap();
    let first = body(&requests[0]);
    assert_eq!(first["plugins"][0]["id"], "file-parser");
    assert_eq!(first["plugins"][0]["pdf"]["engine"], "mistral-ocr");
    let file = &first["messages"][0]["content"][1];
    assert_eq!(file["type"], "file");
    assert_eq!(file["file"]["filename"], "report-p1-2.pdf");
    assert!(file["file"]["file_data"]
        .as_str()
        .unwrap()
        .starts_with("data:application/pdf;base64,"));
    assert_eq!(first["messages"][0]["content"][0]["text"], "Transcribe");
}

#[tokio::test]
async fn openrouter_error_keeps_remote_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": { "message": "Insufficient credits" }
        })))
        .mount(&server)
        .await;

    let opts = openrouter_opts(SourceFile::new("talk.mp3", vec![0; 8]), Pipeline::OpenrouterAudio, &server);
    let err = DocumentParser::default().parse(&opts).await.unwrap_err();
    match err {
        ParseError::Backend(LlmError::ApiError { status, message }) => {
            assert_eq!(status, 402);
            assert_eq!(message, "Insufficient credits");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn openrouter_video_reports_single_unit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(chat_reply("A cat walks by."))
        .mount(&server)
        .await;

    let (log, on_progress) = progress_log();
    let opts = openrouter_opts(SourceFile::new("clip.mp4", vec![0; 16]), Pipeline::OpenrouterVideo, &server)
        .on_progress(on_progress);
    let result = DocumentParser::default().parse(&opts).await.unwrap();
    assert_eq!(result.content, "A cat walks by.");
    assert_eq!(
        *log.lock().unwrap(),
        vec![Progress { completed: 0, total: 1 }, Progress { completed: 1, total: 1 }]
    );

    let requests = server.received_requests().await.unwrap();
    let part = &body(&requests[0])["messages"][0]["content"][1];
    assert_eq!(part["type"], "video_url");
    assert!(part["video_url"]["url"].as_str().unwrap().starts_with("data:video/mp4;base64,"));
}

// ── Ollama / vLLM ───────────────────────────────────────────────────

#[tokio::test]
async fn ollama_pdf_streams_each_page() {
    let server = MockServer::start().await;
    let ndjson = "{\"message\":{\"content\":\"Page \"},\"done\":false}\n\
                  {\"message\":{\"content\":\"text\"},\"done\":false}\n\
                  {\"message\":{\"content\":\"\"},\"done\":true}\n";
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(ndjson, "application/x-ndjson"))
        .expect(3)
        .mount(&server)
        .await;

    let (log, on_progress) = progress_log();
    let deltas = Arc::new(Mutex::new(Vec::new()));
    let sink = deltas.clone();
    let mut opts = ParseOptions::new(SourceFile::new("scan.pdf", blank_pdf(3)), Pipeline::OllamaPdf)
        .on_progress(on_progress)
        .on_page_stream(move |page, delta| sink.lock().unwrap().push((page, delta.to_string())));
    opts.ollama.endpoint = Some(server.uri());
    opts.ollama.model = Some("llama3.2-vision".into());

    let result = parser_with_pages(3).parse(&opts).await.unwrap();
    assert_eq!(result.content, "Page text\n\nPage text\n\nPage text");

    let seen: Vec<(usize, usize)> = log.lock().unwrap().iter().map(|p| (p.completed, p.total)).collect();
    assert_eq!(seen, vec![(0, 3), (1, 3), (2, 3), (3, 3)]);

    let deltas = deltas.lock().unwrap();
    assert_eq!(deltas.len(), 6);
    assert_eq!(deltas[0], (1, "Page ".to_string()));
    assert_eq!(deltas[5], (3, "text".to_string()));

    let requests = server.received_requests().await.unwrap();
    let sent = body(&requests[0]);
    assert_eq!(sent["stream"], true);
    assert!(sent["messages"][0]["images"][0].as_str().is_some());
}

#[tokio::test]
async fn ollama_requires_model() {
    let opts = ParseOptions::new(SourceFile::new("scan.png", vec![1]), Pipeline::OllamaImage);
    let err = DocumentParser::default().parse(&opts).await.unwrap_err();
    assert!(matches!(err, ParseError::Validation(ValidationError::MissingParameter("Ollama model"))));
}

#[tokio::test]
async fn vllm_pdf_without_stream_callback_uses_plain_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_reply("page"))
        .expect(2)
        .mount(&server)
        .await;

    let mut opts = ParseOptions::new(SourceFile::new("scan.pdf", blank_pdf(2)), Pipeline::VllmPdf);
    opts.vllm.endpoint = Some(server.uri());
    opts.vllm.model = Some("Qwen/Qwen2.5-VL-7B-Instruct".into());

    let result = parser_with_pages(2).parse(&opts).await.unwrap();
    assert_eq!(result.content, "page\n\npage");

    let requests = server.received_requests().await.unwrap();
    let sent = body(&requests[1]);
    assert_eq!(sent["stream"], false);
    assert_eq!(sent["max_tokens"], 4096);
    assert_eq!(
        sent["messages"][0]["content"][1]["image_url"]["url"]
            .as_str()
            .unwrap()
            .split(',')
            .next(),
        Some("data:image/png;base64")
    );
}

#[tokio::test]
async fn vllm_image_uses_sampling_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(chat_reply("diagram"))
        .mount(&server)
        .await;

    let mut opts = ParseOptions::new(SourceFile::new("d.jpeg", vec![9; 4]), Pipeline::VllmImage);
    opts.vllm.endpoint = Some(server.uri());
    opts.vllm.model = Some("qwen".into());

    DocumentParser::default().parse(&opts).await.unwrap();
    let sent = body(&server.received_requests().await.unwrap()[0]);
    assert_eq!(sent["max_tokens"], 4096);
    let temp = sent["temperature"].as_f64().unwrap();
    assert!((temp - 0.2).abs() < 1e-6);
}

#[tokio::test]
async fn vllm_audio_transcribes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": " Hello there. " })))
        .expect(1)
        .mount(&server)
        .await;

    let mut opts = ParseOptions::new(SourceFile::new("memo.wav", vec![0; 32]), Pipeline::VllmAudio);
    opts.vllm.endpoint = Some(server.uri());
    opts.vllm.model = Some("openai/whisper-large-v3".into());

    let result = DocumentParser::default().parse(&opts).await.unwrap();
    assert_eq!(result.content, "Hello there.");
}
