//! The parsing dispatcher: one file plus a pipeline tag in, plain text out.
//!
//! Local pipelines (plain text, PDF/DOCX text layers, spreadsheet columns)
//! run to completion once started. Remote pipelines send the file to an
//! inference backend, honour the caller's cancellation token and deadline,
//! and report progress page by page or batch by batch.

mod dispatch;
mod error;
mod local;
mod options;
mod progress;
mod remote;

use serde::{Deserialize, Serialize};

pub use dispatch::{handler_for, parse, DocumentParser, Handler};
pub use error::ParseError;
pub use options::{
    OllamaParams, OpenRouterParams, ParseOptions, PdfEngine, SpreadsheetParams, VllmParams,
};
pub use progress::{PageStreamCallback, Progress, ProgressCallback, ProgressReporter};

/// Extracted text. `rows` is set only by spreadsheet pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<String>>,
}

impl ParseResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            rows: None,
        }
    }
}
