//! Local text extraction: plain text, PDF, DOCX, spreadsheets, plus the
//! helpers remote pipelines need to package media and PDF pages.

pub mod media;
pub mod paging;
pub mod spreadsheet;

mod docx;
mod pdf;
mod txt;

use thiserror::Error;

pub use paging::{split_pdf_batches, PageRenderer, PdfBatch, PdftoppmRenderer};
pub use spreadsheet::{extract_column, list_columns, list_sheets, ColumnText};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("PDF extraction failed: {0}")]
    PdfError(String),
    #[error("DOCX extraction failed: {0}")]
    DocxError(String),
    #[error("Spreadsheet could not be read: {0}")]
    SpreadsheetError(String),
    #[error("Page rendering failed: {0}")]
    RenderError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Invalid(#[from] docslice_core::ValidationError),
}

/// Extract the full text of a document for the simple-text pipeline.
///
/// PDF pages are joined with a blank line; DOCX paragraphs likewise.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<String, ExtractionError> {
    let ext = docslice_core::file_extension(filename);
    match ext.as_str() {
        "pdf" => Ok(pdf::extract_pdf(bytes)?.join("\n\n")),
        "docx" => docx::extract_docx(bytes),
        "txt" | "text" | "md" | "markdown" => Ok(txt::extract_txt(bytes)),
        other => Err(ExtractionError::UnsupportedType(other.to_string())),
    }
}
