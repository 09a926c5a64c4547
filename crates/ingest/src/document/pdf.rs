use super::ExtractionError;

/// Extract the text of each page. Pages with no text are dropped.
///
/// pdf-extract returns the whole document as one string with form feeds
/// between pages. Scanned PDFs yield no pages at all.
pub fn extract_pdf(bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ExtractionError::PdfError(e.to_string()))?;

    let pages: Vec<String> = text
        .split('\x0C')
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .map(String::from)
        .collect();

    if pages.is_empty() {
        tracing::warn!("PDF has no extractable text layer; a vision pipeline may work better");
    }
    Ok(pages)
}
