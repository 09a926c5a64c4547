//! Page-level PDF handling for remote pipelines: splitting a document into
//! page batches, and rasterising pages to PNG for vision models.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lopdf::Document;
use tracing::debug;

use super::ExtractionError;

/// A contiguous run of pages saved as a standalone PDF.
#[derive(Debug, Clone)]
pub struct PdfBatch {
    /// 1-based, inclusive.
    pub first_page: u32,
    pub last_page: u32,
    pub bytes: Vec<u8>,
}

/// Split `bytes` into documents of at most `pages_per_batch` pages each.
///
/// A document that already fits in one batch is returned unchanged.
pub fn split_pdf_batches(
    bytes: &[u8],
    pages_per_batch: usize,
) -> Result<Vec<PdfBatch>, ExtractionError> {
    let doc = load(bytes)?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    let per_batch = pages_per_batch.max(1);

    if pages.len() <= per_batch {
        return Ok(vec![PdfBatch {
            first_page: pages.first().copied().unwrap_or(1),
            last_page: pages.last().copied().unwrap_or(1),
            bytes: bytes.to_vec(),
        }]);
    }

    let mut batches = Vec::with_capacity(pages.len().div_ceil(per_batch));
    for window in pages.chunks(per_batch) {
        let (first, last) = (window[0], window[window.len() - 1]);
        let drop: Vec<u32> = pages
            .iter()
            .copied()
            .filter(|p| *p < first || *p > last)
            .collect();

        let mut part = doc.clone();
        part.delete_pages(&drop);
        part.prune_objects();
        let mut out = Vec::new();
        part.save_to(&mut out)
            .map_err(|e| ExtractionError::PdfError(format!("saving pages {first}-{last}: {e}")))?;
        debug!(first, last, size = out.len(), "split PDF batch");
        batches.push(PdfBatch {
            first_page: first,
            last_page: last,
            bytes: out,
        });
    }
    Ok(batches)
}

fn load(bytes: &[u8]) -> Result<Document, ExtractionError> {
    Document::load_mem(bytes).map_err(|e| ExtractionError::PdfError(e.to_string()))
}

// ── Rasterising ─────────────────────────────────────────────────────────────

/// Turns a PDF into one PNG image per page, in page order.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render_pages(&self, pdf: &[u8]) -> Result<Vec<Vec<u8>>, ExtractionError>;
}

/// Renders with poppler's `pdftoppm`, which must be on `PATH`.
#[derive(Debug, Clone)]
pub struct PdftoppmRenderer {
    pub dpi: u32,
}

impl Default for PdftoppmRenderer {
    fn default() -> Self {
        Self { dpi: 150 }
    }
}

#[async_trait]
impl PageRenderer for PdftoppmRenderer {
    async fn render_pages(&self, pdf: &[u8]) -> Result<Vec<Vec<u8>>, ExtractionError> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.pdf");
        tokio::fs::write(&input, pdf).await?;
        let prefix = dir.path().join("page");

        let output = tokio::process::Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(&input)
            .arg(&prefix)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExtractionError::RenderError(format!("failed to run pdftoppm: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::RenderError(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let mut pages = rendered_pages(dir.path()).await?;
        pages.sort_by_key(|(number, _)| *number);
        let mut images = Vec::with_capacity(pages.len());
        for (_, path) in pages {
            images.push(tokio::fs::read(path).await?);
        }
        debug!(pages = images.len(), dpi = self.dpi, "rendered PDF pages");
        Ok(images)
    }
}

/// `page-1.png`, `page-01.png`, ... depending on page count.
async fn rendered_pages(dir: &Path) -> Result<Vec<(u32, PathBuf)>, ExtractionError> {
    let mut found = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(number) = page_number(&name) {
            found.push((number, entry.path()));
        }
    }
    Ok(found)
}

fn page_number(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix("page-")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}
