//! Strategy dispatch: recursive chunking, or the parent-child placeholder.

use crate::parse::ParseResult;

use super::params::ChunkingParameters;
use super::splitter::split_text;
use super::types::{Chunk, ChunkingOutcome, ChunkingStrategy};

/// Chunk a whole document.
pub fn chunk_text(text: &str, params: &ChunkingParameters, filename: &str) -> ChunkingOutcome {
    if params.strategy() == ChunkingStrategy::ParentChild {
        return ChunkingOutcome::NotImplemented {
            placeholder: vec![
                format!("[PARENT-CHILD PLACEHOLDER] Hierarchical chunking of: {filename}"),
                format!("Original content length: {} characters.", text.chars().count()),
                format!(
                    "Recursive parameters would have been: Size={}, Overlap={}",
                    params.chunk_size(),
                    params.chunk_overlap()
                ),
                "Hierarchical chunking is not implemented.".to_string(),
            ],
        };
    }

    let chunks = split_text(
        text,
        params.chunk_size(),
        params.chunk_overlap(),
        params.separators(),
    )
    .into_iter()
    .enumerate()
    .map(|(index, content)| Chunk {
        index,
        content,
        row: None,
    })
    .collect();
    ChunkingOutcome::Chunks(chunks)
}

/// Chunk each row independently. Chunks carry their 0-based source row.
pub fn chunk_rows<R: AsRef<str>>(
    rows: &[R],
    params: &ChunkingParameters,
    filename: &str,
) -> ChunkingOutcome {
    if params.strategy() == ChunkingStrategy::ParentChild {
        return ChunkingOutcome::NotImplemented {
            placeholder: vec![
                format!("[PARENT-CHILD PLACEHOLDER] Hierarchical chunking for rows from: {filename}"),
                format!("Total rows: {}", rows.len()),
            ],
        };
    }

    let mut chunks = Vec::new();
    for (row, text) in rows.iter().enumerate() {
        for content in split_text(
            text.as_ref(),
            params.chunk_size(),
            params.chunk_overlap(),
            params.separators(),
        ) {
            chunks.push(Chunk {
                index: chunks.len(),
                content,
                row: Some(row),
            });
        }
    }
    ChunkingOutcome::Chunks(chunks)
}

/// Rows when the pipeline produced them, the full text otherwise.
pub fn chunk_parse_result(
    result: &ParseResult,
    params: &ChunkingParameters,
    filename: &str,
) -> ChunkingOutcome {
    match &result.rows {
        Some(rows) => chunk_rows(rows, params, filename),
        None => chunk_text(&result.content, params, filename),
    }
}
