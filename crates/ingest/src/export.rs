//! Output shapes: the chunk JSON download and the vector-database upsert batch.

use docslice_core::Pipeline;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunker::Chunk;
use crate::tokens::count_tokens;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunksMetadata {
    pub source_file: String,
    pub pipeline: Pipeline,
    pub num_chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkEntry {
    pub index: usize,
    pub text: String,
}

/// `{ "metadata": {...}, "chunks": [{ "index", "text" }] }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunksJson {
    pub metadata: ChunksMetadata,
    pub chunks: Vec<ChunkEntry>,
}

impl ChunksJson {
    pub fn new(source_file: &str, pipeline: Pipeline, chunks: &[Chunk]) -> Self {
        Self {
            metadata: ChunksMetadata {
                source_file: source_file.to_string(),
                pipeline,
                num_chunks: chunks.len(),
            },
            chunks: chunks
                .iter()
                .map(|c| ChunkEntry {
                    index: c.index,
                    text: c.content.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{chunks} chunks but {embeddings} embeddings")]
pub struct CountMismatch {
    pub chunks: usize,
    pub embeddings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_file: String,
    pub pipeline: Pipeline,
    pub chunk_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
}

/// Parallel arrays in the shape vector databases accept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertBatch {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
    pub metadatas: Vec<ChunkMetadata>,
}

impl UpsertBatch {
    /// Ids are `<file-stem>-<chunk index>`.
    pub fn new(
        file_stem: &str,
        source_file: &str,
        pipeline: Pipeline,
        chunks: &[Chunk],
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self, CountMismatch> {
        if chunks.len() != embeddings.len() {
            return Err(CountMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }
        Ok(Self {
            ids: chunks
                .iter()
                .map(|c| format!("{file_stem}-{}", c.index))
                .collect(),
            documents: chunks.iter().map(|c| c.content.clone()).collect(),
            embeddings,
            metadatas: chunks
                .iter()
                .map(|c| ChunkMetadata {
                    source_file: source_file.to_string(),
                    pipeline,
                    chunk_index: c.index,
                    row: c.row,
                })
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Summary figures over a chunk sequence. Lengths are in chars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkStats {
    pub count: usize,
    pub min_chars: usize,
    pub max_chars: usize,
    pub mean_chars: f64,
    pub total_tokens: usize,
}

impl ChunkStats {
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        if chunks.is_empty() {
            return Self::default();
        }
        let lengths: Vec<usize> = chunks.iter().map(|c| c.content.chars().count()).collect();
        let total: usize = lengths.iter().sum();
        Self {
            count: chunks.len(),
            min_chars: lengths.iter().copied().min().unwrap_or(0),
            max_chars: lengths.iter().copied().max().unwrap_or(0),
            mean_chars: total as f64 / chunks.len() as f64,
            total_tokens: chunks.iter().map(|c| count_tokens(&c.content)).sum(),
        }
    }
}
