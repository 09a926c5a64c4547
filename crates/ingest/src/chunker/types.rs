//! Chunking strategy and output types.

use std::fmt;
use std::str::FromStr;

use docslice_core::ValidationError;
use serde::{Deserialize, Serialize};

// ── Strategy ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkingStrategy {
    #[default]
    Recursive,
    /// Hierarchical chunking. Defined but not implemented.
    ParentChild,
}

impl ChunkingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkingStrategy::Recursive => "recursive",
            ChunkingStrategy::ParentChild => "parent-child",
        }
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkingStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recursive" => Ok(ChunkingStrategy::Recursive),
            "parent-child" => Ok(ChunkingStrategy::ParentChild),
            other => Err(ValidationError::Other(format!(
                "unknown chunking strategy: {other}"
            ))),
        }
    }
}

// ── Chunk output ────────────────────────────────────────────────────────────

/// A trimmed, non-empty piece of source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 0-based position in the output sequence.
    pub index: usize,
    pub content: String,
    /// Source row for tabular input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
}

/// What a chunking call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkingOutcome {
    Chunks(Vec<Chunk>),
    /// The requested strategy has no implementation; carries a description
    /// of what would have been chunked.
    NotImplemented { placeholder: Vec<String> },
}

impl ChunkingOutcome {
    pub fn chunks(&self) -> Option<&[Chunk]> {
        match self {
            ChunkingOutcome::Chunks(chunks) => Some(chunks),
            ChunkingOutcome::NotImplemented { .. } => None,
        }
    }

    pub fn into_chunks(self) -> Option<Vec<Chunk>> {
        match self {
            ChunkingOutcome::Chunks(chunks) => Some(chunks),
            ChunkingOutcome::NotImplemented { .. } => None,
        }
    }

    pub fn is_implemented(&self) -> bool {
        matches!(self, ChunkingOutcome::Chunks(_))
    }
}
