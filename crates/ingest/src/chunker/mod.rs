//! Recursive, separator-driven chunking.
//!
//! Text is split on the coarsest separator that occurs in it, pieces are
//! greedily merged up to the chunk size with character-level overlap, and
//! oversized pieces are split again with the next separator. Spreadsheet
//! rows are chunked independently so no chunk spans two rows.

mod params;
mod splitter;
mod strategies;
mod types;

pub use params::{
    ChunkingParameters, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_SEPARATORS,
    MIN_CHUNK_SIZE,
};
pub use splitter::{split_rows, split_text};
pub use strategies::{chunk_parse_result, chunk_rows, chunk_text};
pub use types::{Chunk, ChunkingOutcome, ChunkingStrategy};
