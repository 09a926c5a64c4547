//! Document ingestion: extract text from a file through a pipeline, split it
//! into overlapping chunks, and embed the chunks.

pub mod chunker;
pub mod document;
pub mod embedding;
pub mod export;
pub mod parse;
pub mod source;
pub mod tokens;

pub use chunker::{Chunk, ChunkingOutcome, ChunkingParameters, ChunkingStrategy};
pub use export::{ChunkStats, ChunksJson, UpsertBatch};
pub use parse::{parse, DocumentParser, ParseError, ParseOptions, ParseResult, Progress};
pub use source::SourceFile;
pub use tokens::count_tokens;
