use thiserror::Error;

/// A malformed or missing parameter, detected before any I/O happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported pipeline: {0}")]
    UnsupportedPipeline(String),

    #[error("Pipeline '{pipeline}' does not accept .{extension} files")]
    IncompatibleExtension { pipeline: String, extension: String },

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Column must be specified")]
    ColumnRequired,

    #[error("Column \"{0}\" not found")]
    ColumnNotFound(String),

    #[error("Sheet \"{0}\" not found")]
    SheetNotFound(String),

    #[error("Chunk size must be at least {min}, got {actual}")]
    ChunkSizeTooSmall { min: usize, actual: usize },

    #[error("Chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { overlap: usize, size: usize },

    #[error("Duplicate separator: {0:?}")]
    DuplicateSeparator(String),

    #[error("{0}")]
    Other(String),
}
