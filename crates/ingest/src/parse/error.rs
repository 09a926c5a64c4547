use docslice_core::ValidationError;
use docslice_llm::LlmError;
use thiserror::Error;

use crate::document::ExtractionError;

#[derive(Debug, Error)]
pub enum ParseError {
    /// Missing or malformed parameter. Raised before any I/O.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The caller's cancellation token fired.
    #[error("parsing cancelled")]
    Cancelled,

    /// A remote inference call failed or timed out.
    #[error("backend error: {0}")]
    Backend(LlmError),

    /// Local extraction failed.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ParseError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ParseError::Cancelled)
    }
}

impl From<LlmError> for ParseError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Cancelled => ParseError::Cancelled,
            other => ParseError::Backend(other),
        }
    }
}

impl From<ExtractionError> for ParseError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Invalid(v) => ParseError::Validation(v),
            other => ParseError::Decode(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_cancellation_stays_distinct() {
        assert!(ParseError::from(LlmError::Cancelled).is_cancelled());
        let err = ParseError::from(LlmError::ApiError {
            status: 500,
            message: "boom".into(),
        });
        assert!(matches!(err, ParseError::Backend(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn extraction_validation_is_lifted() {
        let err = ParseError::from(ExtractionError::Invalid(ValidationError::ColumnNotFound(
            "Answer".into(),
        )));
        assert!(matches!(err, ParseError::Validation(ValidationError::ColumnNotFound(_))));

        let err = ParseError::from(ExtractionError::PdfError("bad xref".into()));
        assert!(matches!(err, ParseError::Decode(msg) if msg.contains("bad xref")));
    }
}
