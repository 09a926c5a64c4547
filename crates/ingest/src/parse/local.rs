use docslice_core::ValidationError;
use futures::future::BoxFuture;

use super::dispatch::DocumentParser;
use super::error::ParseError;
use super::options::{non_blank, ParseOptions};
use super::ParseResult;
use crate::document;

pub(super) fn simple_text<'a>(
    _parser: &'a DocumentParser,
    opts: &'a ParseOptions,
) -> BoxFuture<'a, Result<ParseResult, ParseError>> {
    let result = document::extract_text(opts.file.bytes(), opts.file.name())
        .map(ParseResult::text)
        .map_err(ParseError::from);
    Box::pin(futures::future::ready(result))
}

/// Excel and CSV. The column must be named before the file is opened.
pub(super) fn spreadsheet<'a>(
    _parser: &'a DocumentParser,
    opts: &'a ParseOptions,
) -> BoxFuture<'a, Result<ParseResult, ParseError>> {
    Box::pin(futures::future::ready(extract_spreadsheet(opts)))
}

fn extract_spreadsheet(opts: &ParseOptions) -> Result<ParseResult, ParseError> {
    let column = non_blank(&opts.spreadsheet.column).ok_or(ValidationError::ColumnRequired)?;
    let sheet = non_blank(&opts.spreadsheet.sheet);
    let text = document::extract_column(opts.file.bytes(), opts.file.name(), column, sheet)?;
    Ok(ParseResult {
        content: text.content,
        rows: Some(text.rows),
    })
}
