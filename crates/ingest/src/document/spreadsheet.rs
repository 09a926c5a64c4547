//! Column extraction from XLSX/XLS workbooks (calamine) and CSV files.

use std::io::Cursor;

use calamine::{Data, ExcelDateTime, Range, Reader};
use chrono::NaiveTime;
use docslice_core::ValidationError;

use super::ExtractionError;

/// The text of one spreadsheet column, header excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnText {
    /// Non-blank cell values in row order.
    pub rows: Vec<String>,
    /// `rows` joined with a blank line.
    pub content: String,
}

impl ColumnText {
    fn from_cells(cells: impl Iterator<Item = String>) -> Self {
        let rows: Vec<String> = cells.filter(|r| !r.trim().is_empty()).collect();
        let content = rows.join("\n\n");
        Self { rows, content }
    }
}

fn is_csv(filename: &str) -> bool {
    docslice_core::file_extension(filename) == "csv"
}

/// Sheet names in workbook order. CSV files have no named sheets.
pub fn list_sheets(bytes: &[u8], filename: &str) -> Result<Vec<String>, ExtractionError> {
    if is_csv(filename) {
        return Ok(Vec::new());
    }
    let workbook = open_workbook(bytes)?;
    Ok(workbook.sheet_names().to_vec())
}

/// Non-blank header names of the chosen sheet (first sheet when `sheet` is `None`).
pub fn list_columns(
    bytes: &[u8],
    filename: &str,
    sheet: Option<&str>,
) -> Result<Vec<String>, ExtractionError> {
    let header = if is_csv(filename) {
        csv_reader(bytes)
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(String::from)
            .collect()
    } else {
        let range = sheet_range(bytes, sheet)?;
        header_row(&range)
    };
    Ok(header.into_iter().filter(|c| !c.trim().is_empty()).collect())
}

/// Pull every value below the header cell named `column`.
///
/// The header must match exactly; when several headers share the name the
/// rightmost wins. Blank cells are skipped.
pub fn extract_column(
    bytes: &[u8],
    filename: &str,
    column: &str,
    sheet: Option<&str>,
) -> Result<ColumnText, ExtractionError> {
    if is_csv(filename) {
        return extract_csv_column(bytes, column);
    }

    let range = sheet_range(bytes, sheet)?;
    let index = header_row(&range)
        .iter()
        .rposition(|h| h == column)
        .ok_or_else(|| ValidationError::ColumnNotFound(column.to_string()))?;

    let cells = range
        .rows()
        .skip(1)
        .filter_map(|row| row.get(index).and_then(cell_text));
    Ok(ColumnText::from_cells(cells))
}

// ── Workbooks ───────────────────────────────────────────────────────────────

fn open_workbook(
    bytes: &[u8],
) -> Result<calamine::Sheets<Cursor<&[u8]>>, ExtractionError> {
    calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ExtractionError::SpreadsheetError(e.to_string()))
}

fn sheet_range(bytes: &[u8], sheet: Option<&str>) -> Result<Range<Data>, ExtractionError> {
    let mut workbook = open_workbook(bytes)?;
    let names = workbook.sheet_names().to_vec();
    let name = match sheet {
        Some(wanted) => names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| ValidationError::SheetNotFound(wanted.to_string()))?,
        None => names
            .first()
            .cloned()
            .ok_or_else(|| ValidationError::SheetNotFound("(first sheet)".to_string()))?,
    };
    workbook
        .worksheet_range(&name)
        .map_err(|e| ExtractionError::SpreadsheetError(e.to_string()))
}

fn header_row(range: &Range<Data>) -> Vec<String> {
    range
        .rows()
        .next()
        .map(|row| row.iter().map(|c| cell_text(c).unwrap_or_default()).collect())
        .unwrap_or_default()
}

/// Text of a cell, `None` for empty and error cells.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => Some(excel_datetime_text(dt)),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// `YYYY-MM-DD`, with ` HH:MM:SS` when there is a time of day. Durations
/// print as `H:MM:SS`.
fn excel_datetime_text(dt: &ExcelDateTime) -> String {
    if dt.is_duration() {
        if let Some(d) = dt.as_duration() {
            let secs = d.num_seconds();
            return format!("{}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60);
        }
    } else if let Some(naive) = dt.as_datetime() {
        return if naive.time() == NaiveTime::MIN {
            naive.format("%Y-%m-%d").to_string()
        } else {
            naive.format("%Y-%m-%d %H:%M:%S").to_string()
        };
    }
    dt.as_f64().to_string()
}

// ── CSV ─────────────────────────────────────────────────────────────────────

fn csv_reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new().flexible(true).from_reader(bytes)
}

fn csv_error(e: csv::Error) -> ExtractionError {
    ExtractionError::SpreadsheetError(e.to_string())
}

fn extract_csv_column(bytes: &[u8], column: &str) -> Result<ColumnText, ExtractionError> {
    let mut reader = csv_reader(bytes);
    let index = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .collect::<Vec<_>>()
        .iter()
        .rposition(|h| *h == column)
        .ok_or_else(|| ValidationError::ColumnNotFound(column.to_string()))?;

    let mut cells = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        if let Some(value) = record.get(index) {
            cells.push(value.to_string());
        }
    }
    Ok(ColumnText::from_cells(cells.into_iter()))
}
