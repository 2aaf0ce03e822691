//! Upload decoding: turns an uploaded file into input rows.

use crate::domain::validator::InputRow;
use calamine::{open_workbook_from_rs, Data, DataType, Reader, Xlsx, XlsxError};
use csv::ReaderBuilder;
use serde_json::{Map, Number, Value as JsonValue};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported file format.")]
    UnsupportedFormat(String),
    #[error("Invalid JSON file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid JSON file: expected an array of objects.")]
    NotAnArrayOfObjects,
    #[error("Invalid CSV file: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid Excel file: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("Invalid Excel file: the workbook has no worksheet.")]
    NoWorksheet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Json,
    Csv,
    Xlsx,
}

impl UploadFormat {
    /// Picks the format from the file extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Result<Self, DecodeError> {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(UploadFormat::Json),
            "csv" => Ok(UploadFormat::Csv),
            "xlsx" => Ok(UploadFormat::Xlsx),
            _ => Err(DecodeError::UnsupportedFormat(ext)),
        }
    }
}

pub fn decode_upload(format: UploadFormat, bytes: &[u8]) -> Result<Vec<InputRow>, DecodeError> {
    match format {
        UploadFormat::Json => decode_json(bytes),
        UploadFormat::Csv => decode_csv(bytes),
        UploadFormat::Xlsx => decode_xlsx(bytes),
    }
}

fn decode_json(bytes: &[u8]) -> Result<Vec<InputRow>, DecodeError> {
    let value: JsonValue = serde_json::from_slice(bytes)?;
    let JsonValue::Array(items) = value else {
        return Err(DecodeError::NotAnArrayOfObjects);
    };
    items
        .into_iter()
        .map(|item| match item {
            JsonValue::Object(row) => Ok(row),
            _ => Err(DecodeError::NotAnArrayOfObjects),
        })
        .collect()
}

fn decode_csv(bytes: &[u8]) -> Result<Vec<InputRow>, DecodeError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(bytes);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let mut row = Map::new();
        for (idx, header) in headers.iter().enumerate() {
            row.insert(header.clone(), coerce_cell(record.get(idx).unwrap_or("")));
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Reads the first worksheet. The first row gives the keys; columns with a
/// blank header and rows with no value at all are skipped.
fn decode_xlsx(bytes: &[u8]) -> Result<Vec<InputRow>, DecodeError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DecodeError::NoWorksheet)??;

    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<(usize, String)> = header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| (idx, cell.to_string().trim().to_string()))
        .filter(|(_, name)| !name.is_empty())
        .collect();

    let mut rows = Vec::new();
    for cells in sheet_rows {
        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let mut row = Map::new();
        for (idx, header) in &headers {
            let value = cells.get(*idx).map(sheet_cell).unwrap_or(JsonValue::Null);
            row.insert(header.clone(), value);
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Maps a worksheet cell onto the kinds a CSV cell can take. Whole floats
/// become integers, since spreadsheets store every number as a float. Dates
/// become `YYYY-MM-DD` text, or ISO date-time text when they carry a time.
fn sheet_cell(cell: &Data) -> JsonValue {
    match cell {
        Data::Empty => JsonValue::Null,
        Data::Bool(b) => JsonValue::Bool(*b),
        Data::Int(i) => JsonValue::Number((*i).into()),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                JsonValue::Number((*f as i64).into())
            } else {
                Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number)
            }
        }
        Data::String(s) if s.trim().is_empty() => JsonValue::Null,
        Data::String(s) => JsonValue::String(s.clone()),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.time() == chrono::NaiveTime::MIN => {
                JsonValue::String(dt.format("%Y-%m-%d").to_string())
            }
            Some(dt) => JsonValue::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => JsonValue::Null,
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => JsonValue::String(s.clone()),
        Data::Error(e) => JsonValue::String(e.to_string()),
    }
}

/// Types a CSV cell: empty -> null, true/false -> boolean, then integer,
/// float, and string as the fallback.
fn coerce_cell(cell: &str) -> JsonValue {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return JsonValue::Null;
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return JsonValue::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return JsonValue::Bool(false);
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return JsonValue::Number(i.into());
    }
    // f64 parsing also accepts "inf" and "NaN"; those stay text.
    if trimmed.bytes().any(|b| b.is_ascii_digit()) {
        if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
            return JsonValue::Number(n);
        }
    }
    JsonValue::String(cell.to_string())
}
