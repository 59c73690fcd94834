//! First-sheet extraction for uploaded marks spreadsheets.
//!
//! Output mirrors a "header: 1" sheet-to-array conversion: one `Vec<Cell>` per
//! row of the used range, trailing empty cells dropped, interior gaps kept as
//! `null`, blank rows kept as `[]`.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

pub type Row = Vec<Cell>;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("unable to open workbook: {0}")]
    Open(String),
    #[error("workbook contains no sheets")]
    NoSheets,
    #[error("failed to read sheet '{name}': {reason}")]
    Sheet { name: String, reason: String },
}

/// Parses an in-memory upload. `source_name` only guides format detection;
/// unknown or missing extensions fall back to sniffing the leading bytes.
pub fn read_first_sheet_from_bytes(
    bytes: &[u8],
    source_name: Option<&str>,
) -> Result<Vec<Row>, SheetError> {
    let cursor = Cursor::new(bytes);
    let mut workbook = match detect_format(bytes, source_name) {
        Some(Format::Xlsx) => calamine::open_workbook_from_rs::<calamine::Xlsx<_>, _>(cursor)
            .map(Sheets::Xlsx)
            .map_err(|e| SheetError::Open(e.to_string()))?,
        Some(Format::Xls) => calamine::open_workbook_from_rs::<calamine::Xls<_>, _>(cursor)
            .map(Sheets::Xls)
            .map_err(|e| SheetError::Open(e.to_string()))?,
        Some(Format::Xlsb) => calamine::open_workbook_from_rs::<calamine::Xlsb<_>, _>(cursor)
            .map(Sheets::Xlsb)
            .map_err(|e| SheetError::Open(e.to_string()))?,
        Some(Format::Ods) => calamine::open_workbook_from_rs::<calamine::Ods<_>, _>(cursor)
            .map(Sheets::Ods)
            .map_err(|e| SheetError::Open(e.to_string()))?,
        None => open_workbook_auto_from_rs(cursor).map_err(|e| SheetError::Open(e.to_string()))?,
    };
    first_sheet_rows(&mut workbook)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Xlsx,
    Xls,
    Xlsb,
    Ods,
}

fn detect_format(bytes: &[u8], source_name: Option<&str>) -> Option<Format> {
    let ext = source_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("xlsx") | Some("xlsm") | Some("xlam") => return Some(Format::Xlsx),
        Some("xls") | Some("xla") => return Some(Format::Xls),
        Some("xlsb") => return Some(Format::Xlsb),
        Some("ods") => return Some(Format::Ods),
        _ => {}
    }
    if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
        return Some(Format::Xlsx);
    }
    if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
        return Some(Format::Xls);
    }
    None
}

fn first_sheet_rows<RS: Read + Seek>(workbook: &mut Sheets<RS>) -> Result<Vec<Row>, SheetError> {
    let Some(name) = workbook.sheet_names().first().cloned() else {
        return Err(SheetError::NoSheets);
    };
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| SheetError::Sheet {
            name: name.clone(),
            reason: e.to_string(),
        })?;
    Ok(range_to_rows(&range))
}

fn range_to_rows(range: &Range<Data>) -> Vec<Row> {
    range
        .rows()
        .map(|row| {
            let mut cells: Row = row.iter().map(convert_cell).collect();
            while cells.last().map(Cell::is_empty).unwrap_or(false) {
                cells.pop();
            }
            cells
        })
        .collect()
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Bool(b) => Cell::Bool(*b),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) if f.is_finite() => Cell::Number(*f),
        Data::Float(f) => Cell::Text(f.to_string()),
        // Dates stay as raw serial numbers.
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
        other => Cell::Text(other.to_string()),
    }
}
