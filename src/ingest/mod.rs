//! # Ingestion
//!
//! Turns the first worksheet of an `.xlsx` workbook into a [`Table`]:
//!
//! - row 1 provides the headers, blank header cells are named `Column N`
//! - image columns receive embedded pictures as inline `data:` payloads
//! - a boolean status column is guaranteed, appended when the sheet lacks one
//! - every cell is normalized to text, number, boolean or empty
//! - rows without data outside the status column are dropped
//!
//! Only unreadable packages and workbooks without worksheets fail; any
//! irregular cell or picture degrades to an empty value.
mod images;
mod normalize;

use crate::error::ExplorerError;
use crate::ingest::images::resolve_images;
use crate::ingest::normalize::normalize_image;
use crate::ingest::normalize::normalize_plain;
use crate::ingest::normalize::normalize_status;
use crate::options::Options;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxWorkbook;
use crate::spreadsheet::SpreadsheetError;
use crate::table::Row;
use crate::table::Table;
use crate::table::Value;
use anyhow::Context;
use std::path::Path;
use thiserror::Error;

/// Errors that abort ingestion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    /// The workbook has no worksheet
    #[error("Workbook is empty")]
    EmptyWorkbook,

    /// The bytes are a workbook this reader does not handle
    #[error("Unsupported workbook: {0}")]
    UnsupportedWorkbook(String),

    /// The bytes are not a readable workbook
    #[error("Failed to read workbook: {0}")]
    Unreadable(String),
}

/// Role of a table column.
#[derive(Copy, Clone, Debug, PartialEq)]
enum ColumnKind {
    Status,
    Image,
    Location,
    Plain,
}

/// A table column and the sheet column feeding it.
#[derive(Clone, Debug)]
struct Column {
    header: String,
    /// 0-based sheet column; None for the synthesized status column
    source: Option<usize>,
    kind: ColumnKind,
}

/// Reads a workbook with the default [`Options`].
///
/// # Arguments
/// * `bytes` - Raw `.xlsx` content
/// * `file_name` - Name of the uploaded file, kept to name exports
pub fn ingest(bytes: &[u8], file_name: Option<&str>) -> Result<Table, IngestError> {
    ingest_with(bytes, file_name, &Options::default())
}

/// Reads a workbook with explicit [`Options`].
pub fn ingest_with(bytes: &[u8], file_name: Option<&str>, options: &Options) -> Result<Table, IngestError> {
    let mut workbook = XlsxWorkbook::open(bytes).map_err(classify)?;
    let sheet = workbook.read_first_sheet().map_err(classify)?;
    let images = resolve_images(&mut workbook, &sheet, options);
    log::debug!("Resolved {} image(s) in sheet '{}'", images.len(), sheet.name);

    let columns = plan_columns(&sheet, options);
    let headers: Vec<String> = columns.iter().map(|column| column.header.to_owned()).collect();
    let status_index = columns
        .iter()
        .position(|column| column.kind == ColumnKind::Status)
        .unwrap_or_default();

    let mut rows = Vec::<Row>::new();
    for sheet_row in sheet.data_rows() {
        let mut has_data = false;
        let mut values = Vec::<Value>::with_capacity(columns.len());
        for column in &columns {
            let cell = column.source.and_then(|col| sheet_row.cell(col));
            let cell_value = cell.map(|cell| &cell.value);
            let value = match column.kind {
                ColumnKind::Status => {
                    values.push(Value::Boolean(normalize_status(cell_value, options)));
                    continue;
                }
                ColumnKind::Image => match images.get(&sheet_row.number) {
                    Some(payload) => Value::Text(payload.to_owned()),
                    None => normalize_image(cell_value, &cell.map(Cell::reference).unwrap_or_default()),
                },
                ColumnKind::Location => normalize_plain(cell_value, true),
                ColumnKind::Plain => normalize_plain(cell_value, false),
            };
            has_data |= !value.is_empty();
            values.push(value);
        }
        if has_data {
            rows.push(Row::new(values));
        } else {
            log::debug!("Dropping row {} without data", sheet_row.number);
        }
    }
    log::debug!("Ingested {} row(s) and {} column(s)", rows.len(), headers.len());

    let source_file_name = file_name.map(|name| name.to_owned());
    Ok(Table::from_parts(headers, rows, status_index, source_file_name))
}

/// Reads a workbook from disk with the default [`Options`].
pub fn ingest_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Table> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    let file_name = path.file_name().and_then(|name| name.to_str());
    let table = ingest(&bytes, file_name).with_context(|| format!("Failed to ingest '{}'", path.display()))?;
    Ok(table)
}

/// Builds the table columns from the header row.
///
/// The first header matching the status name becomes the status column;
/// later matches are renamed so the status column stays unique. A status
/// column is appended when none exists.
fn plan_columns(sheet: &Sheet, options: &Options) -> Vec<Column> {
    let mut columns = Vec::<Column>::new();
    let mut has_status = false;
    if let Some(header_row) = sheet.row(1) {
        let mut cells: Vec<_> = header_row.cells.iter().collect();
        cells.sort_by_key(|cell| cell.col);
        for cell in cells {
            let mut header = cell
                .value
                .display_text()
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| format!("Column {}", cell.col + 1));
            let kind = if options.is_status_header(&header) {
                if has_status {
                    let renamed = format!("{} ({})", header, cell.col + 1);
                    log::warn!("Duplicate status column '{}' renamed to '{}'", header, renamed);
                    header = renamed;
                    kind_of(&header, options)
                } else {
                    has_status = true;
                    ColumnKind::Status
                }
            } else {
                kind_of(&header, options)
            };
            columns.push(Column { header, source: Some(cell.col), kind });
        }
    }
    if !has_status {
        columns.push(Column {
            header: options.status_header.to_owned(),
            source: None,
            kind: ColumnKind::Status,
        });
    }
    columns
}

fn kind_of(header: &str, options: &Options) -> ColumnKind {
    if options.is_image_header(header) {
        ColumnKind::Image
    } else if options.is_location_header(header) {
        ColumnKind::Location
    } else {
        ColumnKind::Plain
    }
}

fn classify(error: ExplorerError) -> IngestError {
    match error {
        ExplorerError::SpreadsheetError(SpreadsheetError::SpreadsheetEmptyError) => IngestError::EmptyWorkbook,
        ExplorerError::SpreadsheetError(error @ SpreadsheetError::SpreadsheetBinaryFormatError) => {
            IngestError::UnsupportedWorkbook(error.to_string())
        }
        error => IngestError::Unreadable(error.to_string()),
    }
}
