//! # Export
//!
//! Serializes a [`Table`] back into an `.xlsx` workbook with a single sheet.
//! The status column is written as glyphs and every column gets a width
//! fitted to its content. Inline image payloads are written as their text;
//! they are not re-embedded as pictures.
mod writer;

use crate::export::writer::write_workbook;
use crate::export::writer::SheetValue;
use crate::options::Options;
use crate::table::Table;
use crate::table::Value;
use regex::Regex;
use std::borrow::Cow;
use thiserror::Error;

/// Glyph written for a true status.
pub const STATUS_TRUE_GLYPH: &str = "✅";

/// Glyph written for a false status.
pub const STATUS_FALSE_GLYPH: &str = "✖️";

const DEFAULT_BASE_NAME: &str = "data";
const EXPORT_SUFFIX: &str = "-edited";

/// Errors raised while exporting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExportError {
    #[error("Export failed: {0}")]
    Failed(String),
}

/// Serializes a table with the default [`Options`].
pub fn export(table: &Table) -> Result<Vec<u8>, ExportError> {
    export_with(table, &Options::default())
}

/// Serializes a table with explicit [`Options`].
///
/// The first row holds the headers, followed by one row per record in
/// header order. Empty values leave their cell blank.
pub fn export_with(table: &Table, options: &Options) -> Result<Vec<u8>, ExportError> {
    let grid = to_grid(table);
    let widths = column_widths(&grid, options);
    let bytes = write_workbook(&options.sheet_name, &grid, &widths)
        .map_err(|error| ExportError::Failed(error.to_string()))?;
    log::debug!("Exported {} row(s) to sheet '{}'", table.len(), options.sheet_name);
    Ok(bytes)
}

/// Name of the exported file for a source file name.
///
/// `clientes.xlsx` becomes `clientes-edited.xlsx`; without a usable source
/// name the result is `data-edited.xlsx`.
pub fn export_file_name(source_file_name: Option<&str>) -> String {
    let extension = Regex::new(r"(?i)\.xlsx?$").expect("Hardcode regex pattern");
    let base = source_file_name
        .map(|name| extension.replace(name.trim(), ""))
        .filter(|base| !base.is_empty())
        .unwrap_or(Cow::Borrowed(DEFAULT_BASE_NAME));
    format!("{base}{EXPORT_SUFFIX}.xlsx")
}

fn to_grid(table: &Table) -> Vec<Vec<SheetValue<'_>>> {
    let mut grid = Vec::with_capacity(table.len() + 1);
    grid.push(
        table
            .headers()
            .iter()
            .map(|header| SheetValue::Text(Cow::Borrowed(header.as_str())))
            .collect(),
    );
    for row in table.rows() {
        let values = row
            .values()
            .iter()
            .enumerate()
            .map(|(col, value)| {
                if col == table.status_index() {
                    let glyph = if value.as_bool().unwrap_or(false) { STATUS_TRUE_GLYPH } else { STATUS_FALSE_GLYPH };
                    return SheetValue::Text(Cow::Borrowed(glyph));
                }
                match value {
                    Value::Empty => SheetValue::Text(Cow::Borrowed("")),
                    Value::Text(text) => SheetValue::Text(Cow::Borrowed(text.as_str())),
                    Value::Number(number) => SheetValue::Number(*number),
                    Value::Boolean(value) => SheetValue::Boolean(*value),
                }
            })
            .collect();
        grid.push(values);
    }
    grid
}

/// Column widths: the longest text of each column plus padding, capped.
///
/// The status column is measured on its glyphs, so it is sized by its
/// header rather than by the `true` / `false` words of the values.
fn column_widths(grid: &[Vec<SheetValue>], options: &Options) -> Vec<usize> {
    let columns = grid.first().map(|headers| headers.len()).unwrap_or(0);
    (0..columns)
        .map(|col| {
            let longest = grid
                .iter()
                .filter_map(|row| row.get(col))
                .map(SheetValue::display_len)
                .max()
                .unwrap_or(0);
            (longest + options.column_padding).min(options.max_column_width)
        })
        .collect()
}
