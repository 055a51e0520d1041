//! Single-worksheet workbook writer.

use crate::error::ExplorerError;
use rust_xlsxwriter::ColNum;
use rust_xlsxwriter::RowNum;
use rust_xlsxwriter::Workbook;
use std::borrow::Cow;

/// Most characters a spreadsheet cell holds.
const MAX_CELL_CHARS: usize = 32_767;

/// Value of one written cell.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SheetValue<'a> {
    Text(Cow<'a, str>),
    Number(f64),
    Boolean(bool),
}

impl SheetValue<'_> {
    /// Length of the value as a spreadsheet displays it, in characters.
    pub(crate) fn display_len(&self) -> usize {
        match self {
            SheetValue::Text(text) => text.chars().count(),
            SheetValue::Number(number) => number.to_string().chars().count(),
            SheetValue::Boolean(value) => value.to_string().len(),
        }
    }
}

/// Writes a workbook holding a single worksheet.
///
/// Empty text leaves its cell blank. Text longer than a cell can hold is
/// truncated.
///
/// # Arguments
/// * `sheet_name` - Name of the worksheet
/// * `rows` - Cell values, row by row; the first row holds the headers
/// * `widths` - Column widths in characters, by column position
///
/// # Returns
/// The bytes of the `.xlsx` package
pub(crate) fn write_workbook(sheet_name: &str, rows: &[Vec<SheetValue>], widths: &[usize]) -> Result<Vec<u8>, ExplorerError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, width) in widths.iter().enumerate() {
        worksheet.set_column_width(ColNum::try_from(col)?, *width as f64)?;
    }

    for (row_index, values) in rows.iter().enumerate() {
        let row = RowNum::try_from(row_index)?;
        for (col_index, value) in values.iter().enumerate() {
            let col = ColNum::try_from(col_index)?;
            match value {
                SheetValue::Text(text) if text.is_empty() => continue,
                SheetValue::Text(text) => {
                    worksheet.write_string(row, col, fit_cell(text, row_index, col_index))?;
                }
                SheetValue::Number(number) => {
                    worksheet.write_number(row, col, *number)?;
                }
                SheetValue::Boolean(value) => {
                    worksheet.write_boolean(row, col, *value)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn fit_cell(text: &str, row: usize, col: usize) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => {
            log::warn!("Truncating text of row {} column {} to {} characters", row + 1, col + 1, MAX_CELL_CHARS);
            &text[..end]
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::zip::ZipHelper;
    use crate::spreadsheet::cell::CellValue;
    use crate::spreadsheet::xlsx::XlsxWorkbook;
    use std::io::Cursor;
    use zip::ZipArchive;

    #[test]
    fn written_package_reads_back() {
        let rows = vec![
            vec![SheetValue::Text("Name".into()), SheetValue::Text("Qty".into()), SheetValue::Text("Ok".into())],
            vec![SheetValue::Text(" Tom & <Jerry> ".into()), SheetValue::Number(2.5), SheetValue::Boolean(true)],
            vec![SheetValue::Text("".into()), SheetValue::Number(-3.0), SheetValue::Boolean(false)],
        ];
        let bytes = write_workbook("Data", &rows, &[12, 5, 4]).unwrap();

        let mut workbook = XlsxWorkbook::open(&bytes).unwrap();
        assert_eq!(workbook.sheet_names().collect::<Vec<_>>(), vec!["Data"]);
        let sheet = workbook.read_first_sheet().unwrap();
        let row = sheet.row(2).unwrap();
        assert_eq!(row.value(0), Some(&CellValue::Text(" Tom & <Jerry> ".to_owned())));
        assert_eq!(row.value(1), Some(&CellValue::Number(2.5)));
        assert_eq!(row.value(2), Some(&CellValue::Boolean(true)));
        let row = sheet.row(3).unwrap();
        assert_eq!(row.value(0), None);
        assert_eq!(row.value(1), Some(&CellValue::Number(-3.0)));
        assert_eq!(row.value(2), Some(&CellValue::Boolean(false)));
    }

    #[test]
    fn columns_carry_widths() {
        let rows = vec![vec![SheetValue::Text("A".into()), SheetValue::Text("B".into())]];
        let bytes = write_workbook("Data", &rows, &[7, 30]).unwrap();
        let mut zip = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let xml = String::from_utf8(zip.read_bytes("xl/worksheets/sheet1.xml").unwrap().unwrap()).unwrap();
        assert!(xml.contains(r#"<col min="1" max="1""#));
        assert!(xml.contains(r#"<col min="2" max="2""#));
        assert!(xml.contains(r#"customWidth="1""#));
    }

    #[test]
    fn invalid_sheet_names_fail() {
        let rows = vec![vec![SheetValue::Text("A".into())]];
        assert!(write_workbook("R/D", &rows, &[3]).is_err());
        assert!(write_workbook("", &rows, &[3]).is_err());
    }

    #[test]
    fn oversized_text_is_truncated() {
        let long = "é".repeat(MAX_CELL_CHARS + 10);
        let rows = vec![vec![SheetValue::Text("Note".into())], vec![SheetValue::Text(long.into())]];
        let bytes = write_workbook("Data", &rows, &[50]).unwrap();
        let mut workbook = XlsxWorkbook::open(&bytes).unwrap();
        let sheet = workbook.read_first_sheet().unwrap();
        match sheet.row(2).unwrap().value(0) {
            Some(CellValue::Text(text)) => assert_eq!(text.chars().count(), MAX_CELL_CHARS),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn display_length_counts_characters() {
        assert_eq!(SheetValue::Text("Año ✅".into()).display_len(), 5);
        assert_eq!(SheetValue::Number(12.5).display_len(), 4);
        assert_eq!(SheetValue::Boolean(false).display_len(), 5);
    }
}
