use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellValue;

/// One physical row of a worksheet.
#[derive(Clone, Debug)]
pub(crate) struct SheetRow {
    /// Row number (1-based, as written in the sheet)
    pub(crate) number: usize,
    /// Custom row height in points, when the sheet records one
    pub(crate) height: Option<f64>,
    /// Cells carrying a value, ordered by column
    pub(crate) cells: Vec<Cell>,
}

impl SheetRow {
    pub(crate) fn new(number: usize, height: Option<f64>) -> Self {
        Self { number, height, cells: Vec::new() }
    }

    /// Returns the cell at a 0-based column index, if present.
    pub(crate) fn cell(&self, col: usize) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.col == col)
    }

    /// Returns the value at a 0-based column index, if present.
    pub(crate) fn value(&self, col: usize) -> Option<&CellValue> {
        self.cell(col).map(|cell| &cell.value)
    }

    /// True when at least one cell of the row carries a value.
    pub(crate) fn has_values(&self) -> bool {
        self.cells.iter().any(|cell| !cell.value.is_empty())
    }

    /// True when the row is taller than the given threshold.
    pub(crate) fn is_taller_than(&self, threshold: f64) -> bool {
        self.height.map(|height| height > threshold).unwrap_or(false)
    }
}

/// The decoded content of a worksheet.
#[derive(Clone, Debug)]
pub(crate) struct Sheet {
    /// Sheet name
    pub(crate) name: String,
    /// Rows in document order
    pub(crate) rows: Vec<SheetRow>,
    /// ZIP path of the drawing part attached to the sheet
    pub(crate) drawing: Option<String>,
}

impl Sheet {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            rows: Vec::new(),
            drawing: None,
        }
    }

    /// Returns the row with the given 1-based number.
    pub(crate) fn row(&self, number: usize) -> Option<&SheetRow> {
        self.rows.iter().find(|row| row.number == number)
    }

    /// Returns a mutable cell at 0-based (row, col) coordinates.
    pub(crate) fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        self.rows
            .iter_mut()
            .find(|sheet_row| sheet_row.number == row + 1)
            .and_then(|sheet_row| sheet_row.cells.iter_mut().find(|cell| cell.col == col))
    }

    /// Rows below the header row that carry at least one value.
    pub(crate) fn data_rows(&self) -> impl Iterator<Item = &SheetRow> + '_ {
        self.rows.iter().filter(|row| row.number > 1 && row.has_values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(row: usize, col: usize, value: CellValue) -> Cell {
        Cell { row, col, value }
    }

    fn sheet() -> Sheet {
        let mut sheet = Sheet::new("Sheet1");
        let mut header = SheetRow::new(1, None);
        header.cells.push(cell(0, 0, CellValue::Text("Name".to_owned())));
        let mut tall = SheetRow::new(2, Some(80.0));
        tall.cells.push(cell(1, 0, CellValue::Text("Ana".to_owned())));
        let empty = SheetRow::new(3, Some(90.0));
        let mut short = SheetRow::new(5, Some(15.0));
        short.cells.push(cell(4, 1, CellValue::Number(3.0)));
        sheet.rows = vec![header, tall, empty, short];
        sheet
    }

    #[test]
    fn data_rows_skip_header_and_empty_rows() {
        let sheet = sheet();
        let numbers: Vec<usize> = sheet.data_rows().map(|row| row.number).collect();
        assert_eq!(numbers, vec![2, 5]);
    }

    #[test]
    fn row_height_threshold() {
        let sheet = sheet();
        assert!(sheet.row(2).unwrap().is_taller_than(50.0));
        assert!(!sheet.row(5).unwrap().is_taller_than(50.0));
        assert!(!SheetRow::new(9, None).is_taller_than(50.0));
    }

    #[test]
    fn cell_lookup_by_position() {
        let mut sheet = sheet();
        assert_eq!(sheet.row(5).unwrap().value(1), Some(&CellValue::Number(3.0)));
        assert_eq!(sheet.row(5).unwrap().value(0), None);
        sheet.cell_mut(4, 1).unwrap().value = CellValue::Empty;
        assert!(!sheet.row(5).unwrap().has_values());
        assert!(sheet.cell_mut(7, 0).is_none());
    }
}
