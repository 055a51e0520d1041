use crate::error::ExplorerError;
use crate::spreadsheet::reference::index_to_reference;
use chrono::Duration;
use chrono::NaiveDate;

/// Number format classes of numeric cells.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    /// Plain numeric values
    #[default]
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Analyzes format codes for date/time patterns.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_escaped => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_color && !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }

    /// Renders a serial number of this format class as ISO-like text.
    /// Returns None for plain numbers.
    pub(crate) fn format_serial(&self, value: &str) -> Result<Option<String>, ExplorerError> {
        let text = match self {
            Self::Number => return Ok(None),
            Self::NumberDate1900 => to_date_string(value, false)?,
            Self::NumberDate1904 => to_date_string(value, true)?,
            Self::NumberDateTime1900 => to_datetime_string(value, false)?,
            Self::NumberDateTime1904 => to_datetime_string(value, true)?,
            Self::NumberTime1900 | Self::NumberTime1904 => to_time_string(value)?,
        };
        Ok(Some(text))
    }
}

/// Decoded content of one worksheet cell.
///
/// Structured variants (everything except the scalars and `Empty`) mirror the
/// object-shaped values a workbook can hold; ingestion normalizes each of them
/// into a plain table value.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum CellValue {
    Empty,
    Boolean(bool),
    Number(f64),
    Text(String),
    /// Date/time rendered from a date-formatted serial number or an ISO cell
    DateTime(String),
    /// Excel error literal such as `#N/A`
    Error(String),
    /// Rich text reduced to the concatenation of its runs
    RichText(String),
    Hyperlink { text: String, target: String },
    Formula { formula: String, result: Box<CellValue> },
}

impl CellValue {
    /// Decodes a cell from its type attribute (`t`), raw value text and number format.
    pub(crate) fn decode(kind: Option<&str>, raw: String, format: CellType) -> Result<CellValue, ExplorerError> {
        let value = match kind {
            Some("inlineStr") | Some("str") => CellValue::Text(raw),
            Some("b") => CellValue::Boolean(raw.trim() == "1" || raw.trim().eq_ignore_ascii_case("true")),
            Some("e") => CellValue::Error(raw),
            Some("d") => CellValue::DateTime(raw.replace('T', " ")),
            _ => match format.format_serial(raw.trim())? {
                Some(text) => CellValue::DateTime(text),
                None => CellValue::Number(raw.trim().parse::<f64>()?),
            },
        };
        Ok(value)
    }

    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// True for object-shaped values (errors, rich text, hyperlinks, formulas, dates).
    pub(crate) fn is_structured(&self) -> bool {
        !matches!(
            self,
            CellValue::Empty | CellValue::Boolean(_) | CellValue::Number(_) | CellValue::Text(_)
        )
    }

    /// Display text of the value, as a spreadsheet would show it.
    pub(crate) fn display_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Boolean(value) => Some(value.to_string()),
            CellValue::Number(value) => Some(value.to_string()),
            CellValue::Text(text) | CellValue::DateTime(text) | CellValue::Error(text) | CellValue::RichText(text) => {
                Some(text.to_owned())
            }
            CellValue::Hyperlink { text, .. } => Some(text.to_owned()),
            CellValue::Formula { result, .. } => result.display_text(),
        }
    }
}

/// Represents a single decoded cell in a worksheet.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    /// Decoded cell content
    pub(crate) value: CellValue,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }
}

/// Converts Excel numeric date to ISO date string.
/// Handles Lotus 1-2-3 leap year bug for 1900 epoch.
fn to_date_string(value: &str, is_1904: bool) -> Result<String, ExplorerError> {
    let days = value.parse::<f64>()?.trunc() as i64; // Handle Lotus 1-2-3 leap year bug
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let out_of_range = || ExplorerError::WithContextError(format!("date serial '{}' out of range", value));
    let duration = Duration::try_days(days.saturating_add(offset)).ok_or_else(out_of_range)?;
    let date = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.checked_add_signed(duration))
        .ok_or_else(out_of_range)?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Converts Excel numeric time (fraction of a day) to ISO time string.
fn to_time_string(value: &str) -> Result<String, ExplorerError> {
    let factor = value.parse::<f64>()?.fract().abs();
    let mut hours = (factor * 86_400_000f64).round() as i64;
    let milliseconds = hours % 1_000; hours /= 1_000;
    let seconds = hours % 60; hours /= 60;
    let minutes = hours % 60; hours /= 60;
    let timestamp = if milliseconds > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{milliseconds:03}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    };
    Ok(timestamp)
}

/// Converts Excel numeric datetime to ISO datetime string.
fn to_datetime_string(value: &str, is_1904: bool) -> Result<String, ExplorerError> {
    let date = to_date_string(value, is_1904)?;
    let time = to_time_string(value)?;
    Ok(format!("{date} {time}"))
}
