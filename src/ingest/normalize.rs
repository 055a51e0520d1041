//! Per-cell normalization of decoded worksheet values into table values.

use crate::options::Options;
use crate::spreadsheet::cell::CellValue;
use crate::table::Value;

const IMAGE_SOURCE_PREFIXES: [&str; 3] = ["http://", "https://", "data:image/"];

/// Reads a status cell as a boolean.
///
/// Booleans pass through, numbers are true only when exactly 1 and text is
/// matched against the truthy vocabulary. Anything else is false.
pub(crate) fn normalize_status(value: Option<&CellValue>, options: &Options) -> bool {
    match value {
        Some(CellValue::Boolean(value)) => *value,
        Some(CellValue::Number(number)) => *number == 1.0,
        Some(CellValue::Text(text)) => options.is_truthy(text),
        _ => false,
    }
}

/// Normalizes a cell of an image column that has no embedded picture.
///
/// Only web URLs and inline image payloads are kept. Local paths cannot be
/// displayed and are dropped, as is every other structured value.
pub(crate) fn normalize_image(value: Option<&CellValue>, reference: &str) -> Value {
    match value {
        None | Some(CellValue::Empty) => Value::Empty,
        Some(CellValue::Error(error)) => {
            log::debug!("Image cell {} holds error '{}', leaving it empty", reference, error);
            Value::Empty
        }
        Some(CellValue::Text(text)) if text.is_empty() => Value::Empty,
        Some(CellValue::Text(text)) if IMAGE_SOURCE_PREFIXES.iter().any(|prefix| text.starts_with(prefix)) => {
            Value::Text(text.to_owned())
        }
        Some(CellValue::Text(text)) => {
            log::warn!("Image cell {} points to local file '{}', discarding it", reference, text);
            Value::Empty
        }
        Some(value) if value.is_structured() => {
            log::warn!("Image cell {} holds unhandled value {:?}, discarding it", reference, value);
            Value::Empty
        }
        Some(_) => Value::Empty,
    }
}

/// Normalizes a cell of an ordinary column.
///
/// Errors become empty, rich text and dates become plain text and formulas
/// are replaced by their normalized cached result. Hyperlinks keep their
/// display text, except in location columns where the target URL is kept.
pub(crate) fn normalize_plain(value: Option<&CellValue>, is_location: bool) -> Value {
    match value {
        None | Some(CellValue::Empty) | Some(CellValue::Error(_)) => Value::Empty,
        Some(CellValue::Boolean(value)) => Value::Boolean(*value),
        Some(CellValue::Number(number)) => Value::Number(*number),
        Some(CellValue::Text(text)) | Some(CellValue::RichText(text)) | Some(CellValue::DateTime(text)) => {
            if text.is_empty() {
                Value::Empty
            } else {
                Value::Text(text.to_owned())
            }
        }
        Some(CellValue::Hyperlink { target, .. }) if is_location => Value::Text(target.to_owned()),
        Some(CellValue::Hyperlink { text, .. }) => Value::Text(text.to_owned()),
        Some(CellValue::Formula { result, .. }) => normalize_plain(Some(result), is_location),
    }
}
