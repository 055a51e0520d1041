//! Plain-text message for sharing one row of a table.

use crate::options::Options;
use crate::table::Table;
use crate::table::TableError;
use percent_encoding::utf8_percent_encode;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use url::Url;

const SHARE_URL: &str = "https://wa.me/";

/// Escape set of a URI component; `'` stays escaped as URL queries require.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'(')
    .remove(b')');

const PHOTO_NOTE: &str = "📷 *Foto:* Ver en la aplicación";

/// Composes the message of a row.
///
/// Each non-empty field becomes a `*Header:* value` line in header order.
/// Inline image payloads in image columns are left out; when the first image
/// column holds a value, a note pointing to the application is appended.
///
/// # Arguments
///
/// * `table` - The table holding the row
/// * `row` - Index of the row
/// * `options` - Vocabulary used to detect image columns
///
/// # Returns
///
/// * `Result<String, TableError>` - The message, or an error if the row does not exist
pub fn compose_message(table: &Table, row: usize, options: &Options) -> Result<String, TableError> {
    let values = table.rows().get(row).ok_or(TableError::RowOutOfRange(row))?;
    let mut lines = Vec::with_capacity(values.len());
    for (header, value) in table.headers().iter().zip(values.values()) {
        if value.is_empty() {
            continue;
        }
        if value.is_inline_image() && options.is_image_header(header) {
            continue;
        }
        lines.push(format!("*{header}:* {value}"));
    }
    let mut message = lines.join("\n");

    let photo = table
        .headers()
        .iter()
        .position(|header| options.is_image_header(header))
        .and_then(|col| values.get(col));
    if photo.is_some_and(|value| !value.is_empty()) {
        message.push_str("\n\n");
        message.push_str(PHOTO_NOTE);
    }
    Ok(message)
}

/// Composes a share link carrying the message of a row as its `text` query.
///
/// The message is percent-encoded as a URI component, so spaces become `%20`.
pub fn compose_link(table: &Table, row: usize, options: &Options) -> Result<String, TableError> {
    let message = compose_message(table, row, options)?;
    let mut link = Url::parse(SHARE_URL).expect("Hardcode url");
    link.set_query(Some(&format!("text={}", utf8_percent_encode(&message, URI_COMPONENT))));
    Ok(link.into())
}
