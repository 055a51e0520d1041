//! # Sheet Explorer
//!
//! Reads the first worksheet of an `.xlsx` workbook into an editable table
//! and writes it back out.
//!
//! ## Features
//!
//! - **Normalized values**: rich text, hyperlinks, formulas, dates and error
//!   cells all become plain text, numbers or booleans
//! - **Status column**: a reserved boolean column (`estado` by default) that is
//!   always present exactly once and exported as `✅` / `✖️`
//! - **Embedded pictures**: pictures anchored to a row become inline
//!   `data:image/...;base64,` values of the image columns
//! - **Export**: a single-sheet workbook with fitted column widths
//! - **Sharing**: a row can be composed into a text message and a share link
//!
//! ## Entry points
//!
//! - [`ingest`] / [`ingest_with`] / [`ingest_file`]: workbook bytes to [`Table`]
//! - [`export`] / [`export_with`]: [`Table`] to workbook bytes
//! - [`Session`]: upload lifecycle, edits and export around one table
//! - [`compose_message`] / [`compose_link`]: text of one row
mod error;
mod export;
mod helpers;
mod ingest;
mod message;
mod options;
mod session;
mod spreadsheet;
mod table;

pub use crate::export::export;
pub use crate::export::export_file_name;
pub use crate::export::export_with;
pub use crate::export::ExportError;
pub use crate::export::STATUS_FALSE_GLYPH;
pub use crate::export::STATUS_TRUE_GLYPH;
pub use crate::ingest::ingest;
pub use crate::ingest::ingest_file;
pub use crate::ingest::ingest_with;
pub use crate::ingest::IngestError;
pub use crate::message::compose_link;
pub use crate::message::compose_message;
pub use crate::options::Options;
pub use crate::session::ExportedFile;
pub use crate::session::PendingUpload;
pub use crate::session::Session;
pub use crate::session::SessionError;
pub use crate::table::Row;
pub use crate::table::Table;
pub use crate::table::TableError;
pub use crate::table::Value;
