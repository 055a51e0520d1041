//! # Spreadsheet Reading Module
//!
//! Streaming reader for Office Open XML workbooks (`.xlsx`). It decodes the
//! first worksheet into rows of typed cells and exposes the drawing pictures
//! and media parts needed to associate embedded images with rows.
use thiserror::Error;

pub(crate) mod cell;
pub(crate) mod drawing;
pub(crate) mod excel;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xlsx;

#[cfg(test)]
pub(crate) mod fixture;

/// Errors raised while reading a workbook package.
#[derive(Error, Debug)]
pub(crate) enum SpreadsheetError {
    /// A required package part is missing
    #[error("Missing workbook part '{0}'")]
    FileError(String),

    /// The workbook declares no worksheet
    #[error("Workbook is empty")]
    SpreadsheetEmptyError,

    /// OLE compound file: legacy binary workbook or encrypted package
    #[error("Legacy binary or password protected workbooks are not supported")]
    SpreadsheetBinaryFormatError,
}
