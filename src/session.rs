//! Editing session: owns the current table across uploads, edits and exports.

use crate::export::export_file_name;
use crate::export::export_with;
use crate::export::ExportError;
use crate::ingest::ingest_with;
use crate::ingest::IngestError;
use crate::options::Options;
use crate::table::Row;
use crate::table::Table;
use crate::table::TableError;
use crate::table::Value;
use regex::Regex;
use thiserror::Error;

/// Errors raised by [`Session`] operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("An upload is already in progress")]
    UploadInProgress,

    #[error("Unsupported file '{0}', expected an .xlsx or .xls workbook")]
    UnsupportedFile(String),

    #[error("Upload of '{0}' is not the pending one")]
    StaleUpload(String),

    #[error("No table loaded")]
    NoTable,

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Ticket of an upload accepted by [`Session::begin_upload`].
#[derive(Debug, PartialEq)]
pub struct PendingUpload {
    id: u64,
    file_name: String,
}

impl PendingUpload {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// A serialized table ready to be saved.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Holds at most one table and serializes uploads.
///
/// A failed upload records its message and leaves the previous table in
/// place. Edits are whole-row replacements validated by the table.
#[derive(Debug, Default)]
pub struct Session {
    options: Options,
    table: Option<Table>,
    pending: Option<u64>,
    next_upload: u64,
    last_error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: Options) -> Self {
        Session { options, ..Self::default() }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// True while an accepted upload has not finished.
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Message of the last failed upload, cleared by a successful one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Accepts an upload of a workbook file.
    ///
    /// Only `.xlsx` and `.xls` names are accepted, and only one upload may be
    /// pending at a time.
    pub fn begin_upload(&mut self, file_name: &str) -> Result<PendingUpload, SessionError> {
        if self.pending.is_some() {
            return Err(SessionError::UploadInProgress);
        }
        let extension = Regex::new(r"(?i)\.xlsx?$").expect("Hardcode regex pattern");
        if !extension.is_match(file_name.trim()) {
            return Err(SessionError::UnsupportedFile(file_name.to_owned()));
        }
        let id = self.next_upload;
        self.next_upload += 1;
        self.pending = Some(id);
        log::debug!("Accepted upload #{} of '{}'", id, file_name);
        Ok(PendingUpload {
            id,
            file_name: file_name.to_owned(),
        })
    }

    /// Completes a pending upload with the file content.
    ///
    /// On success the new table replaces the current one. On failure the
    /// message is recorded and the current table is kept.
    pub fn finish_upload(&mut self, upload: PendingUpload, bytes: &[u8]) -> Result<&Table, SessionError> {
        self.take_pending(&upload)?;
        match ingest_with(bytes, Some(upload.file_name.as_str()), &self.options) {
            Ok(table) => {
                log::debug!("Loaded '{}' with {} row(s)", upload.file_name, table.len());
                self.last_error = None;
                Ok(self.table.insert(table))
            }
            Err(error) => {
                log::warn!("Upload of '{}' failed: {}", upload.file_name, error);
                self.last_error = Some(error.to_string());
                Err(error.into())
            }
        }
    }

    /// Abandons a pending upload whose content could not be obtained.
    pub fn fail_upload(&mut self, upload: PendingUpload, message: &str) -> Result<(), SessionError> {
        self.take_pending(&upload)?;
        log::warn!("Upload of '{}' failed: {}", upload.file_name, message);
        self.last_error = Some(message.to_owned());
        Ok(())
    }

    /// Accepts and completes an upload in one step.
    pub fn upload(&mut self, file_name: &str, bytes: &[u8]) -> Result<&Table, SessionError> {
        let upload = self.begin_upload(file_name)?;
        self.finish_upload(upload, bytes)
    }

    pub fn replace_row(&mut self, index: usize, row: Row) -> Result<(), SessionError> {
        self.table_mut()?.replace_row(index, row)?;
        Ok(())
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: Value) -> Result<(), SessionError> {
        self.table_mut()?.set_value(row, col, value)?;
        Ok(())
    }

    /// Flips the status of a row and returns the new status.
    pub fn toggle_status(&mut self, row: usize) -> Result<bool, SessionError> {
        Ok(self.table_mut()?.toggle_status(row)?)
    }

    /// Serializes the current table; the table itself is left untouched.
    pub fn export(&self) -> Result<ExportedFile, SessionError> {
        let table = self.table.as_ref().ok_or(SessionError::NoTable)?;
        let bytes = export_with(table, &self.options)?;
        Ok(ExportedFile {
            file_name: export_file_name(table.source_file_name()),
            bytes,
        })
    }

    /// Discards the table, the last error and any pending upload.
    pub fn reset(&mut self) {
        self.table = None;
        self.pending = None;
        self.last_error = None;
    }

    fn table_mut(&mut self) -> Result<&mut Table, SessionError> {
        self.table.as_mut().ok_or(SessionError::NoTable)
    }

    fn take_pending(&mut self, upload: &PendingUpload) -> Result<(), SessionError> {
        if self.pending != Some(upload.id) {
            return Err(SessionError::StaleUpload(upload.file_name.to_owned()));
        }
        self.pending = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::fixture::WorkbookFixture;

    fn workbook() -> Vec<u8> {
        WorkbookFixture::new()
            .row(vec!["Name".into(), "estado".into()])
            .row(vec!["Ana".into(), "no".into()])
            .row(vec!["Bea".into(), "sí".into()])
            .build()
    }

    #[test]
    fn upload_edit_and_export() {
        let mut session = Session::new();
        assert_eq!(session.upload("clientes.xlsx", &workbook()).unwrap().len(), 2);

        assert!(session.toggle_status(0).unwrap());
        session.set_value(1, 0, "Beatriz".into()).unwrap();
        assert_eq!(
            session.replace_row(0, Row::new(vec!["Ana".into()])),
            Err(SessionError::Table(TableError::RowWidthMismatch { expected: 2, actual: 1 }))
        );

        let exported = session.export().unwrap();
        assert_eq!(exported.file_name, "clientes-edited.xlsx");
        let table = session.table().unwrap();
        assert_eq!(table.status(0), Some(true));
        assert_eq!(table.value(1, 0), Some(&Value::from("Beatriz")));
        assert!(!exported.bytes.is_empty());
    }

    #[test]
    fn failed_upload_keeps_previous_table() {
        let mut session = Session::new();
        session.upload("clientes.xlsx", &workbook()).unwrap();

        let error = session.upload("broken.xlsx", b"garbage").unwrap_err();
        assert!(matches!(error, SessionError::Ingest(IngestError::Unreadable(_))));
        assert!(session.last_error().is_some());
        assert_eq!(session.table().unwrap().len(), 2);
        assert_eq!(session.table().unwrap().source_file_name(), Some("clientes.xlsx"));
        assert!(!session.is_loading());

        let empty = WorkbookFixture::without_sheets().build();
        assert_eq!(
            session.upload("empty.xlsx", &empty).unwrap_err(),
            SessionError::Ingest(IngestError::EmptyWorkbook)
        );
        assert_eq!(session.last_error(), Some("Workbook is empty"));

        session.upload("again.xlsx", &workbook()).unwrap();
        assert_eq!(session.last_error(), None);
    }

    #[test]
    fn only_one_upload_at_a_time() {
        let mut session = Session::new();
        let first = session.begin_upload("a.xlsx").unwrap();
        assert!(session.is_loading());
        assert_eq!(session.begin_upload("b.xlsx").unwrap_err(), SessionError::UploadInProgress);

        session.fail_upload(first, "read aborted").unwrap();
        assert!(!session.is_loading());
        assert_eq!(session.last_error(), Some("read aborted"));
        assert!(session.table().is_none());

        let second = session.begin_upload("b.XLS").unwrap();
        assert_eq!(second.file_name(), "b.XLS");
        let stale = PendingUpload { id: 99, file_name: "old.xlsx".to_owned() };
        assert_eq!(session.finish_upload(stale, &workbook()).unwrap_err(), SessionError::StaleUpload("old.xlsx".to_owned()));
        assert!(session.finish_upload(second, &workbook()).is_ok());
    }

    #[test]
    fn uploads_require_workbook_extension() {
        let mut session = Session::new();
        assert_eq!(
            session.begin_upload("notes.csv").unwrap_err(),
            SessionError::UnsupportedFile("notes.csv".to_owned())
        );
        assert!(!session.is_loading());
    }

    #[test]
    fn reset_discards_everything() {
        let mut session = Session::new();
        session.upload("clientes.xlsx", &workbook()).unwrap();
        session.reset();
        assert!(session.table().is_none());
        assert_eq!(session.export().unwrap_err(), SessionError::NoTable);
        assert_eq!(session.toggle_status(0).unwrap_err(), SessionError::NoTable);
    }
}
