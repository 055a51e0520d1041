//! In-memory table produced by ingestion and consumed by export.

use std::fmt;
use std::fmt::Display;
use thiserror::Error;

/// Errors raised when editing a [`Table`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Row {0} does not exist")]
    RowOutOfRange(usize),

    #[error("Column {0} does not exist")]
    ColumnOutOfRange(usize),

    #[error("Row has {actual} values but the table has {expected} columns")]
    RowWidthMismatch { expected: usize, actual: usize },

    #[error("Value of the status column must be a boolean")]
    StatusNotBoolean,

    #[error("Missing status column '{0}'")]
    MissingStatusColumn(String),

    #[error("Header '{0}' duplicates the status column")]
    DuplicateStatusColumn(String),
}

/// One field of a row.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
}

impl Value {
    /// True for `Empty` and for empty text.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// True for text holding an inline image payload (`data:image/...`).
    pub fn is_inline_image(&self) -> bool {
        matches!(self, Value::Text(text) if text.starts_with("data:image/"))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(text) => f.write_str(text),
            Value::Number(number) => write!(f, "{number}"),
            Value::Boolean(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Value::Number(number)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

/// A record holding one value per table header, by position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Row { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, col: usize) -> Option<&Value> {
        self.values.get(col)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row { values }
    }
}

/// The canonical representation of one worksheet.
///
/// Headers are unique by position only. Exactly one column is the status
/// column, and every row carries a boolean there; edits replace whole rows
/// and are validated against both rules.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
    status_index: usize,
    source_file_name: Option<String>,
}

impl Table {
    /// Creates an empty table whose status column is the header equal
    /// (case-insensitively) to `status_header`; exactly one header may match.
    pub fn new(headers: Vec<String>, status_header: &str) -> Result<Table, TableError> {
        let status = status_header.to_lowercase();
        let mut matches = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| header.to_lowercase() == status);
        let (status_index, _) = matches
            .next()
            .ok_or_else(|| TableError::MissingStatusColumn(status_header.to_owned()))?;
        if let Some((_, duplicate)) = matches.next() {
            return Err(TableError::DuplicateStatusColumn(duplicate.to_owned()));
        }
        Ok(Table {
            headers,
            rows: Vec::new(),
            status_index,
            source_file_name: None,
        })
    }

    /// Assembles a table whose rows are already known to be well formed.
    pub(crate) fn from_parts(headers: Vec<String>, rows: Vec<Row>, status_index: usize, source_file_name: Option<String>) -> Table {
        debug_assert!(status_index < headers.len());
        debug_assert!(rows.iter().all(|row| row.len() == headers.len()));
        Table {
            headers,
            rows,
            status_index,
            source_file_name,
        }
    }

    /// Sets the name of the file the table was read from.
    pub fn with_source_file_name(mut self, file_name: &str) -> Table {
        self.source_file_name = Some(file_name.to_owned());
        self
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn status_index(&self) -> usize {
        self.status_index
    }

    pub fn status_header(&self) -> &str {
        &self.headers[self.status_index]
    }

    pub fn source_file_name(&self) -> Option<&str> {
        self.source_file_name.as_deref()
    }

    /// Position of the first header with exactly this name.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|name| name == header)
    }

    pub fn value(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|row| row.get(col))
    }

    /// Status of a row.
    pub fn status(&self, row: usize) -> Option<bool> {
        self.value(row, self.status_index).and_then(Value::as_bool)
    }

    /// Appends a row after validating it.
    pub fn push_row(&mut self, row: Row) -> Result<(), TableError> {
        self.validate(&row)?;
        self.rows.push(row);
        Ok(())
    }

    /// Replaces a whole row after validating it.
    pub fn replace_row(&mut self, index: usize, row: Row) -> Result<(), TableError> {
        if index >= self.rows.len() {
            return Err(TableError::RowOutOfRange(index));
        }
        self.validate(&row)?;
        self.rows[index] = row;
        Ok(())
    }

    /// Replaces one value by rebuilding its row.
    pub fn set_value(&mut self, row: usize, col: usize, value: Value) -> Result<(), TableError> {
        let current = self.rows.get(row).ok_or(TableError::RowOutOfRange(row))?;
        if col >= self.headers.len() {
            return Err(TableError::ColumnOutOfRange(col));
        }
        let mut values = current.values().to_vec();
        values[col] = value;
        self.replace_row(row, Row::new(values))
    }

    /// Flips the status of a row and returns the new status.
    pub fn toggle_status(&mut self, row: usize) -> Result<bool, TableError> {
        let status = !self.status(row).ok_or(TableError::RowOutOfRange(row))?;
        self.set_value(row, self.status_index, Value::Boolean(status))?;
        Ok(status)
    }

    fn validate(&self, row: &Row) -> Result<(), TableError> {
        if row.len() != self.headers.len() {
            return Err(TableError::RowWidthMismatch {
                expected: self.headers.len(),
                actual: row.len(),
            });
        }
        match row.get(self.status_index) {
            Some(Value::Boolean(_)) => Ok(()),
            _ => Err(TableError::StatusNotBoolean),
        }
    }
}
