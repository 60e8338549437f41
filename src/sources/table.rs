use std::path::Path;

use std::borrow::Cow;

use csv::{ByteRecord, ReaderBuilder, Trim};
use tracing::{error, warn};

use crate::sources::errors::SourceError;
use crate::types::{ColumnType, Record, Value};

/// A named column together with its inferred type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self { name: name.into(), column_type }
    }
}

/// A fully loaded table: its schema plus every row in source order.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Record>
}

impl Table {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table whose column types are inferred over every row.
    pub fn new(names: Vec<String>, rows: Vec<Record>) -> Self {
        let columns = names.into_iter()
            .map(|name| {
                let column_type = ColumnType::infer(rows.iter().filter_map(|row| row.get(&name)));
                Column::new(name, column_type)
            })
            .collect();

        Self { columns, rows }
    }

    /// Builds a table from records whose field sets may differ, taking columns in first-seen order.
    pub fn from_records(rows: Vec<Record>) -> Self {
        let mut names: Vec<String> = Vec::new();

        for row in &rows {
            for (name, _) in row.fields() {
                if !names.iter().any(|existing| existing == name) {
                    names.push(name.to_string());
                }
            }
        }

        Self::new(names, rows)
    }

    /// Builds a table with an already known schema.
    pub fn with_columns(columns: Vec<Column>, rows: Vec<Record>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.iter()
            .find(|column| column.name == name)
            .map(|column| column.column_type)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_type(name).is_some()
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Loads a reference CSV. A file that does not exist yields `Ok(None)`.
pub fn load_csv_table(path: &Path) -> Result<Option<Table>, SourceError> {
    if !path.exists() {
        return Ok(None);
    }

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|error| SourceError::csv(path, error))?;

    let headers = header_names(reader.byte_headers().map_err(|error| SourceError::csv(path, error))?);
    let mut rows = Vec::new();

    for result in reader.byte_records() {
        match result {
            Ok(row) => rows.push(record_from_row(&headers, &row)),
            Err(error) => error!("CSV deserialization error in {path:?}: {error}")
        }
    }

    Ok(Some(Table::new(headers, rows)))
}

pub(crate) fn header_names(headers: &ByteRecord) -> Vec<String> {
    headers.iter().map(|name| String::from_utf8_lossy(name).into_owned()).collect()
}

/// Pairs a CSV row with the header. Short rows leave their trailing fields absent.
/// Invalid UTF-8 is replaced rather than rejected so that every row survives.
pub(crate) fn record_from_row(headers: &[String], row: &ByteRecord) -> Record {
    let mut record = Record::with_capacity(headers.len());

    for (name, cell) in headers.iter().zip(row.iter()) {
        let cell = String::from_utf8_lossy(cell);

        if let Cow::Owned(_) = cell {
            warn!("Replaced invalid UTF-8 in [{name}] on line {}", row.position().map_or(0, |position| position.line()));
        }

        record.insert(name.as_str(), Value::parse(&cell));
    }

    record
}
