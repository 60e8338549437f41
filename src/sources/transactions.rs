use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{Reader, ReaderBuilder, Trim};
use tracing::debug;

use crate::sources::errors::SourceError;
use crate::sources::table::{header_names, record_from_row, Column, Table};
use crate::types::{ColumnType, Record};

/// The primary transaction stream.
///
/// Opening the source reads the header and buffers a sample of rows from which the
/// column types are inferred, so that the join keys have a declared type before the
/// first row is enriched. Both engines open the stream the same way, which keeps their
/// key coercions identical.
pub struct TransactionSource {
    path: PathBuf,
    headers: Vec<String>,
    columns: Vec<Column>,
    sample: VecDeque<Record>,
    reader: Reader<BufReader<File>>
}

impl TransactionSource {
    pub fn open(path: &Path, sample_rows: usize) -> Result<Self, SourceError> {
        if !path.exists() {
            return Err(SourceError::missing_transactions(path));
        }

        let file = File::open(path).map_err(|error| SourceError::io(path, error))?;

        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let headers = header_names(reader.byte_headers().map_err(|error| SourceError::csv(path, error))?);
        let mut sample = VecDeque::with_capacity(sample_rows);
        let mut records = reader.byte_records();

        while sample.len() < sample_rows {
            match records.next() {
                Some(row) => sample.push_back(record_from_row(&headers, &row.map_err(|error| SourceError::csv(path, error))?)),
                None => break
            }
        }

        let columns = headers.iter()
            .map(|name| {
                let column_type = ColumnType::infer(sample.iter().filter_map(|row| row.get(name)));
                Column::new(name.as_str(), column_type)
            })
            .collect();

        debug!("Inferred transaction schema from {} sampled rows", sample.len());

        Ok(Self { path: path.to_path_buf(), headers, columns, sample, reader })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Yields the sampled rows followed by the remainder of the file.
    ///
    /// Every row is kept: undecodable bytes are replaced, and a read error ends the
    /// stream with that error so the run can abort instead of merging a partial table.
    pub fn into_records(self) -> impl Iterator<Item = Result<Record, SourceError>> + Send {
        let Self { path, headers, sample, reader, .. } = self;

        let remainder = reader.into_byte_records().map(move |result| {
            result
                .map(|row| record_from_row(&headers, &row))
                .map_err(|error| SourceError::csv(&path, error))
        });

        sample.into_iter().map(Ok).chain(remainder)
    }

    /// Reads the whole stream into memory, keeping the sampled schema.
    pub fn into_table(self) -> Result<Table, SourceError> {
        let columns = self.columns.clone();
        let rows = self.into_records().collect::<Result<Vec<Record>, SourceError>>()?;

        Ok(Table::with_columns(columns, rows))
    }
}
