use std::ffi::OsString;
use std::fs::{create_dir_all, remove_file, rename, File};
use std::path::{Path, PathBuf};

use csv::{Terminator, Writer, WriterBuilder};
use tracing::{debug, info};

use crate::output::errors::OutputError;
use crate::types::{Record, Value};

/// The output header: the seed columns followed by any other field seen in `rows`, in first-seen order.
pub fn output_columns<'a>(seed: &[String], rows: impl IntoIterator<Item = &'a Record>) -> Vec<String> {
    let mut columns = seed.to_vec();

    for row in rows {
        for (name, _) in row.fields() {
            if !columns.iter().any(|column| column == name) {
                columns.push(name.to_string());
            }
        }
    }

    columns
}

/// Writes the unified table to a temporary sibling of the destination and moves it into
/// place on `finish`. An unfinished writer removes its temporary file when dropped, so a
/// failed run never leaves a partial output behind.
pub struct OutputWriter {
    destination: PathBuf,
    temporary: PathBuf,
    columns: Vec<String>,
    writer: Option<Writer<File>>,
    rows: usize,
    finished: bool
}

impl OutputWriter {
    pub fn create(destination: &Path, columns: Vec<String>) -> Result<Self, OutputError> {
        if let Some(parent) = destination.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            create_dir_all(parent).map_err(|error| OutputError::io(parent, error))?;
        }

        let temporary = temporary_path(destination);

        let mut writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_path(&temporary)
            .map_err(|error| OutputError::csv(&temporary, error))?;

        writer.write_record(&columns).map_err(|error| OutputError::csv(&temporary, error))?;

        debug!("Writing {} columns to {temporary:?}", columns.len());

        Ok(Self {
            destination: destination.to_path_buf(),
            temporary,
            columns,
            writer: Some(writer),
            rows: 0,
            finished: false
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Writes one row in header order. Fields outside the header are ignored, missing ones are empty.
    pub fn write(&mut self, record: &Record) -> Result<(), OutputError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };

        let values: Vec<&Value> = self.columns.iter()
            .map(|column| record.get(column).unwrap_or(&Value::Null))
            .collect();

        writer.serialize(values).map_err(|error| OutputError::csv(&self.temporary, error))?;
        self.rows += 1;

        Ok(())
    }

    /// Publishes the file. With no data rows nothing is published and `None` is returned.
    pub fn finish(mut self) -> Result<Option<PathBuf>, OutputError> {
        if let Some(writer) = self.writer.take() {
            writer.into_inner().map_err(|error| OutputError::io(&self.temporary, error.into_error()))?;
        }

        if self.rows == 0 {
            remove_file(&self.temporary).map_err(|error| OutputError::io(&self.temporary, error))?;
            self.finished = true;
            info!("No rows to write, {:?} was not created", self.destination);
            return Ok(None);
        }

        rename(&self.temporary, &self.destination).map_err(|error| OutputError::io(&self.destination, error))?;
        self.finished = true;

        Ok(Some(self.destination.clone()))
    }
}

impl Drop for OutputWriter {
    fn drop(&mut self) {
        if !self.finished {
            self.writer.take();
            let _ = remove_file(&self.temporary);
        }
    }
}

fn temporary_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
