use crate::types::{Record, Value};

/// A column-major batch of transactions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Vec<Value>>,
    height: usize
}

impl Frame {
    /// Pivots records into columns. Fields a record lacks become nulls.
    pub fn from_records(rows: Vec<Record>) -> Self {
        let height = rows.len();
        let mut frame = Self { names: Vec::new(), columns: Vec::new(), height };

        for (index, row) in rows.into_iter().enumerate() {
            for (name, value) in row.fields() {
                let position = match frame.position(name) {
                    Some(position) => position,
                    None => {
                        frame.names.push(name.to_string());
                        frame.columns.push(vec![Value::Null; height]);
                        frame.columns.len() - 1
                    }
                };

                frame.columns[position][index] = value.clone();
            }
        }

        frame
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.position(name).map(|position| self.columns[position].as_slice())
    }

    /// Takes a column out for rewriting, or a column of nulls when it does not exist yet.
    pub fn take_column(&mut self, name: &str) -> Vec<Value> {
        match self.position(name) {
            Some(position) => std::mem::take(&mut self.columns[position]),
            None => vec![Value::Null; self.height]
        }
    }

    /// Stores a column, replacing one of the same name in place or appending it.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.height);

        match self.position(name) {
            Some(position) => self.columns[position] = values,
            None => {
                self.names.push(name.to_string());
                self.columns.push(values);
            }
        }
    }

    pub fn into_records(self) -> Vec<Record> {
        let Self { names, columns, height } = self;
        let mut rows: Vec<Record> = (0..height).map(|_| Record::with_capacity(names.len())).collect();

        for (name, values) in names.iter().zip(columns) {
            for (row, value) in rows.iter_mut().zip(values) {
                row.insert(name.as_str(), value);
            }
        }

        rows
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|existing| existing == name)
    }
}
