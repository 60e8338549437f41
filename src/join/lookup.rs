use std::collections::HashMap;

use tracing::debug;

use crate::join::normalizer::Coercion;
use crate::sources::Table;
use crate::types::{JoinKey, Record};

/// A reference table indexed by its normalized key.
#[derive(Debug, Default)]
pub struct Lookup {
    entries: HashMap<JoinKey, Record>
}

impl Lookup {
    /// Indexes every row under its coerced `key_field`. Rows without a usable key are
    /// left out, and a later row replaces an earlier one sharing its key.
    pub fn build(table: Table, key_field: &str, coercion: Coercion) -> Self {
        let mut entries = HashMap::with_capacity(table.len());
        let mut unkeyed = 0usize;

        for row in table.into_rows() {
            match row.get(key_field).and_then(|value| coercion.key(value)) {
                Some(key) => {
                    entries.insert(key, row);
                }
                None => unkeyed += 1
            }
        }

        if unkeyed > 0 {
            debug!("Excluded {unkeyed} rows without a [{key_field}] key from the lookup");
        }

        Self { entries }
    }

    pub fn get(&self, key: &JoinKey) -> Option<&Record> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
