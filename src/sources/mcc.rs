use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::sources::table::Table;
use crate::types::{Record, Value};

pub const MCC: &str = "mcc";
pub const MCC_DESCRIPTION: &str = "mcc_description";

/// Loads the merchant-category lookup. Missing or malformed files yield the empty table.
pub fn load_mcc_table(path: &Path) -> Table {
    if !path.exists() {
        info!("MCC source {path:?} not found, mcc join disabled");
        return Table::empty();
    }

    let raw: Result<serde_json::Value, String> = match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).map_err(|error| format!("invalid JSON: {error}")),
        Err(error) => Err(error.to_string())
    };

    match raw.and_then(mcc_table) {
        Ok(table) => {
            info!("Loaded {} merchant categories from {path:?}", table.len());
            table
        }
        Err(reason) => {
            warn!("MCC source {path:?} is unusable ({reason}), mcc join disabled");
            Table::empty()
        }
    }
}

/// Accepts `{code: description}` or an array of objects carrying an `mcc` field.
pub fn mcc_table(raw: serde_json::Value) -> Result<Table, String> {
    match raw {
        serde_json::Value::Object(members) => {
            let rows = members.into_iter()
                .map(|(code, description)| {
                    let mut row = Record::with_capacity(2);
                    row.insert(MCC, Value::Text(code));
                    row.insert(MCC_DESCRIPTION, Value::from_json(description));
                    row
                })
                .collect();

            Ok(Table::new(vec![MCC.to_string(), MCC_DESCRIPTION.to_string()], rows))
        }
        serde_json::Value::Array(items) => {
            let rows = items.into_iter()
                .map(|item| match item {
                    serde_json::Value::Object(members) => Ok(members.into_iter()
                        .map(|(name, value)| (name, Value::from_json(value)))
                        .collect::<Record>()),
                    _ => Err("array holds a non-object entry".to_string())
                })
                .collect::<Result<Vec<Record>, String>>()?;

            if !rows.iter().any(|row| row.contains(MCC)) {
                return Err(format!("rows carry no {MCC} field"));
            }

            Ok(Table::from_records(rows))
        }
        _ => Err("expected an object or an array".to_string())
    }
}
