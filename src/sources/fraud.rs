use std::fs;
use std::path::Path;

use serde_json::Map;
use tracing::{debug, info, warn};

use crate::sources::table::{load_csv_table, Table};
use crate::types::{Record, Value};

pub const TRANSACTION_ID: &str = "transaction_id";
const DEFAULT_LABEL: &str = "target";
const LEGACY_ID: &str = "id";

/// The outcome of resolving the fraud-label source.
///
/// The source has no guaranteed shape, so anything that cannot be read as a
/// `transaction_id`-keyed table degrades to `Unavailable` and the fraud join is skipped.
#[derive(Debug, Clone)]
pub enum FraudLabels {
    Available(Table),
    Unavailable(String)
}

impl FraudLabels {
    /// Loads and resolves the fraud-label file. Never fails: every problem degrades to `Unavailable`.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!("Fraud label source {path:?} not found, fraud join disabled");
            return Self::Unavailable(format!("{path:?} not found"));
        }

        let labels = if path.extension().is_some_and(|extension| extension.eq_ignore_ascii_case("csv")) {
            match load_csv_table(path) {
                Ok(Some(table)) => Self::resolve_table(table),
                Ok(None) => Self::Unavailable(format!("{path:?} not found")),
                Err(error) => Self::Unavailable(error.to_string())
            }
        } else {
            match fs::read_to_string(path) {
                Ok(contents) => match serde_json::from_str(&contents) {
                    Ok(raw) => Self::resolve(raw),
                    Err(error) => Self::Unavailable(format!("invalid JSON: {error}"))
                },
                Err(error) => Self::Unavailable(error.to_string())
            }
        };

        match &labels {
            Self::Available(table) => info!("Resolved {} fraud labels from {path:?}", table.len()),
            Self::Unavailable(reason) => warn!("Fraud labels in {path:?} are unusable ({reason}), fraud join disabled")
        }

        labels
    }

    /// Normalizes a parsed JSON document. The first shape that matches wins:
    /// a `transaction_id` keyed table (rows, columns, or a single row object), a flat `{id: label}` object,
    /// a single-member object wrapping such a map, then rows keyed by `id`.
    pub fn resolve(raw: serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Array(items) => Self::resolve_rows(items),
            serde_json::Value::Object(members) => Self::resolve_object(members),
            other => Self::Unavailable(format!("expected an object or an array, found {}", json_kind(&other)))
        }
    }

    /// The label table, or the empty table when unavailable.
    pub fn into_table(self) -> Table {
        match self {
            Self::Available(table) => table,
            Self::Unavailable(_) => Table::empty()
        }
    }

    fn resolve_table(table: Table) -> Self {
        if table.has_column(TRANSACTION_ID) {
            return Self::Available(table);
        }

        if table.has_column(LEGACY_ID) {
            let rows = table.into_rows().into_iter().map(rename_legacy_id).collect();
            return Self::Available(Table::from_records(rows));
        }

        Self::Unavailable(format!("no {TRANSACTION_ID} or {LEGACY_ID} column"))
    }

    fn resolve_rows(items: Vec<serde_json::Value>) -> Self {
        if items.is_empty() {
            return Self::Unavailable("empty array".to_string());
        }

        let mut rows = Vec::with_capacity(items.len());

        for item in items {
            let serde_json::Value::Object(members) = item else {
                return Self::Unavailable(format!("array holds a {} entry", json_kind(&item)));
            };

            rows.push(members.into_iter().map(|(name, value)| (name, Value::from_json(value))).collect::<Record>());
        }

        if rows.iter().any(|row| row.contains(TRANSACTION_ID)) {
            debug!("Fraud labels are rows keyed by {TRANSACTION_ID}");
            return Self::Available(Table::from_records(rows));
        }

        if rows.iter().any(|row| row.contains(LEGACY_ID)) {
            debug!("Fraud labels are rows keyed by {LEGACY_ID}, renaming to {TRANSACTION_ID}");
            let rows = rows.into_iter().map(rename_legacy_id).collect();
            return Self::Available(Table::from_records(rows));
        }

        Self::Unavailable(format!("rows carry neither {TRANSACTION_ID} nor {LEGACY_ID}"))
    }

    fn resolve_object(members: Map<String, serde_json::Value>) -> Self {
        if members.is_empty() {
            return Self::Unavailable("empty object".to_string());
        }

        if let Some(table) = columnar_table(&members) {
            debug!("Fraud labels are column oriented");
            return Self::Available(table);
        }

        if members.get(TRANSACTION_ID).is_some_and(is_scalar) {
            debug!("Fraud labels are a single row keyed by {TRANSACTION_ID}");
            let row = members.into_iter().map(|(name, value)| (name, Value::from_json(value))).collect::<Record>();
            return Self::Available(Table::from_records(vec![row]));
        }

        if members.values().all(is_scalar) {
            debug!("Fraud labels are a flat map");
            return Self::Available(label_table(members, DEFAULT_LABEL));
        }

        if members.len() == 1 {
            if let Some((label, serde_json::Value::Object(inner))) = members.into_iter().next() {
                if !inner.is_empty() && inner.values().all(is_scalar) {
                    debug!("Fraud labels are a flat map wrapped in [{label}]");
                    return Self::Available(label_table(inner, &label));
                }
            }

            return Self::Unavailable("single member does not wrap a flat label map".to_string());
        }

        Self::Unavailable("object values are neither labels nor columns".to_string())
    }
}

fn rename_legacy_id(mut row: Record) -> Record {
    row.rename(LEGACY_ID, TRANSACTION_ID);
    row
}

fn label_table(members: Map<String, serde_json::Value>, label: &str) -> Table {
    let rows = members.into_iter()
        .map(|(transaction_id, value)| {
            let mut row = Record::with_capacity(2);
            row.insert(TRANSACTION_ID, Value::Text(transaction_id));
            row.insert(label, Value::from_json(value));
            row
        })
        .collect();

    Table::new(vec![TRANSACTION_ID.to_string(), label.to_string()], rows)
}

/// `{"transaction_id": [..], "target": [..]}` with every member an array of the same length.
fn columnar_table(members: &Map<String, serde_json::Value>) -> Option<Table> {
    let height = members.get(TRANSACTION_ID)?.as_array()?.len();

    let columns: Vec<(&String, &Vec<serde_json::Value>)> = members.iter()
        .map(|(name, value)| value.as_array().filter(|values| values.len() == height).map(|values| (name, values)))
        .collect::<Option<_>>()?;

    let rows = (0..height)
        .map(|index| {
            columns.iter()
                .map(|(name, values)| (name.as_str(), Value::from_json(values[index].clone())))
                .collect::<Record>()
        })
        .collect();

    Some(Table::new(columns.iter().map(|(name, _)| name.to_string()).collect(), rows))
}

fn is_scalar(value: &serde_json::Value) -> bool {
    !value.is_array() && !value.is_object()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object"
    }
}
