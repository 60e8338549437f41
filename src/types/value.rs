use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Serialize, Serializer};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A single scalar cell of a record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Decimal(Decimal),
    Text(String)
}

impl Value {
    /// Parses a raw CSV cell.
    ///
    /// Numbers are only recognised when their canonical rendering matches the
    /// input exactly, so a cell such as `007` or `$-77.00` stays textual and is
    /// written back unchanged.
    pub fn parse(cell: &str) -> Self {
        let cell = cell.trim();

        if cell.is_empty() {
            return Value::Null;
        }

        if let Ok(integer) = i64::from_str(cell) {
            if integer.to_string() == cell {
                return Value::Integer(integer);
            }
        }

        if let Ok(decimal) = Decimal::from_str(cell) {
            if decimal.to_string() == cell {
                return Value::Decimal(decimal);
            }
        }

        Value::Text(cell.to_string())
    }

    /// Converts a JSON value into a scalar. Strings are kept as text and never re-parsed.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(flag) => Value::Text(flag.to_string()),
            serde_json::Value::Number(number) => {
                if let Some(integer) = number.as_i64() {
                    Value::Integer(integer)
                } else {
                    let rendered = number.to_string();
                    Decimal::from_str(&rendered)
                        .map(Value::Decimal)
                        .unwrap_or(Value::Text(rendered))
                }
            }
            serde_json::Value::String(text) => Value::Text(text),
            nested => Value::Text(nested.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Null,
            Value::Integer(_) => ColumnType::Integer,
            Value::Decimal(_) => ColumnType::Decimal,
            Value::Text(_) => ColumnType::Text
        }
    }

    /// Casts the value to an integer, `None` when it has no integral reading.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(integer) => Some(*integer),
            Value::Decimal(decimal) if decimal.fract().is_zero() => decimal.to_i64(),
            Value::Text(text) => i64::from_str(text.trim()).ok(),
            _ => None
        }
    }

    /// Casts the value to a decimal, `None` when it has no numeric reading.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(integer) => Some(Decimal::from(*integer)),
            Value::Decimal(decimal) => Some(*decimal),
            Value::Text(text) => Decimal::from_str(text.trim()).ok(),
            Value::Null => None
        }
    }
}

impl Display for Value {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(integer) => write!(formatter, "{integer}"),
            Value::Decimal(decimal) => write!(formatter, "{decimal}"),
            Value::Text(text) => formatter.write_str(text)
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Integer(integer) => serializer.serialize_i64(*integer),
            Value::Decimal(decimal) => serializer.collect_str(decimal),
            Value::Text(text) => serializer.serialize_str(text)
        }
    }
}

/// The declared type of a column, inferred from the values it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ColumnType {
    #[default]
    Null,
    Integer,
    Decimal,
    Text
}

impl ColumnType {
    /// Widens the type so that it also holds `other` (Integer < Decimal < Text).
    pub fn widen(self, other: ColumnType) -> ColumnType {
        self.max(other)
    }

    /// Infers the narrowest type holding every value.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> ColumnType {
        values.into_iter()
            .fold(ColumnType::Null, |column_type, value| column_type.widen(value.column_type()))
    }
}
