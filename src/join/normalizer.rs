use std::fmt;
use std::fmt::{Display, Formatter};

use crate::types::{ColumnType, JoinKey, Value};

/// The representation a join key is compared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Integer,
    Decimal,
    Text
}

impl KeyKind {
    pub fn of(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Integer => KeyKind::Integer,
            ColumnType::Decimal => KeyKind::Decimal,
            ColumnType::Null | ColumnType::Text => KeyKind::Text
        }
    }

    /// Casts a value into this kind, `None` when it has no reading in it.
    fn cast(&self, value: &Value) -> Option<JoinKey> {
        match self {
            KeyKind::Integer => value.as_integer().map(JoinKey::Integer),
            KeyKind::Decimal => value.as_decimal().map(|decimal| JoinKey::Decimal(decimal.normalize())),
            KeyKind::Text => Some(JoinKey::Text(value.to_string()))
        }
    }
}

/// How both sides of a join turn their key values into comparable `JoinKey`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Both sides are cast to the transaction-side column's kind.
    Native(KeyKind),
    /// The reference side could not be cast, both sides compare as strings.
    Canonical
}

impl Coercion {
    /// Picks the left column's kind as the target and falls back to `Canonical` as soon
    /// as one non-null right value cannot be cast into it.
    pub fn harmonize<'a>(left: ColumnType, right: impl IntoIterator<Item = &'a Value>) -> Self {
        let kind = KeyKind::of(left);

        let castable = right.into_iter()
            .filter(|value| !value.is_null())
            .all(|value| kind.cast(value).is_some());

        if castable {
            Coercion::Native(kind)
        } else {
            Coercion::Canonical
        }
    }

    /// Normalizes one key value. Nulls never produce a key, and neither do
    /// left-side values that have no reading in the target kind.
    pub fn key(&self, value: &Value) -> Option<JoinKey> {
        if value.is_null() {
            return None;
        }

        match self {
            Coercion::Native(kind) => kind.cast(value),
            Coercion::Canonical => Some(JoinKey::Text(value.to_string()))
        }
    }
}

impl Display for Coercion {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Coercion::Native(KeyKind::Integer) => formatter.write_str("integer keys"),
            Coercion::Native(KeyKind::Decimal) => formatter.write_str("decimal keys"),
            Coercion::Native(KeyKind::Text) => formatter.write_str("text keys"),
            Coercion::Canonical => formatter.write_str("canonical string keys")
        }
    }
}
