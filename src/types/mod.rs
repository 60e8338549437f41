mod record;
mod value;

use rust_decimal::Decimal;

pub use record::Record;
pub use value::{ColumnType, Value};

/// The normalized form of a join key after coercion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JoinKey {
    Integer(i64),
    /// Always normalized, so `2.0` and `2` produce the same key.
    Decimal(Decimal),
    Text(String)
}
