//! Row value representation for source-to-target data transfer.
//!
//! Rows arrive from the source drivers as vectors of [`SqlValue`]; the
//! per-dialect `transform_value` hook rewrites them where the type mapping
//! requires it, and the COPY encoder turns them into the target wire format.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A single source row value, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL. Encoded as a -1 length in COPY binary regardless of column type.
    Null,

    /// Boolean value.
    Bool(bool),

    /// 16-bit signed integer (smallint).
    I16(i16),

    /// 32-bit signed integer (integer).
    I32(i32),

    /// 64-bit signed integer (bigint).
    I64(i64),

    /// 32-bit floating point (real).
    F32(f32),

    /// 64-bit floating point (double precision).
    F64(f64),

    /// Arbitrary-precision decimal (numeric).
    Decimal(Decimal),

    /// Text data (text, varchar, enum, json, ...).
    Text(String),

    /// One-dimensional text array (`text[]`, used by `set_mode = "text_array"`).
    TextArray(Vec<String>),

    /// Binary data (bytea).
    Bytes(Vec<u8>),

    /// UUID (used by `binary16_as_uuid`).
    Uuid(Uuid),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),

    /// Timestamp without timezone. Timestamps read from the source are
    /// normalised to UTC at the connection level, so the same variant feeds
    /// both `timestamp` and `timestamptz` target columns.
    DateTime(NaiveDateTime),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Short kind label for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::I16(_) => "smallint",
            SqlValue::I32(_) => "integer",
            SqlValue::I64(_) => "bigint",
            SqlValue::F32(_) => "real",
            SqlValue::F64(_) => "double",
            SqlValue::Decimal(_) => "numeric",
            SqlValue::Text(_) => "text",
            SqlValue::TextArray(_) => "text[]",
            SqlValue::Bytes(_) => "bytes",
            SqlValue::Uuid(_) => "uuid",
            SqlValue::Date(_) => "date",
            SqlValue::Time(_) => "time",
            SqlValue::DateTime(_) => "timestamp",
        }
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_null() {
        assert!(SqlValue::Null.is_null());
        assert!(!SqlValue::I32(0).is_null());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(SqlValue::Text("x".to_string()).kind(), "text");
        assert_eq!(SqlValue::Bytes(vec![]).kind(), "bytes");
        assert_eq!(SqlValue::Null.kind(), "null");
    }
}
