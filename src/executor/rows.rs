//! Row projection
//!
//! Projects driver rows into JSON objects, preserving the database's column
//! order exactly. Decoding is driven by the reported column type; anything
//! unrecognized falls back to a text read and finally JSON null.

use serde_json::{Map, Number, Value};
use sqlx::postgres::{PgColumn, PgRow};
use sqlx::{Column, Row, TypeInfo};

/// Project one row into a JSON object, column order preserved
pub fn row_to_json(row: &PgRow) -> Value {
    let mut object = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        object.insert(column.name().to_string(), decode_column(row, column));
    }
    Value::Object(object)
}

/// Decoder selected from the column's reported type name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    /// The one-byte `"char"` type; its reported name carries the quotes
    Byte,
    Float4,
    Float8,
    Text,
    Uuid,
    Json,
    TimestampTz,
    Timestamp,
    Date,
    Time,
    /// Unrecognized type: text read, then null
    Other,
}

impl ColumnKind {
    fn from_type_name(name: &str) -> Self {
        match name {
            "BOOL" => ColumnKind::Bool,
            "INT2" => ColumnKind::Int2,
            "INT4" => ColumnKind::Int4,
            "INT8" => ColumnKind::Int8,
            "\"CHAR\"" => ColumnKind::Byte,
            "FLOAT4" => ColumnKind::Float4,
            "FLOAT8" => ColumnKind::Float8,
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => ColumnKind::Text,
            "UUID" => ColumnKind::Uuid,
            "JSON" | "JSONB" => ColumnKind::Json,
            "TIMESTAMPTZ" => ColumnKind::TimestampTz,
            "TIMESTAMP" => ColumnKind::Timestamp,
            "DATE" => ColumnKind::Date,
            "TIME" => ColumnKind::Time,
            _ => ColumnKind::Other,
        }
    }
}

fn decode_column(row: &PgRow, column: &PgColumn) -> Value {
    let idx = column.ordinal();
    match ColumnKind::from_type_name(column.type_info().name()) {
        ColumnKind::Bool => scalar(row.try_get::<Option<bool>, _>(idx), Value::Bool),
        ColumnKind::Int2 => scalar(row.try_get::<Option<i16>, _>(idx), |v| int(v as i64)),
        ColumnKind::Int4 => scalar(row.try_get::<Option<i32>, _>(idx), |v| int(v as i64)),
        ColumnKind::Int8 => scalar(row.try_get::<Option<i64>, _>(idx), int),
        ColumnKind::Byte => scalar(row.try_get::<Option<i8>, _>(idx), |v| int(v as i64)),
        ColumnKind::Float4 => scalar(row.try_get::<Option<f32>, _>(idx), |v| float(v as f64)),
        ColumnKind::Float8 => scalar(row.try_get::<Option<f64>, _>(idx), float),
        ColumnKind::Text => scalar(row.try_get::<Option<String>, _>(idx), Value::String),
        ColumnKind::Uuid => scalar(row.try_get::<Option<uuid::Uuid>, _>(idx), |v| {
            Value::String(v.to_string())
        }),
        ColumnKind::Json => scalar(row.try_get::<Option<Value>, _>(idx), |v| v),
        ColumnKind::TimestampTz => scalar(
            row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx),
            |v| Value::String(v.to_rfc3339()),
        ),
        ColumnKind::Timestamp => {
            scalar(row.try_get::<Option<chrono::NaiveDateTime>, _>(idx), |v| {
                Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            })
        }
        ColumnKind::Date => scalar(row.try_get::<Option<chrono::NaiveDate>, _>(idx), |v| {
            Value::String(v.to_string())
        }),
        ColumnKind::Time => scalar(row.try_get::<Option<chrono::NaiveTime>, _>(idx), |v| {
            Value::String(v.to_string())
        }),
        ColumnKind::Other => scalar(row.try_get::<Option<String>, _>(idx), Value::String),
    }
}

fn scalar<T>(result: Result<Option<T>, sqlx::Error>, project: impl FnOnce(T) -> Value) -> Value {
    match result {
        Ok(Some(v)) => project(v),
        // NULL column, or a value this projection cannot decode
        _ => Value::Null,
    }
}

fn int(v: i64) -> Value {
    Value::Number(Number::from(v))
}

fn float(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_byte_char_name_includes_quotes() {
        // The driver reports the one-byte type as "CHAR" with embedded
        // quotes; the bare name never occurs
        assert_eq!(ColumnKind::from_type_name("\"CHAR\""), ColumnKind::Byte);
        assert_eq!(ColumnKind::from_type_name("CHAR"), ColumnKind::Other);
    }

    #[test]
    fn test_character_types_map_to_text() {
        for name in ["TEXT", "VARCHAR", "BPCHAR", "NAME"] {
            assert_eq!(ColumnKind::from_type_name(name), ColumnKind::Text);
        }
    }

    #[test]
    fn test_unknown_types_fall_back() {
        assert_eq!(ColumnKind::from_type_name("NUMERIC"), ColumnKind::Other);
        assert_eq!(ColumnKind::from_type_name("BYTEA"), ColumnKind::Other);
    }

    #[test]
    fn test_numeric_projection_helpers() {
        assert_eq!(int(7), Value::Number(Number::from(7)));
        assert_eq!(float(f64::NAN), Value::Null);
    }
}
