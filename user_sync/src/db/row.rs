//! Column decoding
//!
//! Columns are decoded by the type MySQL reports for them rather than into
//! fixed Rust types, so any integer width or signedness, date-like column or
//! text column reaches the API with the value it was stored with.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use serde_json::{Number, Value};
use sqlx::mysql::MySqlRow;
use sqlx::{FromRow, Row, TypeInfo, ValueRef};

use crate::models::RawUserRecord;

/// How a column's values are turned into JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Null,
    Signed,
    Unsigned,
    Year,
    Float,
    Double,
    Date,
    DateTime,
    Timestamp,
    Time,
    Text,
    Binary,
}

impl ColumnKind {
    /// Classify a MySQL type name as reported by the driver
    pub fn from_type_name(name: &str) -> Self {
        let name = name.to_ascii_uppercase();

        if name.ends_with(" UNSIGNED") {
            return ColumnKind::Unsigned;
        }

        match name.as_str() {
            "NULL" => ColumnKind::Null,
            "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                ColumnKind::Signed
            }
            "YEAR" => ColumnKind::Year,
            "FLOAT" => ColumnKind::Float,
            "DOUBLE" => ColumnKind::Double,
            "DATE" => ColumnKind::Date,
            "DATETIME" => ColumnKind::DateTime,
            "TIMESTAMP" => ColumnKind::Timestamp,
            "TIME" => ColumnKind::Time,
            "VARBINARY" | "BINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
            | "GEOMETRY" => ColumnKind::Binary,
            // VARCHAR, CHAR, *TEXT, ENUM, SET, DECIMAL, JSON all arrive as text
            _ => ColumnKind::Text,
        }
    }
}

/// Decode one column of `row` into JSON
pub fn column_value(row: &MySqlRow, column: &str) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(column)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let kind = ColumnKind::from_type_name(raw.type_info().name());

    let value = match kind {
        ColumnKind::Null => Value::Null,
        ColumnKind::Signed => Value::from(row.try_get::<i64, _>(column)?),
        ColumnKind::Unsigned => Value::from(row.try_get::<u64, _>(column)?),
        ColumnKind::Year => Value::from(row.try_get_unchecked::<u16, _>(column)?),
        ColumnKind::Float => float_value(f64::from(row.try_get::<f32, _>(column)?)),
        ColumnKind::Double => float_value(row.try_get::<f64, _>(column)?),
        ColumnKind::Date => to_json(row.try_get::<NaiveDate, _>(column)?)?,
        ColumnKind::DateTime => to_json(row.try_get::<NaiveDateTime, _>(column)?)?,
        ColumnKind::Timestamp => to_json(row.try_get::<DateTime<Utc>, _>(column)?)?,
        ColumnKind::Time => to_json(row.try_get::<NaiveTime, _>(column)?)?,
        ColumnKind::Text => Value::from(row.try_get_unchecked::<String, _>(column)?),
        ColumnKind::Binary => binary_value(&row.try_get_unchecked::<Vec<u8>, _>(column)?),
    };

    Ok(value)
}

/// Non-finite floats have no JSON form and become `null`
pub fn float_value(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Bytes are sent as text, with invalid UTF-8 replaced
pub fn binary_value(bytes: &[u8]) -> Value {
    Value::from(String::from_utf8_lossy(bytes).into_owned())
}

fn to_json<T: Serialize>(value: T) -> Result<Value, sqlx::Error> {
    serde_json::to_value(value).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

impl<'r> FromRow<'r, MySqlRow> for RawUserRecord {
    fn from_row(row: &'r MySqlRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: column_value(row, "id")?,
            name: column_value(row, "name")?,
            email: column_value(row, "email")?,
            created_at: column_value(row, "created_at")?,
        })
    }
}
