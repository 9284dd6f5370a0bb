//! Row-to-JSON conversion for query results.
//!
//! `sqlx::mysql::MySqlRow` columns decode into a handful of Rust types; this
//! module normalizes them into the JSON shapes the tool envelope (spec §6)
//! expects: decimals become floats, temporal columns become ISO-8601
//! strings, and binary columns fall back from UTF-8 to hex.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Convert one row into a JSON object keyed by column name, in column order.
pub fn row_to_json(row: &MySqlRow) -> (Vec<String>, serde_json::Map<String, Value>) {
    let mut columns = Vec::with_capacity(row.columns().len());
    let mut record = serde_json::Map::with_capacity(row.columns().len());

    for (idx, col) in row.columns().iter().enumerate() {
        let name = col.name().to_string();
        let value = decode_column(row, idx, col.type_info().name());
        columns.push(name.clone());
        record.insert(name, value);
    }

    (columns, record)
}

fn decode_column(row: &MySqlRow, idx: usize, type_name: &str) -> Value {
    let raw = match row.try_get_raw(idx) {
        Ok(v) => v,
        Err(_) => return Value::Null,
    };
    if raw.is_null() {
        return Value::Null;
    }

    match type_name {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row
            .try_get::<i64, _>(idx)
            .map(Value::from)
            .or_else(|_| row.try_get::<u64, _>(idx).map(Value::from))
            .unwrap_or(Value::Null),

        "FLOAT" | "DOUBLE" => row
            .try_get::<f64, _>(idx)
            .map(|f| {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            })
            .unwrap_or(Value::Null),

        "DECIMAL" => row
            .try_get::<rust_decimal::Decimal, _>(idx)
            .ok()
            .and_then(|d| {
                use rust_decimal::prelude::ToPrimitive;
                d.to_f64()
            })
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),

        "DATE" => row
            .try_get::<NaiveDate, _>(idx)
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),

        "TIME" => row
            .try_get::<NaiveTime, _>(idx)
            .map(|t| Value::String(t.format("%H:%M:%S").to_string()))
            .unwrap_or(Value::Null),

        "DATETIME" | "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(idx)
            .map(|dt| Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null),

        "TINYINT(1)" | "BOOLEAN" | "BOOL" => row
            .try_get::<bool, _>(idx)
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => row
            .try_get::<Vec<u8>, _>(idx)
            .map(|bytes| bytes_to_value(&bytes))
            .unwrap_or(Value::Null),

        _ => row
            .try_get::<String, _>(idx)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Decode bytes as UTF-8 if possible; otherwise fall back to a hex string.
fn bytes_to_value(bytes: &[u8]) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(s) => Value::String(s.to_string()),
        Err(_) => Value::String(hex::encode(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_to_value_prefers_utf8() {
        assert_eq!(bytes_to_value(b"hello"), Value::String("hello".into()));
    }

    #[test]
    fn bytes_to_value_falls_back_to_hex() {
        let bytes = [0xff, 0x00, 0xab];
        assert_eq!(bytes_to_value(&bytes), Value::String("ff00ab".into()));
    }
}
