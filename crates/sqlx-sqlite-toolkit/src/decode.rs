//! SQLite value to JSON decoding

use base64::Engine;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteRow, SqliteValue, SqliteValueRef};
use sqlx::{Column, Row, TypeInfo, Value, ValueRef};
use time::{Date, PrimitiveDateTime, Time};

use crate::Error;

/// Convert one SQLite value to JSON.
///
/// `declared` is the column type sqlx reports for the result column, which
/// follows the declared type for table columns. Integers keep full i64
/// precision and BLOBs become base64 strings. Values in a `DATE`, `TIME`
/// or `DATETIME` column are normalized through the `time` crate when they
/// parse, and decoded by storage class otherwise.
pub fn to_json(v: SqliteValueRef<'_>, declared: &str) -> Result<JsonValue, Error> {
   if v.is_null() {
      return Ok(JsonValue::Null);
   }

   let value = v.to_owned();
   if let Some(json) = decode_temporal(&value, declared) {
      return Ok(json);
   }

   // Non-null values report their storage class here
   let type_info = value.type_info();
   let json = match type_info.name() {
      "TEXT" => JsonValue::String(value.try_decode_unchecked::<String>()?),
      "REAL" => JsonValue::from(value.try_decode_unchecked::<f64>()?),
      "INTEGER" | "BIGINT" | "INT8" | "NUMERIC" | "BOOLEAN" => {
         JsonValue::Number(value.try_decode_unchecked::<i64>()?.into())
      }
      "BLOB" => {
         let bytes = value.try_decode_unchecked::<Vec<u8>>()?;
         JsonValue::String(base64::engine::general_purpose::STANDARD.encode(bytes))
      }
      "NULL" => JsonValue::Null,
      other => return Err(Error::UnsupportedDatatype(other.to_string())),
   };

   Ok(json)
}

fn decode_temporal(value: &SqliteValue, declared: &str) -> Option<JsonValue> {
   let text = match declared {
      "DATE" => value.try_decode_unchecked::<Date>().ok()?.to_string(),
      "TIME" => value.try_decode_unchecked::<Time>().ok()?.to_string(),
      "DATETIME" => value.try_decode_unchecked::<PrimitiveDateTime>().ok()?.to_string(),
      _ => return None,
   };
   Some(JsonValue::String(text))
}

/// Helper to decode SQLite rows to JSON, keeping column order
pub(crate) fn decode_rows(rows: Vec<SqliteRow>) -> Result<Vec<IndexMap<String, JsonValue>>, Error> {
   let mut values = Vec::with_capacity(rows.len());
   for row in rows {
      let mut value = IndexMap::default();
      for (i, column) in row.columns().iter().enumerate() {
         let v = row.try_get_raw(i)?;
         let declared = column.type_info().name();
         value.insert(column.name().to_string(), to_json(v, declared)?);
      }
      values.push(value);
   }
   Ok(values)
}
