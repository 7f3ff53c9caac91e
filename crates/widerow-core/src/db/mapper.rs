//! Module: db::mapper
//! Responsibility: pure translation between rows and backend key/attribute shapes.
//! Does not own: request assembly (see `db::write`) or backend calls.
//! Boundary: every conversion here is synchronous and side-effect free.

use crate::{
    backend::{Attributes, PrimaryKey, RowPayload},
    row::Row,
    schema::{PrimaryKeySchema, PrimaryKeyType},
    value::{KeyValue, Value},
};
use thiserror::Error as ThisError;

///
/// MapperError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum MapperError {
    #[error("row is empty")]
    EmptyRow,

    #[error("row is missing primary key column '{column}'")]
    MissingPrimaryKey { column: String },

    #[error("primary key column '{column}' is INTEGER but '{raw}' is not a 64-bit integer")]
    IntegerKeyEncoding { column: String, raw: String },

    #[error("primary key column '{column}' is {expected} but the row holds a {found} value")]
    KeyTypeMismatch {
        column: String,
        expected: PrimaryKeyType,
        found: &'static str,
    },

    #[error("response primary key column '{column}' holds a range sentinel")]
    SentinelInResponse { column: String },
}

/// Encode the row's primary-key columns in schema order.
///
/// A column absent from the row takes `fallback` verbatim when one is given
/// (range sentinels included) and is omitted otherwise, so callers can build
/// both complete keys and partial keys from the same row.
pub fn row_to_primary_key(
    schema: &PrimaryKeySchema,
    row: &Row,
    fallback: Option<&KeyValue>,
) -> Result<PrimaryKey, MapperError> {
    let mut key = PrimaryKey::default();

    for column in schema.columns() {
        match (row.get(&column.name), fallback) {
            (Some(value), _) => key.push(&column.name, encode_key(&column.name, column.ty, value)?),
            (None, Some(fallback)) => key.push(&column.name, fallback.clone()),
            (None, None) => {}
        }
    }

    Ok(key)
}

/// Encode a complete primary key; every schema column must be present.
pub fn row_to_full_primary_key(
    schema: &PrimaryKeySchema,
    row: &Row,
) -> Result<PrimaryKey, MapperError> {
    if let Some(column) = schema.columns().iter().find(|c| !row.contains_key(&c.name)) {
        return Err(MapperError::MissingPrimaryKey {
            column: column.name.clone(),
        });
    }

    row_to_primary_key(schema, row, None)
}

/// Every non-key row field, in the row's own iteration order.
#[must_use]
pub fn row_to_attribute_columns(schema: &PrimaryKeySchema, row: &Row) -> Attributes {
    row.iter()
        .filter(|(name, _)| !schema.contains(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Merge a backend row payload into one flat row.
///
/// An entirely empty payload is the backend's "not found" marker and maps
/// to `None`.
pub fn params_to_row(payload: RowPayload) -> Result<Option<Row>, MapperError> {
    if payload.is_empty() {
        return Ok(None);
    }

    let mut row = Row::new();
    for (column, cell) in payload.primary_key {
        let value = cell
            .into_value()
            .ok_or_else(|| MapperError::SentinelInResponse {
                column: column.clone(),
            })?;
        row.set(column, value);
    }
    for (column, value) in payload.attributes {
        row.set(column, value);
    }

    Ok(Some(row))
}

/// Map a list of payloads, dropping any that carry the not-found marker.
pub(crate) fn payloads_to_rows(
    payloads: impl IntoIterator<Item = RowPayload>,
) -> Result<Vec<Row>, MapperError> {
    let mut rows = Vec::new();
    for payload in payloads {
        if let Some(row) = params_to_row(payload)? {
            rows.push(row);
        }
    }

    Ok(rows)
}

// Narrow one row value into the key cell the column type requires.
fn encode_key(column: &str, ty: PrimaryKeyType, value: &Value) -> Result<KeyValue, MapperError> {
    let mismatch = || MapperError::KeyTypeMismatch {
        column: column.to_string(),
        expected: ty,
        found: value.kind(),
    };

    match (ty, value) {
        (PrimaryKeyType::String, Value::Text(v)) => Ok(KeyValue::Text(v.clone())),
        (PrimaryKeyType::Binary, Value::Blob(v)) => Ok(KeyValue::Blob(v.clone())),
        (PrimaryKeyType::Integer, Value::Int(v)) => Ok(KeyValue::Int(*v)),
        (PrimaryKeyType::Integer, Value::Text(raw)) => {
            raw.trim()
                .parse::<i64>()
                .map(KeyValue::Int)
                .map_err(|_| MapperError::IntegerKeyEncoding {
                    column: column.to_string(),
                    raw: raw.clone(),
                })
        }
        (PrimaryKeyType::Integer, Value::Double(v)) => double_to_i64(*v)
            .map(KeyValue::Int)
            .ok_or_else(|| MapperError::IntegerKeyEncoding {
                column: column.to_string(),
                raw: v.to_string(),
            }),
        _ => Err(mismatch()),
    }
}

// Only integral doubles inside the i64 range are accepted.
#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn double_to_i64(v: f64) -> Option<i64> {
    const LOWER: f64 = i64::MIN as f64;
    const UPPER: f64 = i64::MAX as f64;

    if v.is_finite() && v.fract() == 0.0 && (LOWER..UPPER).contains(&v) {
        Some(v as i64)
    } else {
        None
    }
}
