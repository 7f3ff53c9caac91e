mod key;

#[cfg(test)]
mod tests;

use derive_more::From;
use serde::{Deserialize, Serialize};
use std::fmt;

// re-exports
pub use key::KeyValue;

///
/// Value
///
/// Scalar cell value carried by a row.
/// Attribute columns may hold any variant; key columns are narrowed into
/// [`KeyValue`] by the mapper according to the table schema.
///

#[derive(Clone, Debug, Deserialize, From, PartialEq, Serialize)]
pub enum Value {
    Blob(#[serde(with = "serde_bytes")] Vec<u8>),
    Bool(bool),
    Double(f64),
    Int(i64),
    Text(String),
}

impl Value {
    /// Build a binary value.
    #[must_use]
    pub fn blob(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Blob(bytes.into())
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Short label for the variant, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Blob(_) => "blob",
            Self::Bool(_) => "bool",
            Self::Double(_) => "double",
            Self::Int(_) => "int",
            Self::Text(_) => "text",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blob(bytes) => write!(f, "blob({} bytes)", bytes.len()),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}
