use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// KeyValue
///
/// Primary-key cell as the backend sees it.
///
/// `InfMin` and `InfMax` are the backend's open-range sentinels. Variant
/// order is significant: the derived `Ord` places `InfMin` below and
/// `InfMax` above every concrete key, which is the scan order the backend
/// uses for range bounds.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum KeyValue {
    InfMin,
    Int(i64),
    Text(String),
    Blob(#[serde(with = "serde_bytes")] Vec<u8>),
    InfMax,
}

impl KeyValue {
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        matches!(self, Self::InfMin | Self::InfMax)
    }

    /// Convert a concrete key cell back into a row value.
    /// Sentinels have no row representation and yield `None`.
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Int(v) => Some(Value::Int(v)),
            Self::Text(v) => Some(Value::Text(v)),
            Self::Blob(v) => Some(Value::Blob(v)),
            Self::InfMin | Self::InfMax => None,
        }
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InfMin => write!(f, "INF_MIN"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Blob(v) => write!(f, "blob({} bytes)", v.len()),
            Self::InfMax => write!(f, "INF_MAX"),
        }
    }
}
