//! Primary-key schema and its resolve-once lifecycle.

use crate::error::InternalError;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, future::Future, sync::Arc};
use thiserror::Error as ThisError;
use tokio::sync::Mutex;

///
/// SchemaError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("primary key schema must declare at least one column")]
    Empty,

    #[error("primary key column at index {index} has an empty name")]
    EmptyName { index: usize },

    #[error("primary key column '{name}' is declared more than once")]
    DuplicateColumn { name: String },
}

///
/// PrimaryKeyType
///
/// Semantic type of one primary-key column.
/// `Integer` columns are encoded as 64-bit signed integers on the wire.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrimaryKeyType {
    #[display("STRING")]
    String,
    #[display("INTEGER")]
    Integer,
    #[display("BINARY")]
    Binary,
}

///
/// PrimaryKeyColumn
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PrimaryKeyColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: PrimaryKeyType,
}

impl PrimaryKeyColumn {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: PrimaryKeyType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

///
/// PrimaryKeySchema
///
/// Ordered primary-key columns of one table.
/// Column order is the backend's sort order for range scans.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PrimaryKeySchema {
    columns: Vec<PrimaryKeyColumn>,
}

impl PrimaryKeySchema {
    /// Build a schema, rejecting empty, unnamed, or duplicate columns.
    pub fn new(columns: Vec<PrimaryKeyColumn>) -> Result<Self, SchemaError> {
        if columns.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = BTreeSet::new();
        for (index, column) in columns.iter().enumerate() {
            if column.name.is_empty() {
                return Err(SchemaError::EmptyName { index });
            }
            if !seen.insert(column.name.as_str()) {
                return Err(SchemaError::DuplicateColumn {
                    name: column.name.clone(),
                });
            }
        }

        Ok(Self { columns })
    }

    #[must_use]
    pub fn columns(&self) -> &[PrimaryKeyColumn] {
        &self.columns
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.name == name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

///
/// SchemaState
///

#[derive(Debug)]
enum SchemaState {
    Unresolved,
    Resolved(Arc<PrimaryKeySchema>),
}

///
/// SchemaSlot
///
/// Two-state holder for a table's primary-key schema.
///
/// Resolution runs under the slot lock, so concurrent first use waits on a
/// single fetch instead of racing. Once resolved the schema is reused until
/// a forced re-sync replaces it.
///

#[derive(Debug)]
pub(crate) struct SchemaSlot {
    state: Mutex<SchemaState>,
}

impl SchemaSlot {
    pub(crate) fn unresolved() -> Self {
        Self {
            state: Mutex::new(SchemaState::Unresolved),
        }
    }

    pub(crate) fn resolved(schema: PrimaryKeySchema) -> Self {
        Self {
            state: Mutex::new(SchemaState::Resolved(Arc::new(schema))),
        }
    }

    /// Return the resolved schema, running `fetch` when unresolved or forced.
    pub(crate) async fn resolve<F, Fut>(
        &self,
        force: bool,
        fetch: F,
    ) -> Result<Arc<PrimaryKeySchema>, InternalError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PrimaryKeySchema, InternalError>>,
    {
        let mut state = self.state.lock().await;

        if !force && let SchemaState::Resolved(schema) = &*state {
            return Ok(Arc::clone(schema));
        }

        let schema = Arc::new(fetch().await?);
        *state = SchemaState::Resolved(Arc::clone(&schema));

        Ok(schema)
    }

    /// Peek at the schema without triggering resolution.
    pub(crate) async fn current(&self) -> Option<Arc<PrimaryKeySchema>> {
        match &*self.state.lock().await {
            SchemaState::Resolved(schema) => Some(Arc::clone(schema)),
            SchemaState::Unresolved => None,
        }
    }
}
