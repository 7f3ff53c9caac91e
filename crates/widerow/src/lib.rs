//! ## Crate layout
//! - `core`: values, rows, schema, backend contract, translation, and scans.
//! - `config`: TOML loading for table configuration.
//! - `db`: the public `Table` facade and its request/response vocabulary.
//! - `error`: the stable public error taxonomy.
//!
//! The `prelude` module carries the vocabulary most callers need.

pub use widerow_core as core;

pub mod config;
pub mod db;
pub mod error;

/// re-exports
///
/// downstream `Backend` implementations need the same `async_trait` the
/// trait was declared with
pub mod __reexports {
    pub use async_trait;
}

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::Error;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        config::TableConfig,
        core::{
            backend::{Backend, MemoryBackend, RowExistence},
            row::Row,
            schema::{PrimaryKeyColumn, PrimaryKeySchema, PrimaryKeyType},
            value::{KeyValue, Value},
        },
        db::{BatchOp, BatchRows, SelectQuery, Table},
        error::{Error, ErrorKind},
    };
}
