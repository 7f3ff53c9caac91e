//! Core runtime for widerow: rows and values, the primary-key schema, the
//! backend contract, row/request translation, pagination, and the table
//! facade, plus the observability hooks they report into.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod obs;
pub mod row;
pub mod schema;
pub mod value;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, backends, or request builders are re-exported here.
///

pub mod prelude {
    pub use crate::{
        backend::RowExistence,
        config::TableConfig,
        db::{BatchOp, BatchRows, SelectQuery, Table},
        row::Row,
        schema::{PrimaryKeyColumn, PrimaryKeySchema, PrimaryKeyType},
        value::{KeyValue, Value},
    };
}
