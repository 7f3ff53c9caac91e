mod table;

// re-exports
pub use table::Table;
pub use widerow_core::db::{
    BatchGetResult, BatchItemOutcome, BatchOp, BatchRows, BatchWriteResponse, SelectQuery,
};
