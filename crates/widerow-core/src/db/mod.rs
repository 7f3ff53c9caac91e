//! Row-level data access on top of a [`Backend`](crate::backend::Backend).
//!
//! Pure translation lives in `mapper`, `write`, and `batch`; the async scan
//! loops live in `range` and `select`; `table` ties them to one backend table.

pub mod batch;
pub mod mapper;
pub mod range;
pub mod response;
pub mod select;
pub mod table;
pub mod write;

// re-exports
pub use batch::{BatchError, BatchItem, BatchItemOutcome, BatchOp, BatchRows};
pub use mapper::MapperError;
pub use range::{RangeScan, ScanStats};
pub use response::{BatchGetResult, BatchWriteResponse};
pub use select::SelectQuery;
pub use table::Table;
