//! Module: backend::memory
//! Responsibility: in-process ordered implementation of the backend contract.
//! Does not own: durability or any notion of time/versions.
//! Boundary: used by this crate's tests and by downstream test suites.

use crate::{
    backend::{
        Backend, BackendError, BatchGetItem, BatchGetRowRequest, BatchGetRowResponse,
        BatchWriteRow, BatchWriteRowRequest, BatchWriteRowResponse, ColumnUpdate, Condition,
        DeleteRowRequest, DescribeTableRequest, DescribeTableResponse, Direction, GetRangeRequest,
        GetRangeResponse, GetRowRequest, GetRowResponse, PrimaryKey, PutRowRequest, RowExistence,
        RowPayload, RowResult, TableMeta, UpdateRowRequest, WriteRowResponse,
    },
    schema::{PrimaryKeyColumn, PrimaryKeyType},
    value::{KeyValue, Value},
};
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, BTreeSet},
    ops::Bound,
    sync::{Mutex, MutexGuard},
};

///
/// CONSTANTS
///

/// Row cap applied to a range scan that does not set a limit.
const DEFAULT_RANGE_ROW_CAP: u32 = 5000;

const CODE_NOT_EXIST: &str = "OTSObjectNotExist";
const CODE_PARAMETER_INVALID: &str = "OTSParameterInvalid";
const CODE_CONDITION_FAILED: &str = "OTSConditionCheckFail";
const CODE_INJECTED: &str = "InjectedFailure";

///
/// BackendCall
///
/// Journal entry for one backend call, holding the request verbatim.
///

#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    DescribeTable(DescribeTableRequest),
    PutRow(PutRowRequest),
    UpdateRow(UpdateRowRequest),
    DeleteRow(DeleteRowRequest),
    GetRow(GetRowRequest),
    BatchGetRow(BatchGetRowRequest),
    BatchWriteRow(BatchWriteRowRequest),
    GetRange(GetRangeRequest),
}

///
/// StoredRow
///

#[derive(Clone, Debug)]
struct StoredRow {
    primary_key: PrimaryKey,
    attributes: BTreeMap<String, Value>,
}

impl StoredRow {
    fn payload(&self, filter: impl Fn(&str) -> bool) -> RowPayload {
        RowPayload {
            primary_key: self.primary_key.clone(),
            attributes: self
                .attributes
                .iter()
                .filter(|(name, _)| filter(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }
}

///
/// MemoryTable
///

#[derive(Debug)]
struct MemoryTable {
    schema: Vec<PrimaryKeyColumn>,
    rows: BTreeMap<Vec<KeyValue>, StoredRow>,
}

impl MemoryTable {
    // Validate a concrete key against the table schema and return its sort cells.
    fn key_cells(&self, key: &PrimaryKey) -> Result<Vec<KeyValue>, BackendError> {
        if key.len() != self.schema.len() {
            return Err(parameter_invalid(format!(
                "primary key has {} columns, table declares {}",
                key.len(),
                self.schema.len()
            )));
        }

        let mut cells = Vec::with_capacity(key.len());
        for ((name, value), column) in key.iter().zip(&self.schema) {
            if *name != column.name {
                return Err(parameter_invalid(format!(
                    "primary key column '{name}' does not match '{}'",
                    column.name
                )));
            }
            let type_ok = matches!(
                (column.ty, value),
                (PrimaryKeyType::String, KeyValue::Text(_))
                    | (PrimaryKeyType::Integer, KeyValue::Int(_))
                    | (PrimaryKeyType::Binary, KeyValue::Blob(_))
            );
            if !type_ok {
                return Err(parameter_invalid(format!(
                    "primary key column '{name}' holds {value}, expected {}",
                    column.ty
                )));
            }
            cells.push(value.clone());
        }

        Ok(cells)
    }

    // Range bounds may carry sentinels but must still name every column in order.
    fn bound_cells(&self, key: &PrimaryKey) -> Result<Vec<KeyValue>, BackendError> {
        let names_match = key.len() == self.schema.len()
            && key
                .iter()
                .zip(&self.schema)
                .all(|((name, _), column)| *name == column.name);
        if !names_match {
            return Err(parameter_invalid(
                "range bound must name every primary key column in schema order",
            ));
        }

        Ok(key.cells())
    }

    fn check_condition(&self, cells: &[KeyValue], condition: Condition) -> Result<(), BackendError> {
        let exists = self.rows.contains_key(cells);
        let failed = match condition.row_existence {
            RowExistence::Ignore => false,
            RowExistence::ExpectExist => !exists,
            RowExistence::ExpectNotExist => exists,
        };

        if failed {
            return Err(BackendError::new(
                CODE_CONDITION_FAILED,
                "Condition check failed.",
            ));
        }

        Ok(())
    }

    fn apply(&mut self, row: BatchWriteRow) -> Result<(), BackendError> {
        let cells = self.key_cells(row.primary_key())?;
        self.check_condition(&cells, row.condition())?;

        match row {
            BatchWriteRow::Put(put) => {
                self.rows.insert(
                    cells,
                    StoredRow {
                        primary_key: put.primary_key,
                        attributes: put.attribute_columns.into_iter().collect(),
                    },
                );
            }
            BatchWriteRow::Update(update) => {
                let stored = self.rows.entry(cells).or_insert_with(|| StoredRow {
                    primary_key: update.primary_key,
                    attributes: BTreeMap::new(),
                });
                for op in update.update_of_attribute_columns {
                    match op {
                        ColumnUpdate::Put(columns) => stored.attributes.extend(columns),
                    }
                }
            }
            BatchWriteRow::Delete(_) => {
                self.rows.remove(&cells);
            }
        }

        Ok(())
    }
}

///
/// MemoryState
///

#[derive(Debug, Default)]
struct MemoryState {
    tables: BTreeMap<String, MemoryTable>,
    calls: Vec<BackendCall>,
    max_rows_per_response: Option<u32>,
    omit_empty_window_rows: bool,
    fail_next_call: Option<BackendError>,
    fail_batch_positions: BTreeSet<usize>,
}

impl MemoryState {
    fn table(&self, name: &str) -> Result<&MemoryTable, BackendError> {
        self.tables.get(name).ok_or_else(|| missing_table(name))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut MemoryTable, BackendError> {
        self.tables.get_mut(name).ok_or_else(|| missing_table(name))
    }

    // Journal the call and surface any injected whole-call failure.
    fn begin(&mut self, call: BackendCall) -> Result<(), BackendError> {
        self.calls.push(call);

        match self.fail_next_call.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

///
/// MemoryBackend
///
/// Ordered in-memory store implementing [`Backend`].
///
/// Honors existence conditions, range limits, continuation keys, column
/// projections, and an optional per-response row cap that mimics backend
/// response truncation. Every call is journaled for inspection.
///

#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table with its primary-key columns.
    #[must_use]
    pub fn with_table(self, name: impl Into<String>, schema: Vec<PrimaryKeyColumn>) -> Self {
        self.lock().tables.insert(
            name.into(),
            MemoryTable {
                schema,
                rows: BTreeMap::new(),
            },
        );
        self
    }

    /// Cap the number of rows any single range response returns.
    #[must_use]
    pub fn with_max_rows_per_response(self, max_rows: u32) -> Self {
        self.lock().max_rows_per_response = Some(max_rows);
        self
    }

    /// Leave out range rows that keep no columns once a column window is
    /// applied. The continuation key still accounts for them.
    #[must_use]
    pub fn with_empty_window_rows_omitted(self) -> Self {
        self.lock().omit_empty_window_rows = true;
        self
    }

    /// Fail the next backend call, whatever it is, with `err`.
    pub fn fail_next_call(&self, err: BackendError) {
        self.lock().fail_next_call = Some(err);
    }

    /// Fail the items at `positions` in the next batch write.
    pub fn fail_batch_positions(&self, positions: impl IntoIterator<Item = usize>) {
        self.lock().fail_batch_positions = positions.into_iter().collect();
    }

    /// Snapshot of every call issued so far.
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    /// Range requests issued so far, in order.
    #[must_use]
    pub fn range_calls(&self) -> Vec<GetRangeRequest> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::GetRange(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of rows currently stored in `table` (0 when unknown).
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.lock().tables.get(table).map_or(0, |t| t.rows.len())
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // Poisoning is ignored: no call leaves the state half-written.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn describe_table(
        &self,
        request: DescribeTableRequest,
    ) -> Result<DescribeTableResponse, BackendError> {
        let mut state = self.lock();
        state.begin(BackendCall::DescribeTable(request.clone()))?;
        let table = state.table(&request.table_name)?;

        Ok(DescribeTableResponse {
            table_meta: TableMeta {
                table_name: request.table_name,
                primary_key: table.schema.clone(),
            },
        })
    }

    async fn put_row(&self, request: PutRowRequest) -> Result<WriteRowResponse, BackendError> {
        let mut state = self.lock();
        state.begin(BackendCall::PutRow(request.clone()))?;
        state
            .table_mut(&request.table_name)?
            .apply(BatchWriteRow::Put(request.body))?;

        Ok(WriteRowResponse::default())
    }

    async fn update_row(
        &self,
        request: UpdateRowRequest,
    ) -> Result<WriteRowResponse, BackendError> {
        let mut state = self.lock();
        state.begin(BackendCall::UpdateRow(request.clone()))?;
        state
            .table_mut(&request.table_name)?
            .apply(BatchWriteRow::Update(request.body))?;

        Ok(WriteRowResponse::default())
    }

    async fn delete_row(
        &self,
        request: DeleteRowRequest,
    ) -> Result<WriteRowResponse, BackendError> {
        let mut state = self.lock();
        state.begin(BackendCall::DeleteRow(request.clone()))?;
        state
            .table_mut(&request.table_name)?
            .apply(BatchWriteRow::Delete(request.body))?;

        Ok(WriteRowResponse::default())
    }

    async fn get_row(&self, request: GetRowRequest) -> Result<GetRowResponse, BackendError> {
        let mut state = self.lock();
        state.begin(BackendCall::GetRow(request.clone()))?;
        let table = state.table(&request.table_name)?;
        let cells = table.key_cells(&request.body.primary_key)?;
        let columns = &request.body.columns_to_get;

        let row = table
            .rows
            .get(&cells)
            .map(|stored| stored.payload(|name| projected(columns, name)))
            .unwrap_or_default();

        Ok(GetRowResponse { row })
    }

    async fn batch_get_row(
        &self,
        request: BatchGetRowRequest,
    ) -> Result<BatchGetRowResponse, BackendError> {
        let mut state = self.lock();
        state.begin(BackendCall::BatchGetRow(request.clone()))?;

        let mut tables = Vec::with_capacity(request.tables.len());
        for batch in &request.tables {
            let table = state.table(&batch.table_name)?;
            let items = batch
                .primary_key
                .iter()
                .map(|key| match table.key_cells(key) {
                    Ok(cells) => BatchGetItem {
                        is_ok: true,
                        error: None,
                        row: table
                            .rows
                            .get(&cells)
                            .map(|stored| {
                                stored.payload(|name| projected(&batch.columns_to_get, name))
                            })
                            .unwrap_or_default(),
                    },
                    Err(err) => BatchGetItem {
                        is_ok: false,
                        error: Some(err),
                        row: RowPayload::default(),
                    },
                })
                .collect();
            tables.push(items);
        }

        Ok(BatchGetRowResponse { tables })
    }

    async fn batch_write_row(
        &self,
        request: BatchWriteRowRequest,
    ) -> Result<BatchWriteRowResponse, BackendError> {
        let mut state = self.lock();
        state.begin(BackendCall::BatchWriteRow(request.clone()))?;
        let injected = std::mem::take(&mut state.fail_batch_positions);

        let mut response = BatchWriteRowResponse::default();
        for batch in request.tables {
            let table = state.table_mut(&batch.table_name)?;
            let results = batch
                .rows
                .into_iter()
                .enumerate()
                .map(|(position, row)| {
                    if injected.contains(&position) {
                        return RowResult::failed(BackendError::new(
                            CODE_INJECTED,
                            format!("injected failure at position {position}"),
                        ));
                    }
                    match table.apply(row) {
                        Ok(()) => RowResult::ok(),
                        Err(err) => RowResult::failed(err),
                    }
                })
                .collect();
            response.tables.insert(batch.table_name, results);
        }

        Ok(response)
    }

    async fn get_range(&self, request: GetRangeRequest) -> Result<GetRangeResponse, BackendError> {
        let mut state = self.lock();
        state.begin(BackendCall::GetRange(request.clone()))?;
        let row_cap = state.max_rows_per_response;
        let omit_empty = state.omit_empty_window_rows
            && (request.start_column.is_some() || request.end_column.is_some());
        let table = state.table(&request.table_name)?;

        if request.direction != Direction::Forward {
            return Err(parameter_invalid("only forward range scans are supported"));
        }

        let start = table.bound_cells(&request.inclusive_start_primary_key)?;
        let end = table.bound_cells(&request.exclusive_end_primary_key)?;
        if start >= end {
            return Ok(GetRangeResponse::default());
        }

        let mut limit = request.limit.unwrap_or(DEFAULT_RANGE_ROW_CAP);
        if let Some(cap) = row_cap {
            limit = limit.min(cap);
        }
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        let mut in_range = table
            .rows
            .range::<Vec<KeyValue>, _>((Bound::Included(&start), Bound::Excluded(&end)));
        let rows = in_range
            .by_ref()
            .take(limit)
            .map(|(_, stored)| {
                stored.payload(|name| {
                    projected(&request.columns_to_get, name)
                        && in_column_window(
                            request.start_column.as_deref(),
                            request.end_column.as_deref(),
                            name,
                        )
                })
            })
            .filter(|payload| !(omit_empty && payload.attributes.is_empty()))
            .collect();
        let next_start_primary_key = in_range.next().map(|(_, stored)| stored.primary_key.clone());

        Ok(GetRangeResponse {
            rows,
            next_start_primary_key,
        })
    }
}

fn projected(columns: &[String], name: &str) -> bool {
    columns.is_empty() || columns.iter().any(|c| c == name)
}

fn in_column_window(start: Option<&str>, end: Option<&str>, name: &str) -> bool {
    start.is_none_or(|start| name >= start) && end.is_none_or(|end| name < end)
}

fn missing_table(name: &str) -> BackendError {
    BackendError::new(CODE_NOT_EXIST, format!("Requested table '{name}' does not exist."))
}

fn parameter_invalid(message: impl Into<String>) -> BackendError {
    BackendError::new(CODE_PARAMETER_INVALID, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Attributes, PutRow, TableRequest};

    fn backend() -> MemoryBackend {
        MemoryBackend::new().with_table(
            "events",
            vec![PrimaryKeyColumn::new("id", PrimaryKeyType::Integer)],
        )
    }

    fn key(id: i64) -> PrimaryKey {
        PrimaryKey::new(vec![("id".to_string(), KeyValue::Int(id))])
    }

    fn put(id: i64, existence: RowExistence) -> PutRowRequest {
        TableRequest::new(
            "events",
            PutRow {
                condition: Condition::new(existence),
                primary_key: key(id),
                attribute_columns: Attributes::new(vec![(
                    "payload".to_string(),
                    Value::Int(id * 10),
                )]),
            },
        )
    }

    #[tokio::test]
    async fn put_honors_expect_not_exist() {
        let backend = backend();
        backend
            .put_row(put(1, RowExistence::ExpectNotExist))
            .await
            .expect("first insert");
        let err = backend
            .put_row(put(1, RowExistence::ExpectNotExist))
            .await
            .expect_err("second insert must fail the condition");

        assert_eq!(err.code, CODE_CONDITION_FAILED);
        assert_eq!(backend.row_count("events"), 1);
    }

    #[tokio::test]
    async fn range_caps_rows_and_reports_next_key() {
        let backend = backend().with_max_rows_per_response(2);
        for id in 0..5 {
            backend
                .put_row(put(id, RowExistence::Ignore))
                .await
                .expect("seed row");
        }

        let response = backend
            .get_range(GetRangeRequest {
                table_name: "events".to_string(),
                direction: Direction::Forward,
                inclusive_start_primary_key: PrimaryKey::new(vec![(
                    "id".to_string(),
                    KeyValue::InfMin,
                )]),
                exclusive_end_primary_key: PrimaryKey::new(vec![(
                    "id".to_string(),
                    KeyValue::InfMax,
                )]),
                limit: Some(10),
                columns_to_get: vec![],
                start_column: Some("_".to_string()),
                end_column: Some("__".to_string()),
                max_versions: 1,
            })
            .await
            .expect("range scan");

        assert_eq!(response.rows.len(), 2);
        assert!(response.rows.iter().all(|row| row.attributes.is_empty()));
        assert_eq!(response.next_start_primary_key, Some(key(2)));
    }

    #[tokio::test]
    async fn omitted_window_rows_still_advance_the_next_key() {
        let backend = backend().with_empty_window_rows_omitted();
        for id in 0..5 {
            backend
                .put_row(put(id, RowExistence::Ignore))
                .await
                .expect("seed row");
        }
        let bound = |cell| PrimaryKey::new(vec![("id".to_string(), cell)]);
        let mut request = GetRangeRequest {
            table_name: "events".to_string(),
            direction: Direction::Forward,
            inclusive_start_primary_key: bound(KeyValue::InfMin),
            exclusive_end_primary_key: bound(KeyValue::InfMax),
            limit: Some(3),
            columns_to_get: vec![],
            start_column: Some("_".to_string()),
            end_column: Some("__".to_string()),
            max_versions: 1,
        };

        let skipped = backend
            .get_range(request.clone())
            .await
            .expect("window scan");
        assert!(skipped.rows.is_empty());
        assert_eq!(skipped.next_start_primary_key, Some(key(3)));

        request.start_column = None;
        request.end_column = None;
        let full = backend.get_range(request).await.expect("plain scan");
        assert_eq!(full.rows.len(), 3);
    }

    #[tokio::test]
    async fn injected_call_failure_is_returned_once() {
        let backend = backend();
        backend.fail_next_call(BackendError::new("OTSServerBusy", "busy"));

        let err = backend
            .put_row(put(1, RowExistence::Ignore))
            .await
            .expect_err("injected failure");
        assert_eq!(err.code, "OTSServerBusy");

        backend
            .put_row(put(1, RowExistence::Ignore))
            .await
            .expect("next call succeeds");
        assert_eq!(backend.calls().len(), 2);
    }

    #[tokio::test]
    async fn unknown_table_is_a_backend_error() {
        let err = backend()
            .describe_table(DescribeTableRequest {
                table_name: "missing".to_string(),
            })
            .await
            .expect_err("unknown table");

        assert_eq!(err.code, CODE_NOT_EXIST);
    }
}
