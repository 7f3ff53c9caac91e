//! Module: db::batch
//! Responsibility: expand labeled row groups into one ordered batch and map
//! the backend's positional results back onto those rows.
//! Does not own: dispatch or retry; failed items are reported, never resent.
//! Boundary: result order is the request order, matched by position only.

use crate::{
    backend::{
        Attributes, BackendError, BatchWriteRow, ColumnUpdate, RowExistence, RowPayload,
        RowResult, WriteKind,
    },
    db::{
        mapper::{MapperError, params_to_row},
        write::{build_delete, build_insert, build_put, build_update},
    },
    error::InternalError,
    row::Row,
    schema::PrimaryKeySchema,
};
use derive_more::{Deref, Display, IntoIterator};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, str::FromStr};
use thiserror::Error as ThisError;

///
/// BatchError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum BatchError {
    #[error("batch contains no rows")]
    Empty,

    #[error("unknown batch operation '{label}'")]
    UnknownOperation { label: String },

    #[error("backend returned {found} results for {expected} batch items")]
    ResultArityMismatch { expected: usize, found: usize },

    #[error("backend response has no results for table '{table}'")]
    MissingTable { table: String },
}

///
/// BatchOp
///
/// Operation label of a row group. `Insert` resolves to a backend PUT with a
/// must-not-exist condition but keeps its own bucket on the way back.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BatchOp {
    #[display("put")]
    Put,
    #[display("insert")]
    Insert,
    #[display("update")]
    Update,
    #[display("delete")]
    Delete,
}

impl BatchOp {
    pub const ALL: [Self; 4] = [Self::Put, Self::Insert, Self::Update, Self::Delete];

    /// Backend operation kind this label is sent as.
    #[must_use]
    pub const fn write_kind(self) -> WriteKind {
        match self {
            Self::Put | Self::Insert => WriteKind::Put,
            Self::Update => WriteKind::Update,
            Self::Delete => WriteKind::Delete,
        }
    }
}

impl FromStr for BatchOp {
    type Err = BatchError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.to_string().eq_ignore_ascii_case(label.trim()))
            .ok_or_else(|| BatchError::UnknownOperation {
                label: label.to_string(),
            })
    }
}

///
/// BatchRows
///
/// Rows grouped by operation label. Iteration follows label order
/// (put, insert, update, delete), then row order within a group.
///

#[derive(Clone, Debug, Default, Deref, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct BatchRows(BTreeMap<BatchOp, Vec<Row>>);

impl BatchRows {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Group rows under free-form labels, matched case-insensitively.
    /// Repeated labels append to the same group.
    pub fn from_labeled<L: AsRef<str>>(
        groups: impl IntoIterator<Item = (L, Vec<Row>)>,
    ) -> Result<Self, BatchError> {
        let mut rows = Self::new();
        for (label, group) in groups {
            let op = label.as_ref().parse::<BatchOp>()?;
            rows.extend(op, group);
        }

        Ok(rows)
    }

    #[must_use]
    pub fn with(mut self, op: BatchOp, rows: impl IntoIterator<Item = Row>) -> Self {
        self.extend(op, rows);
        self
    }

    pub fn push(&mut self, op: BatchOp, row: Row) {
        self.0.entry(op).or_default().push(row);
    }

    pub fn extend(&mut self, op: BatchOp, rows: impl IntoIterator<Item = Row>) {
        self.0.entry(op).or_default().extend(rows);
    }

    /// Rows recorded under `op`; empty when the label is absent.
    #[must_use]
    pub fn rows(&self, op: BatchOp) -> &[Row] {
        self.0.get(&op).map_or(&[], Vec::as_slice)
    }

    /// Total number of rows across every label.
    #[must_use]
    pub fn total(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

///
/// BatchItem
///
/// One batch row tagged with the label it came from.
///

#[derive(Clone, Debug, PartialEq)]
pub struct BatchItem {
    pub op: BatchOp,
    pub row: BatchWriteRow,
}

///
/// BatchItemOutcome
///
/// Per-item result of a batch write: the row as written plus either success
/// or the backend's reason for rejecting it.
///

#[derive(Clone, Debug, PartialEq)]
pub struct BatchItemOutcome {
    pub op: BatchOp,
    pub row: Row,
    pub result: Result<(), BackendError>,
}

impl BatchItemOutcome {
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Expand grouped rows into one ordered item list.
///
/// Empty groups are skipped; a batch with no rows at all is rejected.
pub fn object_to_batch_items(
    table: &str,
    schema: &PrimaryKeySchema,
    rows: &BatchRows,
) -> Result<Vec<BatchItem>, InternalError> {
    if rows.total() == 0 {
        return Err(BatchError::Empty.into());
    }

    let mut items = Vec::with_capacity(rows.total());
    for (op, group) in rows {
        for row in group {
            let row = match op {
                BatchOp::Put => BatchWriteRow::Put(
                    build_put(table, schema, row, RowExistence::Ignore)?.into_body(),
                ),
                BatchOp::Insert => {
                    BatchWriteRow::Put(build_insert(table, schema, row)?.into_body())
                }
                BatchOp::Update => BatchWriteRow::Update(
                    build_update(table, schema, row, RowExistence::ExpectExist)?.into_body(),
                ),
                BatchOp::Delete => BatchWriteRow::Delete(
                    build_delete(table, schema, row, RowExistence::Ignore)?.into_body(),
                ),
            };
            items.push(BatchItem { op: *op, row });
        }
    }

    Ok(items)
}

/// Pair every item with its positional result.
pub fn reconcile(
    items: Vec<BatchItem>,
    results: Vec<RowResult>,
) -> Result<Vec<BatchItemOutcome>, InternalError> {
    check_arity(items.len(), results.len())?;

    items
        .into_iter()
        .zip(results)
        .map(|(item, result)| {
            let row = item_to_row(&item.row)?;
            let result = if result.is_ok {
                Ok(())
            } else {
                Err(result.error.unwrap_or_else(unreported_failure))
            };

            Ok(BatchItemOutcome {
                op: item.op,
                row,
                result,
            })
        })
        .collect()
}

/// Keep only the rows whose positional result succeeded, bucketed by label.
pub fn batch_items_to_object(
    items: &[BatchItem],
    results: &[RowResult],
) -> Result<BatchRows, InternalError> {
    check_arity(items.len(), results.len())?;

    let mut rows = BatchRows::new();
    for (item, result) in items.iter().zip(results) {
        if result.is_ok {
            rows.push(item.op, item_to_row(&item.row)?);
        }
    }

    Ok(rows)
}

/// Collapse outcomes into the success bucket map.
#[must_use]
pub fn outcomes_to_object(outcomes: &[BatchItemOutcome]) -> BatchRows {
    let mut rows = BatchRows::new();
    for outcome in outcomes.iter().filter(|o| o.is_ok()) {
        rows.push(outcome.op, outcome.row.clone());
    }

    rows
}

/// Stand-in for a failed item the backend did not explain.
pub(crate) fn unreported_failure() -> BackendError {
    BackendError::new("Unknown", "batch item failed without error detail")
}

// Invert the builder transform: key cells and attribute columns back into one row.
fn item_to_row(item: &BatchWriteRow) -> Result<Row, MapperError> {
    let attributes = match item {
        BatchWriteRow::Put(put) => put.attribute_columns.clone(),
        BatchWriteRow::Update(update) => update
            .update_of_attribute_columns
            .iter()
            .flat_map(|op| match op {
                ColumnUpdate::Put(columns) => columns.iter().cloned(),
            })
            .collect(),
        BatchWriteRow::Delete(_) => Attributes::default(),
    };

    let payload = RowPayload {
        primary_key: item.primary_key().clone(),
        attributes,
    };

    Ok(params_to_row(payload)?.unwrap_or_default())
}

const fn check_arity(expected: usize, found: usize) -> Result<(), BatchError> {
    if expected != found {
        return Err(BatchError::ResultArityMismatch { expected, found });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorClass,
        schema::{PrimaryKeyColumn, PrimaryKeyType},
    };
    use proptest::prelude::*;

    fn schema() -> PrimaryKeySchema {
        PrimaryKeySchema::new(vec![PrimaryKeyColumn::new("id", PrimaryKeyType::Integer)])
            .expect("schema should be valid")
    }

    fn row(id: i64) -> Row {
        Row::new().with("id", id).with("qty", id * 2)
    }

    fn failed() -> RowResult {
        RowResult::failed(BackendError::new("OTSConditionCheckFail", "condition"))
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("PUT".parse::<BatchOp>(), Ok(BatchOp::Put));
        assert_eq!(" Insert ".parse::<BatchOp>(), Ok(BatchOp::Insert));
        assert_eq!(
            "upsert".parse::<BatchOp>(),
            Err(BatchError::UnknownOperation {
                label: "upsert".to_string()
            })
        );

        let rows = BatchRows::from_labeled([("Put", vec![row(1)]), ("put", vec![row(2)])])
            .expect("labels should parse");
        assert_eq!(rows.rows(BatchOp::Put).len(), 2);
    }

    #[test]
    fn items_follow_label_then_row_order() {
        let rows = BatchRows::new()
            .with(BatchOp::Delete, [row(9)])
            .with(BatchOp::Insert, [row(3), row(4)])
            .with(BatchOp::Update, [])
            .with(BatchOp::Put, [row(1)]);

        let items = object_to_batch_items("stock", &schema(), &rows).expect("items");
        let tags: Vec<(BatchOp, WriteKind)> =
            items.iter().map(|i| (i.op, i.row.kind())).collect();
        assert!(items.iter().all(|i| i.op.write_kind() == i.row.kind()));

        assert_eq!(
            tags,
            vec![
                (BatchOp::Put, WriteKind::Put),
                (BatchOp::Insert, WriteKind::Put),
                (BatchOp::Insert, WriteKind::Put),
                (BatchOp::Delete, WriteKind::Delete),
            ]
        );
        assert_eq!(
            items[1].row.condition().row_existence,
            RowExistence::ExpectNotExist
        );
        assert_eq!(items[0].row.condition().row_existence, RowExistence::Ignore);
    }

    #[test]
    fn empty_batch_is_rejected() {
        let rows = BatchRows::new().with(BatchOp::Put, []);
        let err = object_to_batch_items("stock", &schema(), &rows).expect_err("empty batch");

        assert_eq!(err.class, ErrorClass::InvalidArgument);
    }

    #[test]
    fn failed_items_are_dropped_from_buckets() {
        let rows = BatchRows::new()
            .with(BatchOp::Put, [row(1), row(2)])
            .with(BatchOp::Delete, [row(3)]);
        let items = object_to_batch_items("stock", &schema(), &rows).expect("items");

        let buckets = batch_items_to_object(&items, &[RowResult::ok(), failed(), RowResult::ok()])
            .expect("reconcile");

        assert_eq!(buckets.rows(BatchOp::Put), &[row(1)]);
        assert_eq!(buckets.rows(BatchOp::Delete), &[Row::new().with("id", 3_i64)]);
        assert_eq!(buckets.total(), 2);
    }

    #[test]
    fn outcomes_keep_backend_reason_per_item() {
        let rows = BatchRows::new().with(BatchOp::Update, [row(1), row(2)]);
        let items = object_to_batch_items("stock", &schema(), &rows).expect("items");

        let outcomes = reconcile(items, vec![failed(), RowResult::ok()]).expect("outcomes");

        assert_eq!(outcomes[0].row, row(1));
        assert_eq!(
            outcomes[0].result.as_ref().map_err(|e| e.code.as_str()),
            Err("OTSConditionCheckFail")
        );
        assert!(outcomes[1].is_ok());
        assert_eq!(outcomes_to_object(&outcomes).rows(BatchOp::Update), &[row(2)]);
    }

    #[test]
    fn result_arity_mismatch_is_an_invariant_violation() {
        let rows = BatchRows::new().with(BatchOp::Put, [row(1)]);
        let items = object_to_batch_items("stock", &schema(), &rows).expect("items");

        let err = batch_items_to_object(&items, &[]).expect_err("arity mismatch");
        assert_eq!(err.class, ErrorClass::InvariantViolation);
    }

    proptest! {
        #[test]
        fn bucket_totals_match_success_positions(
            ops in proptest::collection::vec(0usize..4, 1..24),
            successes in proptest::collection::vec(any::<bool>(), 24),
        ) {
            let mut rows = BatchRows::new();
            for (id, op) in ops.iter().enumerate() {
                let id = i64::try_from(id).expect("small index");
                rows.push(BatchOp::ALL[*op], row(id));
            }

            let items = object_to_batch_items("stock", &schema(), &rows).expect("items");
            let results: Vec<RowResult> = successes[..items.len()]
                .iter()
                .map(|ok| if *ok { RowResult::ok() } else { failed() })
                .collect();
            let expected = successes[..items.len()].iter().filter(|ok| **ok).count();

            let buckets = batch_items_to_object(&items, &results).expect("reconcile");
            prop_assert_eq!(buckets.total(), expected);

            for (item, ok) in items.iter().zip(&successes) {
                if *ok {
                    let written = item_to_row(&item.row).expect("row should invert");
                    prop_assert!(buckets.rows(item.op).contains(&written));
                }
            }
        }
    }
}
