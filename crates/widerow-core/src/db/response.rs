//! Module: db::response
//! Responsibility: result payloads returned by multi-row table operations.
//! Does not own: reconciliation logic (see `db::batch`).
//! Boundary: plain data handed back to callers.

use crate::{
    backend::BackendError,
    db::batch::{BatchItemOutcome, BatchRows, outcomes_to_object},
    row::Row,
};

/// Per-key result of a batch read: the row, `None` when absent, or the
/// backend's reason for failing that key.
pub type BatchGetResult = Result<Option<Row>, BackendError>;

///
/// BatchWriteResponse
///
/// Result of a batch write.
/// Keeps every item's outcome in request order; partial failure is data,
/// not an error.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchWriteResponse {
    outcomes: Vec<BatchItemOutcome>,
}

impl BatchWriteResponse {
    #[must_use]
    pub const fn new(outcomes: Vec<BatchItemOutcome>) -> Self {
        Self { outcomes }
    }

    /// Return every outcome in request order.
    #[must_use]
    pub fn outcomes(&self) -> &[BatchItemOutcome] {
        &self.outcomes
    }

    /// Successful rows bucketed by operation label.
    #[must_use]
    pub fn succeeded(&self) -> BatchRows {
        outcomes_to_object(&self.outcomes)
    }

    /// Outcomes the backend rejected.
    pub fn failed(&self) -> impl Iterator<Item = &BatchItemOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_ok())
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    /// Returns `true` when every item succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(BatchItemOutcome::is_ok)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    #[must_use]
    pub fn into_outcomes(self) -> Vec<BatchItemOutcome> {
        self.outcomes
    }
}

impl IntoIterator for BatchWriteResponse {
    type Item = BatchItemOutcome;
    type IntoIter = std::vec::IntoIter<BatchItemOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}

impl<'a> IntoIterator for &'a BatchWriteResponse {
    type Item = &'a BatchItemOutcome;
    type IntoIter = std::slice::Iter<'a, BatchItemOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::batch::BatchOp;

    fn outcome(op: BatchOp, id: i64, ok: bool) -> BatchItemOutcome {
        BatchItemOutcome {
            op,
            row: Row::new().with("id", id),
            result: if ok {
                Ok(())
            } else {
                Err(BackendError::new("OTSConditionCheckFail", "condition"))
            },
        }
    }

    #[test]
    fn views_split_success_from_failure() {
        let response = BatchWriteResponse::new(vec![
            outcome(BatchOp::Insert, 1, true),
            outcome(BatchOp::Insert, 2, false),
            outcome(BatchOp::Delete, 3, true),
        ]);

        assert!(!response.is_complete());
        assert_eq!(response.failure_count(), 1);
        assert_eq!(response.len(), 3);
        assert_eq!(
            response.succeeded().rows(BatchOp::Insert),
            &[Row::new().with("id", 1_i64)]
        );
        assert_eq!(response.succeeded().total(), 2);

        let failed: Vec<_> = response.failed().map(|o| o.row.clone()).collect();
        assert_eq!(failed, vec![Row::new().with("id", 2_i64)]);
    }

    #[test]
    fn empty_response_is_complete() {
        let response = BatchWriteResponse::default();

        assert!(response.is_complete());
        assert!(response.is_empty());
        assert_eq!((&response).into_iter().count(), 0);
    }
}
