//! Module: db::range
//! Responsibility: forward range scans and the exhaustive range collector.
//! Does not own: page-number emulation (see `db::select`) or schema resolution.
//! Boundary: scans are strictly sequential; each continuation key becomes a
//! fresh cursor and caller rows are never touched.

use crate::{
    backend::{Backend, Direction, GetRangeRequest, GetRangeResponse, PrimaryKey},
    config::DEFAULT_MAX_VERSIONS,
    db::mapper::{MapperError, payloads_to_rows, row_to_primary_key},
    error::{ErrorOrigin, InternalError},
    row::Row,
    schema::PrimaryKeySchema,
    value::KeyValue,
};
use tracing::debug;

///
/// RangeScan
///
/// Fixed parameters of one logical scan: table, key bounds, projection.
/// Individual backend requests are cut from it with a cursor and a limit.
///

#[derive(Clone, Debug, PartialEq)]
pub struct RangeScan {
    pub table_name: String,
    pub start: PrimaryKey,
    pub end: PrimaryKey,
    pub columns: Vec<String>,
    pub max_versions: u32,
}

impl RangeScan {
    /// Bound a scan by two rows.
    ///
    /// Key columns missing from `start` become `InfMin` and key columns
    /// missing from `end` become `InfMax`, so an empty row leaves that side
    /// of the range open.
    pub fn between(
        table_name: impl Into<String>,
        schema: &PrimaryKeySchema,
        start: &Row,
        end: &Row,
    ) -> Result<Self, MapperError> {
        Ok(Self {
            table_name: table_name.into(),
            start: row_to_primary_key(schema, start, Some(&KeyValue::InfMin))?,
            end: row_to_primary_key(schema, end, Some(&KeyValue::InfMax))?,
            columns: Vec::new(),
            max_versions: DEFAULT_MAX_VERSIONS,
        })
    }

    #[must_use]
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    #[must_use]
    pub const fn with_max_versions(mut self, max_versions: u32) -> Self {
        self.max_versions = max_versions;
        self
    }

    /// Forward request from `cursor` (inclusive) to the scan end (exclusive).
    #[must_use]
    pub fn request(&self, cursor: PrimaryKey, limit: u32) -> GetRangeRequest {
        GetRangeRequest {
            table_name: self.table_name.clone(),
            direction: Direction::Forward,
            inclusive_start_primary_key: cursor,
            exclusive_end_primary_key: self.end.clone(),
            limit: Some(limit),
            columns_to_get: self.columns.clone(),
            start_column: None,
            end_column: None,
            max_versions: self.max_versions,
        }
    }
}

///
/// ScanStats
///
/// Traffic generated by one logical scan.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ScanStats {
    pub requests: u64,
    pub rows_scanned: u64,
}

impl ScanStats {
    pub(crate) fn record(&mut self, response: &GetRangeResponse) {
        self.requests = self.requests.saturating_add(1);
        self.rows_scanned = self
            .rows_scanned
            .saturating_add(u64::try_from(response.rows.len()).unwrap_or(u64::MAX));
    }
}

/// Issue one range request, logging and counting it.
pub(crate) async fn fetch_page<B: Backend + ?Sized>(
    backend: &B,
    request: GetRangeRequest,
    stats: &mut ScanStats,
) -> Result<GetRangeResponse, InternalError> {
    debug!(
        table = %request.table_name,
        limit = ?request.limit,
        request = stats.requests.saturating_add(1),
        "get_range"
    );

    let response = backend.get_range(request).await?;
    stats.record(&response);

    Ok(response)
}

/// Collect every row in the scan range, `page_size` rows per request.
///
/// Follows continuation keys until the backend stops returning one. Each
/// response is mapped as it arrives; the result is in key order.
pub async fn collect_range<B: Backend + ?Sized>(
    backend: &B,
    scan: &RangeScan,
    page_size: u32,
    stats: &mut ScanStats,
) -> Result<Vec<Row>, InternalError> {
    if page_size == 0 {
        return Err(InternalError::invalid_argument(
            ErrorOrigin::Range,
            "range page size must be greater than zero",
        ));
    }

    let mut rows = Vec::new();
    let mut cursor = scan.start.clone();

    loop {
        let response = fetch_page(backend, scan.request(cursor.clone(), page_size), stats).await?;
        let fetched = response.rows.len();
        rows.extend(payloads_to_rows(response.rows)?);

        match response.next_start_primary_key {
            Some(next) => {
                ensure_progress(&cursor, &next, fetched, ErrorOrigin::Range)?;
                cursor = next;
            }
            None => break,
        }
    }

    Ok(rows)
}

// A continuation that neither moves nor returns rows would loop forever.
pub(crate) fn ensure_progress(
    cursor: &PrimaryKey,
    next: &PrimaryKey,
    fetched: usize,
    origin: ErrorOrigin,
) -> Result<(), InternalError> {
    if fetched == 0 && cursor == next {
        return Err(InternalError::invariant(
            origin,
            "backend returned an empty page with an unchanged continuation key",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{
            BackendError, BatchGetRowRequest, BatchGetRowResponse, BatchWriteRowRequest,
            BatchWriteRowResponse, DeleteRowRequest, DescribeTableRequest, DescribeTableResponse,
            GetRowRequest, GetRowResponse, MemoryBackend, PutRowRequest, RowExistence,
            UpdateRowRequest, WriteRowResponse,
        },
        db::write::build_put,
        error::ErrorClass,
        schema::{PrimaryKeyColumn, PrimaryKeyType},
        value::Value,
    };
    use async_trait::async_trait;

    fn columns() -> Vec<PrimaryKeyColumn> {
        vec![
            PrimaryKeyColumn::new("shard", PrimaryKeyType::String),
            PrimaryKeyColumn::new("seq", PrimaryKeyType::Integer),
        ]
    }

    fn schema() -> PrimaryKeySchema {
        PrimaryKeySchema::new(columns()).expect("schema should be valid")
    }

    async fn seeded(count: i64) -> MemoryBackend {
        let backend = MemoryBackend::new().with_table("log", columns());
        for seq in 0..count {
            let row = Row::new()
                .with("shard", "a")
                .with("seq", seq)
                .with("payload", format!("entry-{seq}"));
            let request = build_put("log", &schema(), &row, RowExistence::Ignore)
                .expect("put request");
            backend.put_row(request).await.expect("seed row");
        }
        backend.clear_calls();
        backend
    }

    #[test]
    fn open_bounds_fill_missing_columns_with_sentinels() {
        let scan = RangeScan::between("log", &schema(), &Row::new().with("shard", "a"), &Row::new())
            .expect("scan");

        assert_eq!(
            scan.start.cells(),
            vec![KeyValue::Text("a".to_string()), KeyValue::InfMin]
        );
        assert_eq!(scan.end.cells(), vec![KeyValue::InfMax, KeyValue::InfMax]);
    }

    #[tokio::test]
    async fn collector_follows_continuations_until_exhausted() {
        let backend = seeded(250).await;
        let scan = RangeScan::between("log", &schema(), &Row::new(), &Row::new()).expect("scan");
        let mut stats = ScanStats::default();

        let rows = collect_range(&backend, &scan, 100, &mut stats)
            .await
            .expect("range");

        assert_eq!(rows.len(), 250);
        assert_eq!(stats.requests, 3);
        assert_eq!(stats.rows_scanned, 250);
        assert_eq!(rows[0].get("seq"), Some(&Value::Int(0)));
        assert_eq!(rows[249].get("seq"), Some(&Value::Int(249)));

        let starts: Vec<_> = backend
            .range_calls()
            .into_iter()
            .map(|request| request.inclusive_start_primary_key.cells()[1].clone())
            .collect();
        assert_eq!(
            starts,
            vec![KeyValue::InfMin, KeyValue::Int(100), KeyValue::Int(200)]
        );
    }

    #[tokio::test]
    async fn end_bound_is_exclusive() {
        let backend = seeded(10).await;
        let scan = RangeScan::between(
            "log",
            &schema(),
            &Row::new().with("shard", "a").with("seq", 2_i64),
            &Row::new().with("shard", "a").with("seq", 5_i64),
        )
        .expect("scan");
        let mut stats = ScanStats::default();

        let rows = collect_range(&backend, &scan, 100, &mut stats)
            .await
            .expect("range");
        let seqs: Vec<_> = rows.iter().filter_map(|r| r.get("seq")?.as_int()).collect();

        assert_eq!(seqs, vec![2, 3, 4]);
        assert_eq!(stats.requests, 1);
    }

    #[tokio::test]
    async fn truncated_responses_are_followed_too() {
        let backend = seeded(7).await.with_max_rows_per_response(3);
        let scan = RangeScan::between("log", &schema(), &Row::new(), &Row::new()).expect("scan");
        let mut stats = ScanStats::default();

        let rows = collect_range(&backend, &scan, 100, &mut stats)
            .await
            .expect("range");

        assert_eq!(rows.len(), 7);
        assert_eq!(stats.requests, 3);
    }

    ///
    /// StuckBackend
    /// Always returns an empty page pointing back at the request start.
    ///

    struct StuckBackend;

    #[async_trait]
    impl Backend for StuckBackend {
        async fn describe_table(
            &self,
            _: DescribeTableRequest,
        ) -> Result<DescribeTableResponse, BackendError> {
            Err(BackendError::new("Unsupported", "describe"))
        }

        async fn put_row(
            &self,
            _: PutRowRequest,
        ) -> Result<WriteRowResponse, BackendError> {
            Err(BackendError::new("Unsupported", "put"))
        }

        async fn update_row(
            &self,
            _: UpdateRowRequest,
        ) -> Result<WriteRowResponse, BackendError> {
            Err(BackendError::new("Unsupported", "update"))
        }

        async fn delete_row(
            &self,
            _: DeleteRowRequest,
        ) -> Result<WriteRowResponse, BackendError> {
            Err(BackendError::new("Unsupported", "delete"))
        }

        async fn get_row(
            &self,
            _: GetRowRequest,
        ) -> Result<GetRowResponse, BackendError> {
            Err(BackendError::new("Unsupported", "get"))
        }

        async fn batch_get_row(
            &self,
            _: BatchGetRowRequest,
        ) -> Result<BatchGetRowResponse, BackendError> {
            Err(BackendError::new("Unsupported", "batch get"))
        }

        async fn batch_write_row(
            &self,
            _: BatchWriteRowRequest,
        ) -> Result<BatchWriteRowResponse, BackendError> {
            Err(BackendError::new("Unsupported", "batch write"))
        }

        async fn get_range(
            &self,
            request: GetRangeRequest,
        ) -> Result<GetRangeResponse, BackendError> {
            Ok(GetRangeResponse {
                rows: Vec::new(),
                next_start_primary_key: Some(request.inclusive_start_primary_key),
            })
        }
    }

    #[tokio::test]
    async fn stalled_continuation_is_an_invariant_violation() {
        let scan = RangeScan::between("log", &schema(), &Row::new(), &Row::new()).expect("scan");
        let mut stats = ScanStats::default();

        let err = collect_range(&StuckBackend, &scan, 10, &mut stats)
            .await
            .expect_err("stalled scan");

        assert_eq!(err.class, ErrorClass::InvariantViolation);
        assert_eq!(stats.requests, 1);
    }
}
