//! Module: db::table
//! Responsibility: table-scoped facade over one backend client.
//! Does not own: request shapes (builders), reconciliation (batch), or scan
//! loops (range/select); it sequences them and owns the schema slot.
//! Boundary: every operation resolves the schema first and validates input
//! before the first data call.


use crate::{
    backend::{
        Backend, BatchGetRowRequest, BatchGetTable, BatchWriteRowRequest, BatchWriteTable,
        DescribeTableRequest, RowExistence,
    },
    config::TableConfig,
    db::{
        batch::{BatchError, BatchRows, object_to_batch_items, reconcile, unreported_failure},
        mapper::{MapperError, params_to_row, row_to_full_primary_key},
        range::{RangeScan, ScanStats, collect_range},
        response::{BatchGetResult, BatchWriteResponse},
        select::{SelectQuery, select_page},
        write::{build_delete, build_get, build_insert, build_put, build_update},
    },
    error::{ErrorOrigin, InternalError},
    obs::sink::{ExecKind, MetricsEvent, MetricsSink, Span, record},
    row::Row,
    schema::{PrimaryKeySchema, SchemaSlot},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

///
/// Table
///
/// Handle on one backend table.
///
/// The primary-key schema is either supplied up front (config or
/// `with_schema`) or fetched with `describeTable` on first use and cached
/// for the life of the handle. Concurrent first use waits on one fetch.
///

pub struct Table<B: Backend> {
    backend: B,
    config: TableConfig,
    schema: SchemaSlot,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl<B: Backend> Table<B> {
    /// Build a table handle; the config is validated here.
    pub fn new(backend: B, config: TableConfig) -> Result<Self, InternalError> {
        let schema = match config.validate()? {
            Some(schema) => SchemaSlot::resolved(schema),
            None => SchemaSlot::unresolved(),
        };

        Ok(Self {
            backend,
            config,
            schema,
            metrics: None,
        })
    }

    /// Replace the schema slot with a locally known schema.
    #[must_use]
    pub fn with_schema(mut self, schema: PrimaryKeySchema) -> Self {
        self.schema = SchemaSlot::resolved(schema);
        self
    }

    /// Route this table's metrics to `sink` instead of the global counters.
    #[must_use]
    pub fn metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.table_name
    }

    #[must_use]
    pub const fn config(&self) -> &TableConfig {
        &self.config
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    // ---------------------------------------------------------------------
    // Schema
    // ---------------------------------------------------------------------

    /// Resolved primary-key schema, fetching it on first use.
    pub async fn schema(&self) -> Result<Arc<PrimaryKeySchema>, InternalError> {
        self.schema.resolve(false, || self.describe(false)).await
    }

    /// Schema currently held by the table, without triggering a fetch.
    pub async fn cached_schema(&self) -> Option<Arc<PrimaryKeySchema>> {
        self.schema.current().await
    }

    /// Fetch the schema from the backend; `force` replaces a cached one.
    pub async fn sync_schema(&self, force: bool) -> Result<Arc<PrimaryKeySchema>, InternalError> {
        self.schema.resolve(force, || self.describe(force)).await
    }

    async fn describe(&self, forced: bool) -> Result<PrimaryKeySchema, InternalError> {
        debug!(table = %self.name(), op = "describe_table", "backend request");
        record(
            self.metrics.as_deref(),
            MetricsEvent::BackendRequest { table: self.name() },
        );

        let response = self
            .backend
            .describe_table(DescribeTableRequest {
                table_name: self.name().to_string(),
            })
            .await?;
        let schema = PrimaryKeySchema::new(response.table_meta.primary_key)?;

        info!(
            table = %self.name(),
            columns = ?schema.names(),
            forced,
            "primary key schema synced"
        );
        record(
            self.metrics.as_deref(),
            MetricsEvent::SchemaSynced { table: self.name() },
        );

        Ok(schema)
    }

    // ---------------------------------------------------------------------
    // Single-row writes
    // ---------------------------------------------------------------------

    /// Write a whole row, replacing any existing one.
    pub async fn put(&self, row: &Row) -> Result<(), InternalError> {
        self.put_with(row, RowExistence::Ignore).await
    }

    pub async fn put_with(&self, row: &Row, existence: RowExistence) -> Result<(), InternalError> {
        let mut span = self.span(ExecKind::Write);
        let schema = self.schema_for(row).await?;
        let request = build_put(self.name(), &schema, row, existence)?;

        self.note_request(&span, "put_row");
        self.backend.put_row(request).await?;
        span.succeed(0);

        Ok(())
    }

    /// Write a row that must not exist yet.
    pub async fn insert(&self, row: &Row) -> Result<(), InternalError> {
        let mut span = self.span(ExecKind::Write);
        let schema = self.schema_for(row).await?;
        let request = build_insert(self.name(), &schema, row)?;

        self.note_request(&span, "put_row");
        self.backend.put_row(request).await?;
        span.succeed(0);

        Ok(())
    }

    /// Merge attribute columns into a row that must already exist.
    pub async fn update(&self, row: &Row) -> Result<(), InternalError> {
        self.update_with(row, RowExistence::ExpectExist).await
    }

    pub async fn update_with(
        &self,
        row: &Row,
        existence: RowExistence,
    ) -> Result<(), InternalError> {
        let mut span = self.span(ExecKind::Write);
        let schema = self.schema_for(row).await?;
        let request = build_update(self.name(), &schema, row, existence)?;

        self.note_request(&span, "update_row");
        self.backend.update_row(request).await?;
        span.succeed(0);

        Ok(())
    }

    /// Delete the row addressed by the key columns of `row`.
    pub async fn delete(&self, row: &Row) -> Result<(), InternalError> {
        self.delete_with(row, RowExistence::Ignore).await
    }

    pub async fn delete_with(
        &self,
        row: &Row,
        existence: RowExistence,
    ) -> Result<(), InternalError> {
        let mut span = self.span(ExecKind::Write);
        let schema = self.schema_for(row).await?;
        let request = build_delete(self.name(), &schema, row, existence)?;

        self.note_request(&span, "delete_row");
        self.backend.delete_row(request).await?;
        span.succeed(0);

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Fetch one row by key; `None` when it does not exist.
    /// An empty `columns` list returns every column.
    pub async fn get(&self, row: &Row, columns: &[String]) -> Result<Option<Row>, InternalError> {
        let mut span = self.span(ExecKind::Read);
        let schema = self.schema_for(row).await?;
        let request = build_get(
            self.name(),
            &schema,
            row,
            columns,
            self.config.max_versions,
        )?;

        self.note_request(&span, "get_row");
        let response = self.backend.get_row(request).await?;
        let found = params_to_row(response.row)?;
        span.succeed(u64::from(found.is_some()));

        Ok(found)
    }

    /// Fetch several rows in one request, one result per input row.
    pub async fn batch_get(
        &self,
        rows: &[Row],
        columns: &[String],
    ) -> Result<Vec<BatchGetResult>, InternalError> {
        let mut span = self.span(ExecKind::Read);
        if rows.is_empty() {
            return Err(InternalError::invalid_argument(
                ErrorOrigin::Batch,
                "batch get requires at least one row",
            ));
        }
        if rows.iter().any(|row| row.is_empty()) {
            return Err(MapperError::EmptyRow.into());
        }

        let schema = self.schema().await?;
        let keys = rows
            .iter()
            .map(|row| row_to_full_primary_key(&schema, row))
            .collect::<Result<Vec<_>, _>>()?;
        let request = BatchGetRowRequest {
            tables: vec![BatchGetTable {
                table_name: self.name().to_string(),
                primary_key: keys,
                columns_to_get: columns.to_vec(),
                max_versions: self.config.max_versions,
            }],
        };

        self.note_request(&span, "batch_get_row");
        let response = self.backend.batch_get_row(request).await?;
        let items = response
            .tables
            .into_iter()
            .next()
            .ok_or_else(|| BatchError::MissingTable {
                table: self.name().to_string(),
            })?;
        if items.len() != rows.len() {
            return Err(BatchError::ResultArityMismatch {
                expected: rows.len(),
                found: items.len(),
            }
            .into());
        }

        let mut results = Vec::with_capacity(items.len());
        for item in items {
            if item.is_ok {
                results.push(Ok(params_to_row(item.row)?));
            } else {
                results.push(Err(item.error.unwrap_or_else(unreported_failure)));
            }
        }

        let found = results.iter().filter(|r| matches!(r, Ok(Some(_)))).count();
        span.succeed(u64::try_from(found).unwrap_or(u64::MAX));

        Ok(results)
    }

    // ---------------------------------------------------------------------
    // Batch writes
    // ---------------------------------------------------------------------

    /// Send every labeled row in one batch request.
    ///
    /// A rejected item does not fail the call; it is reported in the
    /// response next to the rows that were written.
    pub async fn batch_write(&self, rows: &BatchRows) -> Result<BatchWriteResponse, InternalError> {
        let mut span = self.span(ExecKind::BatchWrite);
        if rows.total() == 0 {
            return Err(BatchError::Empty.into());
        }
        if rows.values().flatten().any(|row| row.is_empty()) {
            return Err(MapperError::EmptyRow.into());
        }

        let schema = self.schema().await?;
        let items = object_to_batch_items(self.name(), &schema, rows)?;
        let request = BatchWriteRowRequest {
            tables: vec![BatchWriteTable {
                table_name: self.name().to_string(),
                rows: items.iter().map(|item| item.row.clone()).collect(),
            }],
        };

        self.note_request(&span, "batch_write_row");
        let mut response = self.backend.batch_write_row(request).await?;
        let results = response
            .tables
            .remove(self.name())
            .ok_or_else(|| BatchError::MissingTable {
                table: self.name().to_string(),
            })?;
        let response = BatchWriteResponse::new(reconcile(items, results)?);

        let failed = response.failure_count();
        let succeeded = response.len() - failed;
        span.event(MetricsEvent::BatchReconciled {
            table: self.name(),
            succeeded: u64::try_from(succeeded).unwrap_or(u64::MAX),
            failed: u64::try_from(failed).unwrap_or(u64::MAX),
        });
        if failed > 0 {
            warn!(
                table = %self.name(),
                failed,
                total = response.len(),
                "batch write partially failed"
            );
        }
        span.succeed(u64::try_from(succeeded).unwrap_or(u64::MAX));

        Ok(response)
    }

    // ---------------------------------------------------------------------
    // Scans
    // ---------------------------------------------------------------------

    /// Every row from `start` (inclusive) to `end` (exclusive), in key order.
    ///
    /// Key columns missing from `start` scan from the lowest key and columns
    /// missing from `end` scan to the highest, so two empty rows return the
    /// whole table. Requests are issued `range_page_size` rows at a time.
    pub async fn get_range(&self, start: &Row, end: &Row) -> Result<Vec<Row>, InternalError> {
        let mut span = self.span(ExecKind::Scan);
        let schema = self.schema().await?;
        let scan = RangeScan::between(self.name(), &schema, start, end)?
            .with_max_versions(self.config.max_versions);

        let mut stats = ScanStats::default();
        let rows = collect_range(
            &self.backend,
            &scan,
            self.config.range_page_size,
            &mut stats,
        )
        .await;
        self.note_scan(&span, stats);

        let rows = rows?;
        span.succeed(u64::try_from(rows.len()).unwrap_or(u64::MAX));

        Ok(rows)
    }

    /// One page of rows scanned forward from `query.filter`.
    ///
    /// The filter only sets the start key. The scan is not bounded by it and
    /// runs on into later partition keys once the filtered ones are used up.
    ///
    /// Page `n > 1` costs a skip scan over the `(n - 1) * limit` preceding
    /// rows, so deep pages get linearly more expensive; use `get_range` with
    /// a key bound to walk large tables.
    pub async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, InternalError> {
        let mut span = self.span(ExecKind::Scan);
        query.validate()?;

        let schema = self.schema().await?;
        let scan = RangeScan::between(self.name(), &schema, &query.filter, &Row::new())?
            .with_columns(query.columns.clone())
            .with_max_versions(self.config.max_versions);

        let mut stats = ScanStats::default();
        let rows = select_page(&self.backend, &scan, query, &mut stats).await;
        self.note_scan(&span, stats);

        let rows = rows?;
        span.succeed(u64::try_from(rows.len()).unwrap_or(u64::MAX));

        Ok(rows)
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn span(&self, kind: ExecKind) -> Span<'_> {
        Span::new(self.metrics.clone(), kind, self.name())
    }

    // Empty rows are rejected before the schema is resolved.
    async fn schema_for(&self, row: &Row) -> Result<Arc<PrimaryKeySchema>, InternalError> {
        if row.is_empty() {
            return Err(MapperError::EmptyRow.into());
        }

        self.schema().await
    }

    fn note_request(&self, span: &Span<'_>, op: &'static str) {
        debug!(table = %self.name(), op, "backend request");
        span.event(MetricsEvent::BackendRequest { table: self.name() });
    }

    fn note_scan(&self, span: &Span<'_>, stats: ScanStats) {
        span.event(MetricsEvent::RowsScanned {
            table: self.name(),
            requests: stats.requests,
            rows_scanned: stats.rows_scanned,
        });
    }
}
