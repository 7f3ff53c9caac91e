use crate::{
    config::{self, TableConfig},
    error::Error,
};
use std::{path::Path, sync::Arc};
use widerow_core::{
    backend::{Backend, RowExistence},
    db::{BatchGetResult, BatchRows, BatchWriteResponse, SelectQuery},
    obs::MetricsSink,
    row::Row,
    schema::PrimaryKeySchema,
};

///
/// Table
///
/// Public facade for one backend table.
/// Wraps the core table and converts core errors into `widerow::Error`.
///

pub struct Table<B: Backend> {
    inner: widerow_core::db::Table<B>,
}

impl<B: Backend> Table<B> {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    pub fn new(backend: B, config: TableConfig) -> Result<Self, Error> {
        Ok(Self {
            inner: widerow_core::db::Table::new(backend, config)?,
        })
    }

    /// Build a table from TOML config text.
    pub fn from_toml_str(backend: B, source: &str) -> Result<Self, Error> {
        Self::new(backend, config::from_toml_str(source)?)
    }

    /// Build a table from a TOML config file.
    pub fn from_toml_file(backend: B, path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::new(backend, config::from_toml_file(path)?)
    }

    #[must_use]
    pub fn with_schema(mut self, schema: PrimaryKeySchema) -> Self {
        self.inner = self.inner.with_schema(schema);
        self
    }

    /// Override the metrics sink for this table.
    #[must_use]
    pub fn metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.inner = self.inner.metrics_sink(sink);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    #[must_use]
    pub const fn config(&self) -> &TableConfig {
        self.inner.config()
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        self.inner.backend()
    }

    #[must_use]
    pub const fn inner(&self) -> &widerow_core::db::Table<B> {
        &self.inner
    }

    // ------------------------------------------------------------------
    // Schema
    // ------------------------------------------------------------------

    pub async fn schema(&self) -> Result<Arc<PrimaryKeySchema>, Error> {
        Ok(self.inner.schema().await?)
    }

    /// Schema already resolved, without touching the backend.
    pub async fn cached_schema(&self) -> Option<Arc<PrimaryKeySchema>> {
        self.inner.cached_schema().await
    }

    pub async fn sync_schema(&self, force: bool) -> Result<Arc<PrimaryKeySchema>, Error> {
        Ok(self.inner.sync_schema(force).await?)
    }

    // ------------------------------------------------------------------
    // Single-row writes
    // ------------------------------------------------------------------

    pub async fn put(&self, row: &Row) -> Result<(), Error> {
        Ok(self.inner.put(row).await?)
    }

    pub async fn put_with(&self, row: &Row, existence: RowExistence) -> Result<(), Error> {
        Ok(self.inner.put_with(row, existence).await?)
    }

    pub async fn insert(&self, row: &Row) -> Result<(), Error> {
        Ok(self.inner.insert(row).await?)
    }

    pub async fn update(&self, row: &Row) -> Result<(), Error> {
        Ok(self.inner.update(row).await?)
    }

    pub async fn update_with(&self, row: &Row, existence: RowExistence) -> Result<(), Error> {
        Ok(self.inner.update_with(row, existence).await?)
    }

    pub async fn delete(&self, row: &Row) -> Result<(), Error> {
        Ok(self.inner.delete(row).await?)
    }

    pub async fn delete_with(&self, row: &Row, existence: RowExistence) -> Result<(), Error> {
        Ok(self.inner.delete_with(row, existence).await?)
    }

    // ------------------------------------------------------------------
    // Reads and scans
    // ------------------------------------------------------------------

    pub async fn get(&self, row: &Row, columns: &[String]) -> Result<Option<Row>, Error> {
        Ok(self.inner.get(row, columns).await?)
    }

    pub async fn batch_get(
        &self,
        rows: &[Row],
        columns: &[String],
    ) -> Result<Vec<BatchGetResult>, Error> {
        Ok(self.inner.batch_get(rows, columns).await?)
    }

    pub async fn batch_write(&self, rows: &BatchRows) -> Result<BatchWriteResponse, Error> {
        Ok(self.inner.batch_write(rows).await?)
    }

    pub async fn get_range(&self, start: &Row, end: &Row) -> Result<Vec<Row>, Error> {
        Ok(self.inner.get_range(start, end).await?)
    }

    /// One page of rows; see the core `Table::select` for the cost model.
    pub async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, Error> {
        Ok(self.inner.select(query).await?)
    }
}
