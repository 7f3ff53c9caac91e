//! Module: db::select
//! Responsibility: page-number pagination emulated on forward range scans.
//! Does not own: scan request shape or continuation handling (see `db::range`).
//! Boundary: offsets are approximate; rows written between calls can shift
//! page contents.

use crate::{
    backend::{Backend, PrimaryKey},
    db::{
        mapper::payloads_to_rows,
        range::{RangeScan, ScanStats, ensure_progress, fetch_page},
    },
    error::{ErrorOrigin, InternalError},
    row::Row,
};

///
/// CONSTANTS
///

/// Column window of a skip scan. No real column sorts inside `["_", "__")`
/// in practice, so skipped rows come back as bare keys.
pub const SKIP_START_COLUMN: &str = "_";
pub const SKIP_END_COLUMN: &str = "__";

///
/// SelectQuery
///
/// One page of a forward scan starting at `filter`.
///
/// `filter` fixes where the scan starts, not where it stops: key columns it
/// leaves out start at `InfMin` and the scan runs to the end of the table,
/// so a page can cross into the next partition key. Pages are 1-based and
/// `page <= 1` means the first page.
///
/// The skip before a later page is one scan whose continuation key marks
/// the page start. `resume_truncated_skip` re-issues the skip for the rows
/// still missing when a backend caps the response below the requested
/// limit; only enable it for backends that return every skipped row.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectQuery {
    pub filter: Row,
    pub page: u32,
    pub limit: u32,
    pub columns: Vec<String>,
    pub resume_truncated_skip: bool,
}

impl SelectQuery {
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            filter: Row::new(),
            page: 1,
            limit,
            columns: Vec::new(),
            resume_truncated_skip: false,
        }
    }

    #[must_use]
    pub fn filter(mut self, filter: Row) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn resume_truncated_skip(mut self, resume: bool) -> Self {
        self.resume_truncated_skip = resume;
        self
    }

    /// Rows to skip before the requested page starts.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    pub fn validate(&self) -> Result<(), InternalError> {
        if self.limit == 0 {
            return Err(InternalError::invalid_argument(
                ErrorOrigin::Select,
                "select limit must be greater than zero",
            ));
        }

        Ok(())
    }
}

/// Fetch one page of `scan`.
///
/// The first page is a single scan. Any later page first runs a skip scan
/// over `(page - 1) * limit` rows with an empty column window, then one real
/// scan from the skip's continuation key. Cost therefore grows linearly with
/// the page number. A skip that runs out of rows yields an empty page.
pub async fn select_page<B: Backend + ?Sized>(
    backend: &B,
    scan: &RangeScan,
    query: &SelectQuery,
    stats: &mut ScanStats,
) -> Result<Vec<Row>, InternalError> {
    query.validate()?;

    let cursor = match query.offset() {
        0 => scan.start.clone(),
        offset => {
            let resume = query.resume_truncated_skip;
            match skip(backend, scan, offset, resume, stats).await? {
                Some(cursor) => cursor,
                None => return Ok(Vec::new()),
            }
        }
    };

    let response = fetch_page(backend, scan.request(cursor, query.limit), stats).await?;

    Ok(payloads_to_rows(response.rows)?)
}

// Advance past `offset` rows, returning where the page starts.
//
// Without `resume` the continuation key of the first skip scan is the page
// start, whatever rows came back with it. With `resume` a short response is
// taken as truncation and the skip continues from that key for the remainder.
async fn skip<B: Backend + ?Sized>(
    backend: &B,
    scan: &RangeScan,
    offset: u64,
    resume: bool,
    stats: &mut ScanStats,
) -> Result<Option<PrimaryKey>, InternalError> {
    let mut cursor = scan.start.clone();
    let mut remaining = offset;

    loop {
        let limit = u32::try_from(remaining).unwrap_or(u32::MAX);
        let mut request = scan.request(cursor.clone(), limit);
        request.columns_to_get.clear();
        request.start_column = Some(SKIP_START_COLUMN.to_string());
        request.end_column = Some(SKIP_END_COLUMN.to_string());

        let response = fetch_page(backend, request, stats).await?;
        let Some(next) = response.next_start_primary_key else {
            return Ok(None);
        };
        if !resume {
            return Ok(Some(next));
        }

        let skipped = response.rows.len();
        remaining = remaining.saturating_sub(u64::try_from(skipped).unwrap_or(u64::MAX));
        if remaining == 0 {
            return Ok(Some(next));
        }

        ensure_progress(&cursor, &next, skipped, ErrorOrigin::Select)?;
        cursor = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{MemoryBackend, RowExistence},
        db::write::build_put,
        error::ErrorClass,
        schema::{PrimaryKeyColumn, PrimaryKeySchema, PrimaryKeyType},
    };

    fn columns() -> Vec<PrimaryKeyColumn> {
        vec![
            PrimaryKeyColumn::new("user", PrimaryKeyType::String),
            PrimaryKeyColumn::new("n", PrimaryKeyType::Integer),
        ]
    }

    fn schema() -> PrimaryKeySchema {
        PrimaryKeySchema::new(columns()).expect("schema should be valid")
    }

    async fn seed(backend: &MemoryBackend, user: &str, count: i64) {
        for n in 0..count {
            let row = Row::new()
                .with("user", user)
                .with("n", n)
                .with("body", format!("post {n}"));
            let request =
                build_put("feed", &schema(), &row, RowExistence::Ignore).expect("put request");
            backend.put_row(request).await.expect("seed row");
        }
        backend.clear_calls();
    }

    async fn seeded(count: i64) -> MemoryBackend {
        let backend = MemoryBackend::new().with_table("feed", columns());
        seed(&backend, "u1", count).await;
        backend
    }

    fn scan(query: &SelectQuery) -> RangeScan {
        RangeScan::between("feed", &schema(), &query.filter, &Row::new())
            .expect("scan")
            .with_columns(query.columns.clone())
    }

    fn numbers(rows: &[Row]) -> Vec<i64> {
        rows.iter().filter_map(|r| r.get("n")?.as_int()).collect()
    }

    #[tokio::test]
    async fn first_page_is_a_single_scan() {
        let backend = seeded(50).await;
        let query = SelectQuery::new(10).filter(Row::new().with("user", "u1"));
        let mut stats = ScanStats::default();

        let rows = select_page(&backend, &scan(&query), &query, &mut stats)
            .await
            .expect("page 1");

        assert_eq!(numbers(&rows), (0..10).collect::<Vec<_>>());
        assert_eq!(stats.requests, 1);
        assert_eq!(backend.range_calls()[0].limit, Some(10));
    }

    #[tokio::test]
    async fn later_page_skips_then_reads() {
        let backend = seeded(50).await;
        let query = SelectQuery::new(10).page(3).columns(["body"]);
        let mut stats = ScanStats::default();

        let rows = select_page(&backend, &scan(&query), &query, &mut stats)
            .await
            .expect("page 3");

        assert_eq!(numbers(&rows), (20..30).collect::<Vec<_>>());
        assert!(rows.iter().all(|r| r.contains_key("body")));

        let calls = backend.range_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].limit, Some(20));
        assert_eq!(calls[0].start_column.as_deref(), Some("_"));
        assert_eq!(calls[0].end_column.as_deref(), Some("__"));
        assert_eq!(calls[1].limit, Some(10));
        assert_eq!(calls[1].columns_to_get, vec!["body".to_string()]);
        assert_eq!(calls[1].start_column, None);
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty() {
        let backend = seeded(15).await;
        let query = SelectQuery::new(10).page(3);
        let mut stats = ScanStats::default();

        let rows = select_page(&backend, &scan(&query), &query, &mut stats)
            .await
            .expect("page 3");

        assert!(rows.is_empty());
        assert_eq!(stats.requests, 1);
    }

    #[tokio::test]
    async fn skip_start_comes_from_the_continuation_key_alone() {
        let backend = seeded(30).await.with_empty_window_rows_omitted();
        let query = SelectQuery::new(10).page(2);
        let mut stats = ScanStats::default();

        let rows = select_page(&backend, &scan(&query), &query, &mut stats)
            .await
            .expect("page 2");

        assert_eq!(numbers(&rows), (10..20).collect::<Vec<_>>());
        assert_eq!(backend.range_calls().len(), 2);
    }

    #[tokio::test]
    async fn truncated_skip_without_resume_starts_at_the_cut() {
        let backend = seeded(50).await.with_max_rows_per_response(8);
        let query = SelectQuery::new(5).page(5);
        let mut stats = ScanStats::default();

        let rows = select_page(&backend, &scan(&query), &query, &mut stats)
            .await
            .expect("page 5");

        assert_eq!(numbers(&rows), (8..13).collect::<Vec<_>>());
        assert_eq!(stats.requests, 2);
    }

    #[tokio::test]
    async fn truncated_skip_resumes_with_the_remainder() {
        let backend = seeded(50).await.with_max_rows_per_response(8);
        let query = SelectQuery::new(5).page(5).resume_truncated_skip(true);
        let mut stats = ScanStats::default();

        let rows = select_page(&backend, &scan(&query), &query, &mut stats)
            .await
            .expect("page 5");

        assert_eq!(numbers(&rows), (20..25).collect::<Vec<_>>());
        let limits: Vec<_> = backend.range_calls().iter().map(|c| c.limit).collect();
        assert_eq!(limits, vec![Some(20), Some(12), Some(4), Some(5)]);
    }

    #[tokio::test]
    async fn filter_sets_the_start_not_the_end() {
        let backend = seeded(4).await;
        seed(&backend, "u2", 4).await;
        let query = SelectQuery::new(3)
            .page(2)
            .filter(Row::new().with("user", "u1"));
        let mut stats = ScanStats::default();

        let rows = select_page(&backend, &scan(&query), &query, &mut stats)
            .await
            .expect("page 2");
        let users: Vec<_> = rows
            .iter()
            .filter_map(|r| r.get("user")?.as_text().map(str::to_string))
            .collect();

        assert_eq!(users, vec!["u1", "u2", "u2"]);
        assert_eq!(numbers(&rows), vec![3, 0, 1]);
    }

    #[tokio::test]
    async fn zero_limit_is_rejected_without_a_scan() {
        let backend = seeded(3).await;
        let query = SelectQuery::new(0);
        let mut stats = ScanStats::default();

        let err = select_page(&backend, &scan(&query), &query, &mut stats)
            .await
            .expect_err("zero limit");

        assert_eq!(err.class, ErrorClass::InvalidArgument);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn offset_treats_page_zero_as_first_page() {
        assert_eq!(SelectQuery::new(10).page(0).offset(), 0);
        assert_eq!(SelectQuery::new(10).page(1).offset(), 0);
        assert_eq!(SelectQuery::new(10).page(4).offset(), 30);
    }
}
