//! Metrics sink boundary.
//!
//! Table logic MUST NOT touch obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.

use crate::obs::metrics;
use std::sync::Arc;

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    Write,
    Read,
    BatchWrite,
    Scan,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent<'a> {
    ExecStart {
        kind: ExecKind,
        table: &'a str,
    },
    ExecFinish {
        kind: ExecKind,
        table: &'a str,
        rows_returned: u64,
        failed: bool,
    },
    BackendRequest {
        table: &'a str,
    },
    RowsScanned {
        table: &'a str,
        requests: u64,
        rows_scanned: u64,
    },
    BatchReconciled {
        table: &'a str,
        succeeded: u64,
        failed: u64,
    },
    SchemaSynced {
        table: &'a str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default process-wide sink that writes into global metrics state.
/// Acts as the concrete sink when a table has no override installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::ExecStart { kind, table } => {
                metrics::with_state_mut(|m| {
                    let entry = m.tables.entry(table.to_string()).or_default();
                    match kind {
                        ExecKind::Write => {
                            m.ops.write_calls = m.ops.write_calls.saturating_add(1);
                            entry.write_calls = entry.write_calls.saturating_add(1);
                        }
                        ExecKind::BatchWrite => {
                            m.ops.batch_write_calls = m.ops.batch_write_calls.saturating_add(1);
                            entry.write_calls = entry.write_calls.saturating_add(1);
                        }
                        ExecKind::Read => {
                            m.ops.read_calls = m.ops.read_calls.saturating_add(1);
                            entry.read_calls = entry.read_calls.saturating_add(1);
                        }
                        ExecKind::Scan => {
                            m.ops.scan_calls = m.ops.scan_calls.saturating_add(1);
                            entry.scan_calls = entry.scan_calls.saturating_add(1);
                        }
                    }
                });
            }

            MetricsEvent::ExecFinish {
                kind,
                table,
                rows_returned,
                failed,
            } => {
                metrics::with_state_mut(|m| {
                    let entry = m.tables.entry(table.to_string()).or_default();
                    m.ops.rows_returned = m.ops.rows_returned.saturating_add(rows_returned);
                    entry.rows_returned = entry.rows_returned.saturating_add(rows_returned);
                    if kind == ExecKind::Scan {
                        m.ops.scan_rows_returned =
                            m.ops.scan_rows_returned.saturating_add(rows_returned);
                        entry.scan_rows_returned =
                            entry.scan_rows_returned.saturating_add(rows_returned);
                    }
                    if failed {
                        m.ops.failed_calls = m.ops.failed_calls.saturating_add(1);
                        entry.failed_calls = entry.failed_calls.saturating_add(1);
                    }
                });
            }

            MetricsEvent::BackendRequest { table } => {
                metrics::with_state_mut(|m| {
                    m.ops.backend_requests = m.ops.backend_requests.saturating_add(1);
                    let entry = m.tables.entry(table.to_string()).or_default();
                    entry.backend_requests = entry.backend_requests.saturating_add(1);
                });
            }

            MetricsEvent::RowsScanned {
                table,
                requests,
                rows_scanned,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.backend_requests = m.ops.backend_requests.saturating_add(requests);
                    m.ops.rows_scanned = m.ops.rows_scanned.saturating_add(rows_scanned);
                    let entry = m.tables.entry(table.to_string()).or_default();
                    entry.backend_requests = entry.backend_requests.saturating_add(requests);
                    entry.rows_scanned = entry.rows_scanned.saturating_add(rows_scanned);
                });
            }

            MetricsEvent::BatchReconciled {
                table,
                succeeded,
                failed,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.batch_items_ok = m.ops.batch_items_ok.saturating_add(succeeded);
                    m.ops.batch_items_failed = m.ops.batch_items_failed.saturating_add(failed);
                    let entry = m.tables.entry(table.to_string()).or_default();
                    entry.batch_items_ok = entry.batch_items_ok.saturating_add(succeeded);
                    entry.batch_items_failed = entry.batch_items_failed.saturating_add(failed);
                });
            }

            MetricsEvent::SchemaSynced { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.schema_syncs = m.ops.schema_syncs.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

/// Route an event to the table's override sink, or the global sink.
pub(crate) fn record(sink: Option<&dyn MetricsSink>, event: MetricsEvent<'_>) {
    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Span
/// RAII guard that emits start/finish events for one facade call.
/// A span dropped before `succeed` counts as a failed call.

pub(crate) struct Span<'a> {
    sink: Option<Arc<dyn MetricsSink>>,
    kind: ExecKind,
    table: &'a str,
    rows: u64,
    failed: bool,
}

impl<'a> Span<'a> {
    pub(crate) fn new(
        sink: Option<Arc<dyn MetricsSink>>,
        kind: ExecKind,
        table: &'a str,
    ) -> Self {
        record(sink.as_deref(), MetricsEvent::ExecStart { kind, table });

        Self {
            sink,
            kind,
            table,
            rows: 0,
            failed: true,
        }
    }

    pub(crate) fn event(&self, event: MetricsEvent<'_>) {
        record(self.sink.as_deref(), event);
    }

    /// Mark the call successful with `rows` rows handed back to the caller.
    pub(crate) const fn succeed(&mut self, rows: u64) {
        self.rows = rows;
        self.failed = false;
    }
}

impl Drop for Span<'_> {
    fn drop(&mut self) {
        record(
            self.sink.as_deref(),
            MetricsEvent::ExecFinish {
                kind: self.kind,
                table: self.table,
                rows_returned: self.rows,
                failed: self.failed,
            },
        );
    }
}
