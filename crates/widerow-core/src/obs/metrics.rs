use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{LazyLock, Mutex},
};

///
/// EventState
/// Ephemeral, in-process counters for table operations.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub tables: BTreeMap<String, TableCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Facade entrypoints
    pub write_calls: u64,
    pub read_calls: u64,
    pub batch_write_calls: u64,
    pub scan_calls: u64,
    pub failed_calls: u64,

    // Backend traffic
    pub backend_requests: u64,
    pub rows_scanned: u64,
    pub rows_returned: u64,
    pub scan_rows_returned: u64,

    // Batch reconciliation
    pub batch_items_ok: u64,
    pub batch_items_failed: u64,

    // Schema lifecycle
    pub schema_syncs: u64,
}

///
/// TableCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TableCounters {
    pub write_calls: u64,
    pub read_calls: u64,
    pub scan_calls: u64,
    pub failed_calls: u64,
    pub backend_requests: u64,
    pub rows_scanned: u64,
    pub rows_returned: u64,
    pub scan_rows_returned: u64,
    pub batch_items_ok: u64,
    pub batch_items_failed: u64,
}

static EVENT_STATE: LazyLock<Mutex<EventState>> =
    LazyLock::new(|| Mutex::new(EventState::default()));

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    let state = EVENT_STATE
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    f(&state)
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    let mut state = EVENT_STATE
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    f(&mut state)
}

/// Reset all counters (useful in tests).
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
/// Counter snapshot plus per-table averages.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    pub counters: EventState,
    pub table_summaries: Vec<TableSummary>,
}

///
/// TableSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TableSummary {
    pub table: String,
    pub scan_calls: u64,
    pub rows_scanned: u64,
    pub avg_rows_per_scan: f64,
    pub batch_failure_ratio: f64,
}

/// Build a report from the current counters.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub(crate) fn report() -> EventReport {
    let counters = with_state(Clone::clone);

    let table_summaries = counters
        .tables
        .iter()
        .map(|(table, c)| {
            let ratio = |num: u64, den: u64| {
                if den > 0 {
                    num as f64 / den as f64
                } else {
                    0.0
                }
            };

            TableSummary {
                table: table.clone(),
                scan_calls: c.scan_calls,
                rows_scanned: c.rows_scanned,
                avg_rows_per_scan: ratio(c.scan_rows_returned, c.scan_calls),
                batch_failure_ratio: ratio(
                    c.batch_items_failed,
                    c.batch_items_ok.saturating_add(c.batch_items_failed),
                ),
            }
        })
        .collect();

    EventReport {
        counters,
        table_summaries,
    }
}
