//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! This module never talks to the backend.
//! Table operations report into it through `sink::Span`.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, EventState, TableCounters, TableSummary};
pub use sink::{ExecKind, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all};
