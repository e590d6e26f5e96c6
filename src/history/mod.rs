//! Append-only per-item life record.
//!
//! Every mutating operation on an item appends an immutable [`HistoryEvent`]
//! atomically with the mutation itself. Events are never edited, deleted or
//! reordered; retention is a caller concern. The [`ledger`] exposes the only
//! append path plus derived queries and summaries.

pub mod event;
pub mod ledger;

pub use event::{HistoryEvent, HistoryEventKind};
pub use ledger::{HistoryLedger, HistorySummary, TimeRange, TraceabilityReport};
