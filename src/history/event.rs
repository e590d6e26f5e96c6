//! Typed life-record events.
//!
//! The event payload is a tagged union rather than a free-form map: the set
//! of event kinds is closed, so consumers get compile-time exhaustiveness.
//! The serialized shape (a `kind` tag next to the structured payload and the
//! origin/destination snapshots) stays compatible with pre-existing records.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core_types::{Actor, ActorRef, EventId, LocationSnapshot};
use crate::inventory::item::{ItemCategory, ItemState};

/// Kind-specific event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryEventKind {
    /// Item registered in the system.
    Creation {
        category: ItemCategory,
        #[serde(skip_serializing_if = "Option::is_none")]
        unit_value: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        supplier: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        invoice_number: Option<String>,
    },
    /// Lifecycle state changed.
    StateChange {
        from: ItemState,
        to: ItemState,
        reason: String,
    },
    /// Relocated within the owning unit.
    InternalMove { reason: String },
    /// Crossed a unit boundary under a transfer order.
    ExternalTransfer { order_number: String },
    /// Maintenance performed or scheduled.
    Maintenance {
        maintenance_kind: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        started_on: Option<NaiveDate>,
        #[serde(skip_serializing_if = "Option::is_none")]
        ended_on: Option<NaiveDate>,
    },
    /// Descriptive fields edited.
    FieldUpdate { fields: Vec<String> },
}

impl HistoryEventKind {
    /// Stable kind label, also the serialized `kind` tag.
    pub fn label(&self) -> &'static str {
        match self {
            HistoryEventKind::Creation { .. } => "creation",
            HistoryEventKind::StateChange { .. } => "state_change",
            HistoryEventKind::InternalMove { .. } => "internal_move",
            HistoryEventKind::ExternalTransfer { .. } => "external_transfer",
            HistoryEventKind::Maintenance { .. } => "maintenance",
            HistoryEventKind::FieldUpdate { .. } => "field_update",
        }
    }
}

/// One immutable entry of an item's life record.
///
/// Produced exclusively through the ledger's append operation. Insertion
/// order is chronological order; entries are never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub id: EventId,
    pub recorded_at: DateTime<Utc>,
    /// `None` means the system itself acted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<ActorRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<LocationSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<LocationSnapshot>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
    #[serde(flatten)]
    pub kind: HistoryEventKind,
}

impl HistoryEvent {
    pub fn new(kind: HistoryEventKind, actor: Option<&Actor>) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            actor: actor.map(ActorRef::from),
            origin: None,
            destination: None,
            note: String::new(),
            kind,
        }
    }

    pub fn with_origin(mut self, origin: LocationSnapshot) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_destination(mut self, destination: LocationSnapshot) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}
