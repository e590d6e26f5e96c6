//! Transfer aggregate and item lines.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core_types::{
    Actor, ActorRef, ItemId, Priority, SubLocationId, TransferId, UnitId,
};
use crate::transfer::state::TransferState;

/// Digital signature entry: who confirmed a physical handoff, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub actor: ActorRef,
    pub signed_at: DateTime<Utc>,
    pub action: String,
}

impl SignatureRecord {
    pub fn now(actor: &Actor, action: &str) -> Self {
        Self {
            actor: actor.into(),
            signed_at: Utc::now(),
            action: action.to_string(),
        }
    }
}

/// Cross-unit transfer aggregate root.
///
/// Mutated only through the coordinator's transitions; terminal transfers
/// are immutable history and are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub order_number: String,

    pub origin_unit: UnitId,
    pub origin_sub_location: SubLocationId,
    pub destination_unit: UnitId,
    pub destination_sub_location: SubLocationId,

    pub state: TransferState,
    pub priority: Priority,

    pub requested_by: ActorRef,
    pub approved_by: Option<ActorRef>,

    pub reason: String,
    pub notes: String,

    // Signed confirmation token, minted at approval
    pub token: Option<String>,
    pub signed_url: Option<String>,
    pub document_generated: bool,
    pub document_ref: Option<String>,

    pub origin_signature: Option<SignatureRecord>,
    pub destination_signature: Option<SignatureRecord>,

    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub transit_started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Transfer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_number: String,
        origin_unit: UnitId,
        origin_sub_location: SubLocationId,
        destination_unit: UnitId,
        destination_sub_location: SubLocationId,
        requested_by: ActorRef,
        reason: String,
        priority: Priority,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_number,
            origin_unit,
            origin_sub_location,
            destination_unit,
            destination_sub_location,
            state: TransferState::Requested,
            priority,
            requested_by,
            approved_by: None,
            reason,
            notes: String::new(),
            token: None,
            signed_url: None,
            document_generated: false,
            document_ref: None,
            origin_signature: None,
            destination_signature: None,
            requested_at: now,
            approved_at: None,
            transit_started_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    /// Append to the free-text notes, separating entries with a blank line.
    pub fn push_note(&mut self, entry: &str) {
        if !self.notes.is_empty() {
            self.notes.push_str("\n\n");
        }
        self.notes.push_str(entry);
    }
}

/// One item on a transfer; unique per (transfer, item).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferItemLine {
    pub transfer_id: TransferId,
    pub item_id: ItemId,
    pub quantity: u32,
    pub note: String,
}

/// Month-scoped order-number prefix: `{PREFIX}{yyyy}{mm}`.
pub fn order_prefix(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}{}{:02}", prefix, now.year(), now.month())
}

/// Next order number within the prefix: max existing suffix + 1, zero-padded
/// to four digits. The sequence restarts monthly, so it is not globally
/// monotonic.
pub fn next_order_number(prefix: &str, now: DateTime<Utc>, max_suffix: Option<u32>) -> String {
    let seq = max_suffix.map_or(1, |n| n + 1);
    format!("{}{:04}", order_prefix(prefix, now), seq)
}
