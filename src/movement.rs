//! Same-unit relocation of items.
//!
//! Internal moves need no coordinating-authority approval: the actor must
//! belong to the item's unit, the destination sub-location must belong to
//! the same unit, and the item must be Available. The movement record, the
//! item's new location and the life-record event persist in one atomic
//! commit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core_types::{Actor, ActorRef, ItemId, SubLocationId, UnitId};
use crate::error::{CoreError, CoreResult};
use crate::history::event::HistoryEventKind;
use crate::inventory::guard::{self, ItemGuard};
use crate::inventory::item::ItemState;
use crate::notify::{self, Notifier, NotifyEvent, Recipient};
use crate::store::{CommitBatch, Store};

/// Record of one completed internal move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub id: Uuid,
    pub item_id: ItemId,
    pub unit_id: UnitId,
    pub origin_sub_location: SubLocationId,
    pub destination_sub_location: SubLocationId,
    pub moved_by: ActorRef,
    pub reason: String,
    pub note: String,
    pub moved_at: DateTime<Utc>,
}

pub struct MovementService {
    store: Arc<dyn Store>,
    guard: ItemGuard,
    notifier: Arc<dyn Notifier>,
}

impl MovementService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        let guard = ItemGuard::new(store.clone());
        Self {
            store,
            guard,
            notifier,
        }
    }

    /// Relocate an item within its unit.
    pub async fn move_internal(
        &self,
        item_id: ItemId,
        destination_sub_location: SubLocationId,
        actor: &Actor,
        reason: &str,
        note: &str,
    ) -> CoreResult<MovementRecord> {
        let item = self
            .store
            .fetch_item(item_id)
            .await?
            .ok_or(CoreError::NotFound("item"))?;
        let destination = self
            .store
            .fetch_sub_location(destination_sub_location)
            .await?
            .ok_or(CoreError::NotFound("sub-location"))?;

        if !actor.belongs_to(item.unit_id) {
            return Err(CoreError::PermissionDenied(
                "actor must belong to the item's unit".into(),
            ));
        }
        if destination.unit_id != item.unit_id {
            return Err(CoreError::MovementInvalidLocation);
        }
        if item.sub_location_id == destination.id {
            return Err(CoreError::MovementSameLocation);
        }
        if item.state != ItemState::Available {
            return Err(CoreError::ItemNotAvailable);
        }

        let origin_snapshot = self
            .guard
            .snapshot(item.unit_id, Some(item.sub_location_id))
            .await?;
        let destination_snapshot = self
            .guard
            .snapshot(item.unit_id, Some(destination.id))
            .await?;

        let movement = MovementRecord {
            id: Uuid::new_v4(),
            item_id: item.id,
            unit_id: item.unit_id,
            origin_sub_location: item.sub_location_id,
            destination_sub_location: destination.id,
            moved_by: actor.into(),
            reason: reason.to_string(),
            note: note.to_string(),
            moved_at: Utc::now(),
        };

        let (moved, event) = guard::relocate(
            &item,
            item.unit_id,
            destination.id,
            origin_snapshot,
            destination_snapshot,
            HistoryEventKind::InternalMove {
                reason: reason.to_string(),
            },
            Some(actor),
            note,
        );

        self.store
            .commit(
                CommitBatch::new()
                    .write_item(moved, vec![event])
                    .record_movement(movement.clone()),
            )
            .await?;

        tracing::info!(
            sku = %item.sku,
            destination = %destination.code,
            "internal move completed"
        );

        notify::dispatch(
            self.notifier.as_ref(),
            Recipient::UnitExcept(item.unit_id, actor.id),
            NotifyEvent::InternalMove,
            serde_json::json!({
                "item_id": item.id,
                "sku": item.sku,
                "destination": destination.name,
                "reason": reason,
            }),
        )
        .await;

        Ok(movement)
    }

    /// Movement records for one item, oldest first.
    pub async fn item_movements(&self, item_id: ItemId) -> CoreResult<Vec<MovementRecord>> {
        self.store.item_movements(item_id).await
    }
}
