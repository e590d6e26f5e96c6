//! Item-level state invariants shared by internal moves and external
//! transfers.

use std::sync::Arc;

use chrono::Utc;

use crate::core_types::{Actor, ItemId, SubLocation, SubLocationId, Unit, UnitId};
use crate::core_types::LocationSnapshot;
use crate::error::{CoreError, CoreResult};
use crate::history::event::{HistoryEvent, HistoryEventKind};
use crate::inventory::item::{Item, ItemState};
use crate::store::{CommitBatch, Store};

/// Only Available and Assigned items may enter a transfer.
pub fn assert_transferable(item: &Item) -> CoreResult<()> {
    if item.state.is_transferable() {
        Ok(())
    } else {
        Err(CoreError::ItemNotAvailable)
    }
}

/// Builds the StateChange event for a transition. Pure, so the transfer
/// coordinator can fold several item transitions into one atomic commit.
pub fn state_change_event(
    item: &Item,
    to: ItemState,
    actor: Option<&Actor>,
    reason: &str,
) -> HistoryEvent {
    HistoryEvent::new(
        HistoryEventKind::StateChange {
            from: item.state,
            to,
            reason: reason.to_string(),
        },
        actor,
    )
}

/// Builds the relocated row image plus the event carrying origin and
/// destination snapshots. Pure like [`state_change_event`]: the caller
/// resolves snapshots before mutating and folds the write into its own
/// atomic commit, alongside whatever else the move entails.
pub fn relocate(
    item: &Item,
    destination_unit: UnitId,
    destination_sub_location: SubLocationId,
    origin: LocationSnapshot,
    destination: LocationSnapshot,
    kind: HistoryEventKind,
    actor: Option<&Actor>,
    note: &str,
) -> (Item, HistoryEvent) {
    let event = HistoryEvent::new(kind, actor)
        .with_origin(origin)
        .with_destination(destination)
        .with_note(note);

    let mut moved = item.clone();
    moved.unit_id = destination_unit;
    moved.sub_location_id = destination_sub_location;
    moved.updated_at = Utc::now();
    (moved, event)
}

/// Enforces item-state invariants and persists guarded mutations.
pub struct ItemGuard {
    store: Arc<dyn Store>,
}

impl ItemGuard {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Change the item's state, appending a StateChange event atomically.
    ///
    /// Same-state transitions are not rejected here; callers decide whether
    /// they are no-ops. Transitions outside the allowed-set fail.
    pub async fn change_state(
        &self,
        item_id: ItemId,
        new_state: ItemState,
        actor: Option<&Actor>,
        reason: &str,
    ) -> CoreResult<Item> {
        let mut item = self
            .store
            .fetch_item(item_id)
            .await?
            .ok_or(CoreError::NotFound("item"))?;

        if !item.state.can_become(new_state) {
            return Err(CoreError::Validation(format!(
                "item {} cannot go from {} to {}",
                item.sku, item.state, new_state
            )));
        }

        let event = state_change_event(&item, new_state, actor, reason);
        item.state = new_state;
        item.updated_at = Utc::now();

        self.store
            .commit(CommitBatch::new().write_item(item.clone(), vec![event]))
            .await?;

        tracing::info!(
            sku = %item.sku,
            state = %new_state,
            "item state changed"
        );
        Ok(item)
    }

    /// Resolve a location snapshot from directory read models.
    pub async fn snapshot(
        &self,
        unit_id: UnitId,
        sub_location_id: Option<SubLocationId>,
    ) -> CoreResult<LocationSnapshot> {
        let unit: Unit = self
            .store
            .fetch_unit(unit_id)
            .await?
            .ok_or(CoreError::NotFound("unit"))?;
        let sub_location: Option<SubLocation> = match sub_location_id {
            Some(id) => Some(
                self.store
                    .fetch_sub_location(id)
                    .await?
                    .ok_or(CoreError::NotFound("sub-location"))?,
            ),
            None => None,
        };
        Ok(LocationSnapshot::of(&unit, sub_location.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::item::ItemCategory;
    use uuid::Uuid;

    #[test]
    fn test_assert_transferable() {
        let mut item = Item::new(
            "SKU-1",
            "Gate valve",
            ItemCategory::Valve,
            Uuid::new_v4(),
            Uuid::new_v4(),
        );

        assert!(assert_transferable(&item).is_ok());

        item.state = ItemState::Assigned;
        assert!(assert_transferable(&item).is_ok());

        for blocked in [
            ItemState::InTransit,
            ItemState::UnderMaintenance,
            ItemState::Decommissioned,
        ] {
            item.state = blocked;
            assert!(matches!(
                assert_transferable(&item),
                Err(CoreError::ItemNotAvailable)
            ));
        }
    }

    #[test]
    fn test_relocate_builds_row_and_event_from_given_snapshots() {
        let origin_unit = Unit {
            id: Uuid::new_v4(),
            code: "NOR".into(),
            name: "Northern Utility".into(),
        };
        let destination_unit = Unit {
            id: Uuid::new_v4(),
            code: "SUR".into(),
            name: "Southern Utility".into(),
        };
        let item = Item::new(
            "SKU-3",
            "Butterfly valve",
            ItemCategory::Valve,
            origin_unit.id,
            Uuid::new_v4(),
        );
        let destination_sub = Uuid::new_v4();

        let origin = LocationSnapshot::of(&origin_unit, None);
        let destination = LocationSnapshot::of(&destination_unit, None);
        let (moved, event) = relocate(
            &item,
            destination_unit.id,
            destination_sub,
            origin.clone(),
            destination.clone(),
            HistoryEventKind::InternalMove {
                reason: "reorganization".into(),
            },
            None,
            "aisle 4",
        );

        assert_eq!(moved.unit_id, destination_unit.id);
        assert_eq!(moved.sub_location_id, destination_sub);
        // the input row is untouched; snapshots keep the pre-move origin
        assert_eq!(item.unit_id, origin_unit.id);
        assert_eq!(event.origin, Some(origin));
        assert_eq!(event.destination, Some(destination));
        assert_eq!(event.note, "aisle 4");
    }

    #[test]
    fn test_state_change_event_captures_old_and_new() {
        let item = Item::new(
            "SKU-2",
            "Dosing pump",
            ItemCategory::Pump,
            Uuid::new_v4(),
            Uuid::new_v4(),
        );

        let event = state_change_event(&item, ItemState::InTransit, None, "approved");
        match event.kind {
            HistoryEventKind::StateChange { from, to, reason } => {
                assert_eq!(from, ItemState::Available);
                assert_eq!(to, ItemState::InTransit);
                assert_eq!(reason, "approved");
            }
            other => panic!("unexpected event kind: {}", other.label()),
        }
    }
}
