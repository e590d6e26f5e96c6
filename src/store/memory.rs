//! In-memory [`Store`] for tests and embedding.
//!
//! A single mutex over the whole dataset makes every commit trivially
//! atomic; the CAS check on transfer writes behaves exactly like the
//! Postgres implementation's guarded UPDATE.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core_types::{SubLocation, SubLocationId, Unit, UnitId};
use crate::core_types::{ItemId, TransferId};
use crate::error::{CoreError, CoreResult};
use crate::history::event::HistoryEvent;
use crate::inventory::item::Item;
use crate::movement::MovementRecord;
use crate::store::{CommitBatch, Store};
use crate::transfer::model::{Transfer, TransferItemLine};
use crate::transfer::state::TransferState;

#[derive(Default)]
struct Inner {
    units: HashMap<UnitId, Unit>,
    sub_locations: HashMap<SubLocationId, SubLocation>,
    items: HashMap<ItemId, Item>,
    item_events: HashMap<ItemId, Vec<HistoryEvent>>,
    transfers: HashMap<TransferId, Transfer>,
    transfer_lines: HashMap<TransferId, Vec<TransferItemLine>>,
    movements: HashMap<ItemId, Vec<MovementRecord>>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_unit(&self, unit: Unit) -> CoreResult<()> {
        self.inner.lock().unwrap().units.insert(unit.id, unit);
        Ok(())
    }

    async fn insert_sub_location(&self, sub_location: SubLocation) -> CoreResult<()> {
        self.inner
            .lock()
            .unwrap()
            .sub_locations
            .insert(sub_location.id, sub_location);
        Ok(())
    }

    async fn fetch_unit(&self, id: UnitId) -> CoreResult<Option<Unit>> {
        Ok(self.inner.lock().unwrap().units.get(&id).cloned())
    }

    async fn fetch_sub_location(&self, id: SubLocationId) -> CoreResult<Option<SubLocation>> {
        Ok(self.inner.lock().unwrap().sub_locations.get(&id).cloned())
    }

    async fn fetch_item(&self, id: ItemId) -> CoreResult<Option<Item>> {
        Ok(self.inner.lock().unwrap().items.get(&id).cloned())
    }

    async fn fetch_item_by_sku(&self, sku: &str) -> CoreResult<Option<Item>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .items
            .values()
            .find(|i| i.sku == sku)
            .cloned())
    }

    async fn item_events(&self, item_id: ItemId) -> CoreResult<Vec<HistoryEvent>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .item_events
            .get(&item_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_transfer(&self, id: TransferId) -> CoreResult<Option<Transfer>> {
        Ok(self.inner.lock().unwrap().transfers.get(&id).cloned())
    }

    async fn fetch_transfer_by_token(&self, token: &str) -> CoreResult<Option<Transfer>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .transfers
            .values()
            .find(|t| t.token.as_deref() == Some(token))
            .cloned())
    }

    async fn transfer_lines(&self, id: TransferId) -> CoreResult<Vec<TransferItemLine>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .transfer_lines
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn pending_transfers(&self) -> CoreResult<Vec<Transfer>> {
        let inner = self.inner.lock().unwrap();
        let mut pending: Vec<Transfer> = inner
            .transfers
            .values()
            .filter(|t| t.state == TransferState::Requested)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(pending)
    }

    async fn unit_transfers(&self, unit: UnitId) -> CoreResult<Vec<Transfer>> {
        let inner = self.inner.lock().unwrap();
        let mut involved: Vec<Transfer> = inner
            .transfers
            .values()
            .filter(|t| t.origin_unit == unit || t.destination_unit == unit)
            .cloned()
            .collect();
        involved.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(involved)
    }

    async fn max_order_suffix(&self, prefix: &str) -> CoreResult<Option<u32>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .transfers
            .values()
            .filter_map(|t| t.order_number.strip_prefix(prefix))
            .filter_map(|suffix| suffix.parse::<u32>().ok())
            .max())
    }

    async fn item_movements(&self, item_id: ItemId) -> CoreResult<Vec<MovementRecord>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .movements
            .get(&item_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn commit(&self, batch: CommitBatch) -> CoreResult<()> {
        let mut inner = self.inner.lock().unwrap();

        // validate before mutating anything: all-or-nothing
        if let Some(write) = &batch.transfer {
            match write.expected {
                None => {
                    if inner.transfers.contains_key(&write.transfer.id) {
                        return Err(CoreError::Storage("transfer already exists".into()));
                    }
                }
                Some(expected) => {
                    let stored = inner
                        .transfers
                        .get(&write.transfer.id)
                        .ok_or(CoreError::NotFound("transfer"))?;
                    if stored.state != expected {
                        return Err(CoreError::TransferInvalidState);
                    }
                }
            }
        }

        if let Some(write) = batch.transfer {
            if write.expected.is_none() {
                inner
                    .transfer_lines
                    .insert(write.transfer.id, write.lines);
            }
            inner.transfers.insert(write.transfer.id, write.transfer);
        }
        for write in batch.items {
            let id = write.item.id;
            inner.items.insert(id, write.item);
            inner.item_events.entry(id).or_default().extend(write.events);
        }
        for movement in batch.movements {
            inner
                .movements
                .entry(movement.item_id)
                .or_default()
                .push(movement);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{ActorRef, Priority};
    use uuid::Uuid;

    fn sample_transfer(order: &str) -> Transfer {
        Transfer::new(
            order.into(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            ActorRef {
                id: Uuid::new_v4(),
                username: "maria".into(),
            },
            "restock".into(),
            Priority::Medium,
        )
    }

    #[tokio::test]
    async fn test_cas_rejects_stale_transition() {
        let store = MemoryStore::new();
        let mut transfer = sample_transfer("ORD2026080001");
        store
            .commit(CommitBatch::new().create_transfer(transfer.clone(), Vec::new()))
            .await
            .unwrap();

        transfer.state = TransferState::Approved;
        store
            .commit(
                CommitBatch::new()
                    .transition_transfer(transfer.clone(), TransferState::Requested),
            )
            .await
            .unwrap();

        // second writer still expects Requested and loses the race
        let err = store
            .commit(CommitBatch::new().transition_transfer(transfer, TransferState::Requested))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::TransferInvalidState));
    }

    #[tokio::test]
    async fn test_failed_commit_applies_nothing() {
        let store = MemoryStore::new();
        let transfer = sample_transfer("ORD2026080001");

        let mut stale = transfer.clone();
        stale.state = TransferState::Approved;
        let item_id = Uuid::new_v4();

        // CAS on a missing transfer fails; the movement must not land either
        let batch = CommitBatch::new()
            .transition_transfer(stale, TransferState::Requested)
            .record_movement(MovementRecord {
                id: Uuid::new_v4(),
                item_id,
                unit_id: Uuid::new_v4(),
                origin_sub_location: Uuid::new_v4(),
                destination_sub_location: Uuid::new_v4(),
                moved_by: ActorRef {
                    id: Uuid::new_v4(),
                    username: "maria".into(),
                },
                reason: "reorganization".into(),
                note: String::new(),
                moved_at: chrono::Utc::now(),
            });
        assert!(store.commit(batch).await.is_err());
        assert!(store.item_movements(item_id).await.unwrap().is_empty());
        assert!(store.fetch_transfer(transfer.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_max_order_suffix_scoped_by_prefix() {
        let store = MemoryStore::new();
        for order in ["ORD2026080001", "ORD2026080007", "ORD2026070042"] {
            store
                .commit(CommitBatch::new().create_transfer(sample_transfer(order), Vec::new()))
                .await
                .unwrap();
        }

        assert_eq!(store.max_order_suffix("ORD202608").await.unwrap(), Some(7));
        assert_eq!(store.max_order_suffix("ORD202607").await.unwrap(), Some(42));
        assert_eq!(store.max_order_suffix("ORD202609").await.unwrap(), None);
    }
}
