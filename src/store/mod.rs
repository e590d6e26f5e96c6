//! Storage seam for the transfer core.
//!
//! All mutation funnels through [`Store::commit`], which applies one
//! [`CommitBatch`] atomically: either every write in the batch lands or none
//! does. Transfer writes carry the expected current state, re-checked inside
//! the transaction (compare-and-swap); a lost race surfaces as
//! `TransferInvalidState` instead of silently overwriting.
//!
//! Two implementations ship: [`postgres::PgStore`] for production and
//! [`memory::MemoryStore`] for tests and embedding.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::core_types::{ItemId, SubLocation, SubLocationId, TransferId, Unit, UnitId};
use crate::error::CoreResult;
use crate::history::event::HistoryEvent;
use crate::inventory::item::Item;
use crate::movement::MovementRecord;
use crate::transfer::model::{Transfer, TransferItemLine};
use crate::transfer::state::TransferState;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// One item mutation: the new row image plus the events appended with it.
#[derive(Debug, Clone)]
pub struct ItemWrite {
    pub item: Item,
    pub events: Vec<HistoryEvent>,
}

/// One transfer mutation. `expected = None` inserts a new aggregate (with its
/// lines); `expected = Some(state)` updates iff the stored state still
/// matches.
#[derive(Debug, Clone)]
pub struct TransferWrite {
    pub transfer: Transfer,
    pub lines: Vec<TransferItemLine>,
    pub expected: Option<TransferState>,
}

/// A unit of atomic work scoped to one transfer and/or a set of items.
#[derive(Debug, Clone, Default)]
pub struct CommitBatch {
    pub transfer: Option<TransferWrite>,
    pub items: Vec<ItemWrite>,
    pub movements: Vec<MovementRecord>,
}

impl CommitBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new transfer aggregate together with its item lines.
    pub fn create_transfer(mut self, transfer: Transfer, lines: Vec<TransferItemLine>) -> Self {
        self.transfer = Some(TransferWrite {
            transfer,
            lines,
            expected: None,
        });
        self
    }

    /// Update a transfer iff it is still in `expected` state.
    pub fn transition_transfer(mut self, transfer: Transfer, expected: TransferState) -> Self {
        self.transfer = Some(TransferWrite {
            transfer,
            lines: Vec::new(),
            expected: Some(expected),
        });
        self
    }

    /// Write an item row and append the events produced by the mutation.
    pub fn write_item(mut self, item: Item, events: Vec<HistoryEvent>) -> Self {
        self.items.push(ItemWrite { item, events });
        self
    }

    pub fn record_movement(mut self, movement: MovementRecord) -> Self {
        self.movements.push(movement);
        self
    }
}

/// Persistence operations the core requires.
///
/// Reads are plain lookups; the only write entry point is [`Store::commit`].
/// Unit/sub-location inserts exist so the organizational directory (an
/// external collaborator) can sync its read models in.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_unit(&self, unit: Unit) -> CoreResult<()>;
    async fn insert_sub_location(&self, sub_location: SubLocation) -> CoreResult<()>;
    async fn fetch_unit(&self, id: UnitId) -> CoreResult<Option<Unit>>;
    async fn fetch_sub_location(&self, id: SubLocationId) -> CoreResult<Option<SubLocation>>;

    async fn fetch_item(&self, id: ItemId) -> CoreResult<Option<Item>>;
    async fn fetch_item_by_sku(&self, sku: &str) -> CoreResult<Option<Item>>;
    /// Life-record events in insertion (= chronological) order.
    async fn item_events(&self, item_id: ItemId) -> CoreResult<Vec<HistoryEvent>>;

    async fn fetch_transfer(&self, id: TransferId) -> CoreResult<Option<Transfer>>;
    async fn fetch_transfer_by_token(&self, token: &str) -> CoreResult<Option<Transfer>>;
    async fn transfer_lines(&self, id: TransferId) -> CoreResult<Vec<TransferItemLine>>;
    /// Transfers awaiting approval, most recent request first.
    async fn pending_transfers(&self) -> CoreResult<Vec<Transfer>>;
    /// Transfers with the unit as origin or destination, most recent first.
    async fn unit_transfers(&self, unit: UnitId) -> CoreResult<Vec<Transfer>>;
    /// Highest numeric suffix among order numbers starting with `prefix`.
    async fn max_order_suffix(&self, prefix: &str) -> CoreResult<Option<u32>>;

    async fn item_movements(&self, item_id: ItemId) -> CoreResult<Vec<MovementRecord>>;

    /// Apply the batch atomically.
    async fn commit(&self, batch: CommitBatch) -> CoreResult<()>;
}
