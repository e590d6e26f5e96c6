//! Item registration and maintenance operations.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core_types::{Actor, ItemId, SubLocationId, UnitId};
use crate::error::{CoreError, CoreResult};
use crate::history::event::{HistoryEvent, HistoryEventKind};
use crate::inventory::guard::ItemGuard;
use crate::inventory::item::{Item, ItemCategory, ItemState};
use crate::store::{CommitBatch, Store};

/// Input for item registration.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub sku: String,
    pub name: String,
    pub description: String,
    pub category: ItemCategory,
    pub unit_id: UnitId,
    pub sub_location_id: SubLocationId,
    pub unit_value: Option<Decimal>,
    pub supplier: Option<String>,
    pub invoice_number: Option<String>,
    pub acquired_on: Option<NaiveDate>,
}

/// Descriptive-field edits. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit_value: Option<Decimal>,
    pub supplier: Option<String>,
    pub invoice_number: Option<String>,
}

/// Registration, field updates, direct state changes and maintenance notes.
pub struct InventoryService {
    store: Arc<dyn Store>,
    guard: ItemGuard,
}

impl InventoryService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let guard = ItemGuard::new(store.clone());
        Self { store, guard }
    }

    /// Register an item; the Creation event lands atomically with the row.
    pub async fn register_item(&self, spec: NewItem, actor: Option<&Actor>) -> CoreResult<Item> {
        if spec.sku.trim().is_empty() {
            return Err(CoreError::Validation("sku must not be empty".into()));
        }
        if self.store.fetch_item_by_sku(&spec.sku).await?.is_some() {
            return Err(CoreError::Validation(format!(
                "sku {} is already registered",
                spec.sku
            )));
        }

        let unit = self
            .store
            .fetch_unit(spec.unit_id)
            .await?
            .ok_or(CoreError::NotFound("unit"))?;
        let sub_location = self
            .store
            .fetch_sub_location(spec.sub_location_id)
            .await?
            .ok_or(CoreError::NotFound("sub-location"))?;
        if sub_location.unit_id != unit.id {
            return Err(CoreError::Validation(
                "sub-location does not belong to the unit".into(),
            ));
        }

        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4(),
            sku: spec.sku,
            name: spec.name,
            description: spec.description,
            category: spec.category,
            state: ItemState::Available,
            unit_id: spec.unit_id,
            sub_location_id: spec.sub_location_id,
            unit_value: spec.unit_value,
            supplier: spec.supplier,
            invoice_number: spec.invoice_number,
            acquired_on: spec.acquired_on,
            created_at: now,
            updated_at: now,
        };

        let destination = self
            .guard
            .snapshot(item.unit_id, Some(item.sub_location_id))
            .await?;
        let event = HistoryEvent::new(
            HistoryEventKind::Creation {
                category: item.category,
                unit_value: item.unit_value,
                supplier: item.supplier.clone(),
                invoice_number: item.invoice_number.clone(),
            },
            actor,
        )
        .with_destination(destination)
        .with_note(format!("item {} registered", item.sku));

        self.store
            .commit(CommitBatch::new().write_item(item.clone(), vec![event]))
            .await?;

        tracing::info!(sku = %item.sku, unit = %item.unit_id, "item registered");
        Ok(item)
    }

    /// Apply field edits; appends a FieldUpdate event naming the modified
    /// fields. No event when nothing actually changed.
    pub async fn update_fields(
        &self,
        item_id: ItemId,
        changes: ItemChanges,
        actor: Option<&Actor>,
    ) -> CoreResult<Item> {
        let mut item = self
            .store
            .fetch_item(item_id)
            .await?
            .ok_or(CoreError::NotFound("item"))?;

        let mut modified: Vec<String> = Vec::new();
        if let Some(name) = changes.name
            && name != item.name
        {
            item.name = name;
            modified.push("name".into());
        }
        if let Some(description) = changes.description
            && description != item.description
        {
            item.description = description;
            modified.push("description".into());
        }
        if let Some(unit_value) = changes.unit_value
            && Some(unit_value) != item.unit_value
        {
            item.unit_value = Some(unit_value);
            modified.push("unit_value".into());
        }
        if let Some(supplier) = changes.supplier
            && Some(&supplier) != item.supplier.as_ref()
        {
            item.supplier = Some(supplier);
            modified.push("supplier".into());
        }
        if let Some(invoice_number) = changes.invoice_number
            && Some(&invoice_number) != item.invoice_number.as_ref()
        {
            item.invoice_number = Some(invoice_number);
            modified.push("invoice_number".into());
        }

        if modified.is_empty() {
            return Ok(item);
        }

        item.updated_at = Utc::now();
        let event = HistoryEvent::new(
            HistoryEventKind::FieldUpdate {
                fields: modified.clone(),
            },
            actor,
        )
        .with_note(format!("fields updated: {}", modified.join(", ")));

        self.store
            .commit(CommitBatch::new().write_item(item.clone(), vec![event]))
            .await?;
        Ok(item)
    }

    /// Direct state change (maintenance entry/exit, assignment,
    /// decommissioning) through the guard's allowed-set.
    pub async fn set_state(
        &self,
        item_id: ItemId,
        new_state: ItemState,
        actor: Option<&Actor>,
        reason: &str,
    ) -> CoreResult<Item> {
        self.guard.change_state(item_id, new_state, actor, reason).await
    }

    /// Record a maintenance intervention in the life record. Does not touch
    /// the item state; pair with `set_state` when the item leaves service.
    pub async fn record_maintenance(
        &self,
        item_id: ItemId,
        maintenance_kind: &str,
        started_on: Option<NaiveDate>,
        ended_on: Option<NaiveDate>,
        actor: Option<&Actor>,
        note: &str,
    ) -> CoreResult<HistoryEvent> {
        let item = self
            .store
            .fetch_item(item_id)
            .await?
            .ok_or(CoreError::NotFound("item"))?;

        let event = HistoryEvent::new(
            HistoryEventKind::Maintenance {
                maintenance_kind: maintenance_kind.to_string(),
                started_on,
                ended_on,
            },
            actor,
        )
        .with_note(note);

        let stored = event.clone();
        self.store
            .commit(CommitBatch::new().write_item(item, vec![event]))
            .await?;
        Ok(stored)
    }
}
