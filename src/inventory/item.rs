//! Inventory item model and state machine.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core_types::{ItemId, SubLocationId, UnitId};

/// Equipment category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Pipe,
    Pump,
    Valve,
    Chemical,
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Pipe => "pipe",
            ItemCategory::Pump => "pump",
            ItemCategory::Valve => "valve",
            ItemCategory::Chemical => "chemical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pipe" => Some(ItemCategory::Pipe),
            "pump" => Some(ItemCategory::Pump),
            "valve" => Some(ItemCategory::Valve),
            "chemical" => Some(ItemCategory::Chemical),
            _ => None,
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Item lifecycle state.
///
/// Transitions follow a fixed allowed-set (`can_become`); Decommissioned is
/// terminal. Only Available and Assigned items may enter a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Available,
    InTransit,
    Assigned,
    UnderMaintenance,
    Decommissioned,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Available => "available",
            ItemState::InTransit => "in_transit",
            ItemState::Assigned => "assigned",
            ItemState::UnderMaintenance => "under_maintenance",
            ItemState::Decommissioned => "decommissioned",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "available" => Some(ItemState::Available),
            "in_transit" => Some(ItemState::InTransit),
            "assigned" => Some(ItemState::Assigned),
            "under_maintenance" => Some(ItemState::UnderMaintenance),
            "decommissioned" => Some(ItemState::Decommissioned),
            _ => None,
        }
    }

    /// Whether the item may be placed on a transfer in this state.
    #[inline]
    pub fn is_transferable(&self) -> bool {
        matches!(self, ItemState::Available | ItemState::Assigned)
    }

    /// Terminal states admit no further transitions.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemState::Decommissioned)
    }

    /// Allowed-set of state transitions. Same-state is permitted here;
    /// whether a same-state change is a no-op is the caller's decision.
    pub fn can_become(&self, next: ItemState) -> bool {
        if *self == next {
            return true;
        }
        match self {
            ItemState::Available => true,
            ItemState::Assigned => true,
            ItemState::InTransit => matches!(next, ItemState::Available),
            ItemState::UnderMaintenance => {
                matches!(next, ItemState::Available | ItemState::Decommissioned)
            }
            ItemState::Decommissioned => false,
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An inventoried piece of equipment.
///
/// The life record is not held on the struct: history events are owned by
/// the store and appended atomically with every mutating operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub category: ItemCategory,
    pub state: ItemState,
    pub unit_id: UnitId,
    pub sub_location_id: SubLocationId,
    pub unit_value: Option<Decimal>,
    pub supplier: Option<String>,
    pub invoice_number: Option<String>,
    pub acquired_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        category: ItemCategory,
        unit_id: UnitId,
        sub_location_id: SubLocationId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sku: sku.into(),
            name: name.into(),
            description: String::new(),
            category,
            state: ItemState::Available,
            unit_id,
            sub_location_id,
            unit_value: None,
            supplier: None,
            invoice_number: None,
            acquired_on: None,
            created_at: now,
            updated_at: now,
        }
    }
}
