//! Core type definitions shared across the inventory, transfer and history modules.
//!
//! Organizational data (units, sub-locations, actor identity) is owned by an
//! external directory service. The types here are the narrow read models the
//! core consumes: enough to validate tenancy and to snapshot locations into
//! history events.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Autonomous organizational unit ("water utility") id
pub type UnitId = Uuid;
/// Operating point within a unit (depot, plant) id
pub type SubLocationId = Uuid;
pub type ItemId = Uuid;
pub type TransferId = Uuid;
pub type ActorId = Uuid;
pub type EventId = Uuid;

/// Read model of an organizational unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub code: String,
    pub name: String,
}

/// Read model of a sub-location. Always belongs to exactly one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubLocation {
    pub id: SubLocationId,
    pub unit_id: UnitId,
    pub code: String,
    pub name: String,
}

/// Lightweight reference to a unit or sub-location, embedded in snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRef {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

impl From<&Unit> for PlaceRef {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id,
            code: unit.code.clone(),
            name: unit.name.clone(),
        }
    }
}

impl From<&SubLocation> for PlaceRef {
    fn from(loc: &SubLocation) -> Self {
        Self {
            id: loc.id,
            code: loc.code.clone(),
            name: loc.name.clone(),
        }
    }
}

/// Point-in-time location snapshot stored inside history events.
///
/// Snapshots are immutable copies: renaming a unit later must not rewrite
/// what the life record said at the time of the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub unit: PlaceRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_location: Option<PlaceRef>,
}

impl LocationSnapshot {
    pub fn of(unit: &Unit, sub_location: Option<&SubLocation>) -> Self {
        Self {
            unit: unit.into(),
            sub_location: sub_location.map(PlaceRef::from),
        }
    }

    /// Human-readable "Unit - Sub-location" label used by traceability summaries.
    pub fn label(&self) -> String {
        match &self.sub_location {
            Some(sub) => format!("{} - {}", self.unit.name, sub.name),
            None => self.unit.name.clone(),
        }
    }
}

/// Closed capability set for actors.
///
/// Tenancy and role checks are explicit guards on every core operation; there
/// is no ambient "current unit" context read behind the caller's back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Staff of one unit: may request transfers out of it and move its items.
    RequesterOf(UnitId),
    /// Cross-unit authority: may approve and reject transfers.
    CoordinatingAuthority,
    /// Physical control point of one unit: may confirm departures/receipts.
    ControlPoint(UnitId),
}

/// Authenticated actor performing a core operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub username: String,
    pub capability: Capability,
}

impl Actor {
    pub fn new(username: impl Into<String>, capability: Capability) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            capability,
        }
    }

    /// The unit this actor acts for, if any.
    pub fn unit(&self) -> Option<UnitId> {
        match self.capability {
            Capability::RequesterOf(unit) | Capability::ControlPoint(unit) => Some(unit),
            Capability::CoordinatingAuthority => None,
        }
    }

    pub fn belongs_to(&self, unit: UnitId) -> bool {
        self.unit() == Some(unit)
    }

    pub fn is_coordinating_authority(&self) -> bool {
        matches!(self.capability, Capability::CoordinatingAuthority)
    }
}

/// Immutable actor snapshot stored in events and signature records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRef {
    pub id: ActorId,
    pub username: String,
}

impl From<&Actor> for ActorRef {
    fn from(actor: &Actor) -> Self {
        Self {
            id: actor.id,
            username: actor.username.clone(),
        }
    }
}

/// Transfer priority, requested by the origin unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_tenancy() {
        let unit_a = Uuid::new_v4();
        let unit_b = Uuid::new_v4();

        let staff = Actor::new("maria", Capability::RequesterOf(unit_a));
        assert!(staff.belongs_to(unit_a));
        assert!(!staff.belongs_to(unit_b));
        assert!(!staff.is_coordinating_authority());

        let authority = Actor::new("rector", Capability::CoordinatingAuthority);
        assert!(authority.is_coordinating_authority());
        assert_eq!(authority.unit(), None);

        let gate = Actor::new("porter", Capability::ControlPoint(unit_b));
        assert!(gate.belongs_to(unit_b));
    }

    #[test]
    fn test_priority_roundtrip() {
        for p in [
            Priority::Low,
            Priority::Medium,
            Priority::High,
            Priority::Urgent,
        ] {
            assert_eq!(Priority::from_str(p.as_str()), Some(p));
        }
        assert_eq!(Priority::from_str("asap"), None);
    }

    #[test]
    fn test_snapshot_label() {
        let unit = Unit {
            id: Uuid::new_v4(),
            code: "NOR".into(),
            name: "Northern Utility".into(),
        };
        let depot = SubLocation {
            id: Uuid::new_v4(),
            unit_id: unit.id,
            code: "D1".into(),
            name: "Central Depot".into(),
        };

        let snap = LocationSnapshot::of(&unit, Some(&depot));
        assert_eq!(snap.label(), "Northern Utility - Central Depot");

        let bare = LocationSnapshot::of(&unit, None);
        assert_eq!(bare.label(), "Northern Utility");
    }
}
