//! Life-record append and query operations.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core_types::{ActorId, ItemId};
use crate::error::{CoreError, CoreResult};
use crate::history::event::HistoryEvent;
use crate::inventory::item::Item;
use crate::store::{CommitBatch, Store};

/// Inclusive-from / inclusive-to time filter. Either bound may be open.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if let Some(from) = self.from
            && at < from
        {
            return false;
        }
        if let Some(to) = self.to
            && at > to
        {
            return false;
        }
        true
    }
}

/// Derived statistics over one item's life record. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
    pub total_events: usize,
    pub events_per_kind: BTreeMap<String, usize>,
    pub actors: BTreeSet<String>,
    pub locations_visited: BTreeSet<String>,
    pub first_event_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
}

/// Full provenance bundle for one item.
#[derive(Debug, Clone, Serialize)]
pub struct TraceabilityReport {
    pub item: Item,
    pub summary: HistorySummary,
    /// Most recent first.
    pub events: Vec<HistoryEvent>,
}

/// The only append path into an item's life record.
pub struct HistoryLedger {
    store: Arc<dyn Store>,
}

impl HistoryLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Append an event, persisting item and event atomically.
    ///
    /// Fails only on storage errors, which are propagated untouched.
    pub async fn append(&self, item: &Item, event: HistoryEvent) -> CoreResult<HistoryEvent> {
        let stored = event.clone();
        self.store
            .commit(CommitBatch::new().write_item(item.clone(), vec![event]))
            .await?;
        Ok(stored)
    }

    /// All events for the item, most recent first.
    pub async fn read_all(&self, item_id: ItemId) -> CoreResult<Vec<HistoryEvent>> {
        let mut events = self.store.item_events(item_id).await?;
        events.reverse();
        Ok(events)
    }

    pub async fn read_by_kind(
        &self,
        item_id: ItemId,
        kind_label: &str,
    ) -> CoreResult<Vec<HistoryEvent>> {
        let events = self.read_all(item_id).await?;
        Ok(filter_by_kind(events, kind_label))
    }

    pub async fn read_by_actor(
        &self,
        item_id: ItemId,
        actor_id: ActorId,
    ) -> CoreResult<Vec<HistoryEvent>> {
        let events = self.read_all(item_id).await?;
        Ok(filter_by_actor(events, actor_id))
    }

    pub async fn read_by_time_range(
        &self,
        item_id: ItemId,
        range: TimeRange,
    ) -> CoreResult<Vec<HistoryEvent>> {
        let events = self.read_all(item_id).await?;
        Ok(filter_by_time_range(events, range))
    }

    /// Derive summary statistics from the full record.
    pub async fn summarize(&self, item_id: ItemId) -> CoreResult<HistorySummary> {
        let events = self.read_all(item_id).await?;
        Ok(summarize(&events))
    }

    pub async fn traceability_report(&self, item_id: ItemId) -> CoreResult<TraceabilityReport> {
        let item = self
            .store
            .fetch_item(item_id)
            .await?
            .ok_or(CoreError::NotFound("item"))?;
        let events = self.read_all(item_id).await?;
        let summary = summarize(&events);
        Ok(TraceabilityReport {
            item,
            summary,
            events,
        })
    }
}

// Pure filters over an already-read record. Kept free so summaries and
// reports can share them without another storage round-trip.

pub fn filter_by_kind(events: Vec<HistoryEvent>, kind_label: &str) -> Vec<HistoryEvent> {
    events
        .into_iter()
        .filter(|e| e.kind.label() == kind_label)
        .collect()
}

pub fn filter_by_actor(events: Vec<HistoryEvent>, actor_id: ActorId) -> Vec<HistoryEvent> {
    events
        .into_iter()
        .filter(|e| e.actor.as_ref().is_some_and(|a| a.id == actor_id))
        .collect()
}

pub fn filter_by_time_range(events: Vec<HistoryEvent>, range: TimeRange) -> Vec<HistoryEvent> {
    events
        .into_iter()
        .filter(|e| range.contains(e.recorded_at))
        .collect()
}

/// Compute derived statistics; `events` is expected most-recent-first.
pub fn summarize(events: &[HistoryEvent]) -> HistorySummary {
    let mut events_per_kind: BTreeMap<String, usize> = BTreeMap::new();
    let mut actors = BTreeSet::new();
    let mut locations_visited = BTreeSet::new();

    for event in events {
        *events_per_kind
            .entry(event.kind.label().to_string())
            .or_insert(0) += 1;

        if let Some(actor) = &event.actor {
            actors.insert(actor.username.clone());
        }
        if let Some(origin) = &event.origin {
            locations_visited.insert(origin.label());
        }
        if let Some(destination) = &event.destination {
            locations_visited.insert(destination.label());
        }
    }

    HistorySummary {
        total_events: events.len(),
        events_per_kind,
        actors,
        locations_visited,
        first_event_at: events.last().map(|e| e.recorded_at),
        last_event_at: events.first().map(|e| e.recorded_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{Actor, Capability, LocationSnapshot, Unit};
    use crate::history::event::HistoryEventKind;
    use crate::inventory::item::{ItemCategory, ItemState};
    use crate::store::MemoryStore;
    use uuid::Uuid;

    fn snapshot(name: &str) -> LocationSnapshot {
        LocationSnapshot::of(
            &Unit {
                id: Uuid::new_v4(),
                code: name[..1].to_string(),
                name: name.to_string(),
            },
            None,
        )
    }

    fn state_change(actor: &Actor, reason: &str) -> HistoryEvent {
        HistoryEvent::new(
            HistoryEventKind::StateChange {
                from: ItemState::Available,
                to: ItemState::InTransit,
                reason: reason.into(),
            },
            Some(actor),
        )
    }

    #[test]
    fn test_filter_by_kind_and_actor() {
        let unit = Uuid::new_v4();
        let alice = Actor::new("alice", Capability::RequesterOf(unit));
        let bob = Actor::new("bob", Capability::RequesterOf(unit));

        let events = vec![
            state_change(&alice, "a"),
            HistoryEvent::new(
                HistoryEventKind::InternalMove { reason: "m".into() },
                Some(&bob),
            ),
            state_change(&bob, "b"),
        ];

        let by_kind = filter_by_kind(events.clone(), "state_change");
        assert_eq!(by_kind.len(), 2);

        let by_actor = filter_by_actor(events, bob.id);
        assert_eq!(by_actor.len(), 2);
        assert!(
            by_actor
                .iter()
                .all(|e| e.actor.as_ref().unwrap().username == "bob")
        );
    }

    #[test]
    fn test_time_range_bounds_are_inclusive() {
        let unit = Uuid::new_v4();
        let actor = Actor::new("alice", Capability::RequesterOf(unit));
        let event = state_change(&actor, "x");
        let at = event.recorded_at;

        let exact = TimeRange {
            from: Some(at),
            to: Some(at),
        };
        assert_eq!(filter_by_time_range(vec![event.clone()], exact).len(), 1);

        let past = TimeRange {
            from: None,
            to: Some(at - chrono::Duration::seconds(1)),
        };
        assert!(filter_by_time_range(vec![event], past).is_empty());
    }

    #[test]
    fn test_summarize_derives_everything() {
        let unit = Uuid::new_v4();
        let actor = Actor::new("alice", Capability::RequesterOf(unit));

        // most-recent-first ordering, as read_all returns
        let newest = HistoryEvent::new(
            HistoryEventKind::ExternalTransfer {
                order_number: "ORD2026080001".into(),
            },
            Some(&actor),
        )
        .with_origin(snapshot("North"))
        .with_destination(snapshot("South"));
        let oldest = HistoryEvent::new(
            HistoryEventKind::Creation {
                category: ItemCategory::Valve,
                unit_value: None,
                supplier: None,
                invoice_number: None,
            },
            None,
        )
        .with_destination(snapshot("North"));

        let summary = summarize(&[newest.clone(), oldest.clone()]);
        assert_eq!(summary.total_events, 2);
        assert_eq!(summary.events_per_kind["creation"], 1);
        assert_eq!(summary.events_per_kind["external_transfer"], 1);
        assert_eq!(summary.actors.len(), 1);
        assert!(summary.locations_visited.contains("North"));
        assert!(summary.locations_visited.contains("South"));
        assert_eq!(summary.first_event_at, Some(oldest.recorded_at));
        assert_eq!(summary.last_event_at, Some(newest.recorded_at));
    }

    #[test]
    fn test_summarize_empty_record() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_events, 0);
        assert_eq!(summary.first_event_at, None);
        assert_eq!(summary.last_event_at, None);
    }

    fn registered(unit: Uuid) -> (Item, HistoryEvent) {
        let item = Item::new("VAL-9", "Check valve", ItemCategory::Valve, unit, Uuid::new_v4());
        let creation = HistoryEvent::new(
            HistoryEventKind::Creation {
                category: ItemCategory::Valve,
                unit_value: None,
                supplier: None,
                invoice_number: None,
            },
            None,
        );
        (item, creation)
    }

    #[tokio::test]
    async fn test_append_and_read_all_newest_first() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let ledger = HistoryLedger::new(store);
        let unit = Uuid::new_v4();
        let actor = Actor::new("alice", Capability::RequesterOf(unit));
        let (item, creation) = registered(unit);
        let change = state_change(&actor, "assigned to crew");

        let stored = ledger.append(&item, creation.clone()).await.unwrap();
        assert_eq!(stored, creation);
        ledger.append(&item, change.clone()).await.unwrap();

        let events = ledger.read_all(item.id).await.unwrap();
        assert_eq!(events.len(), 2);
        // most recent first
        assert_eq!(events[0].id, change.id);
        assert_eq!(events[1].id, creation.id);

        let by_kind = ledger.read_by_kind(item.id, "creation").await.unwrap();
        assert_eq!(by_kind.len(), 1);
        assert_eq!(by_kind[0].id, creation.id);

        let by_actor = ledger.read_by_actor(item.id, actor.id).await.unwrap();
        assert_eq!(by_actor.len(), 1);
        assert_eq!(by_actor[0].id, change.id);

        let everything = ledger
            .read_by_time_range(item.id, TimeRange::default())
            .await
            .unwrap();
        assert_eq!(everything.len(), 2);
    }

    #[tokio::test]
    async fn test_traceability_report_bundles_item_summary_events() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let ledger = HistoryLedger::new(store);
        let unit = Uuid::new_v4();
        let actor = Actor::new("alice", Capability::RequesterOf(unit));
        let (item, creation) = registered(unit);
        let change = state_change(&actor, "assigned to crew");

        ledger.append(&item, creation.clone()).await.unwrap();
        ledger.append(&item, change.clone()).await.unwrap();

        let report = ledger.traceability_report(item.id).await.unwrap();
        assert_eq!(report.item.id, item.id);
        assert_eq!(report.summary.total_events, 2);
        assert_eq!(report.summary.events_per_kind["creation"], 1);
        assert_eq!(report.summary.events_per_kind["state_change"], 1);
        // the bundled events keep the newest-first read order
        assert_eq!(report.events[0].id, change.id);
        assert_eq!(ledger.summarize(item.id).await.unwrap(), report.summary);

        assert!(matches!(
            ledger.traceability_report(Uuid::new_v4()).await,
            Err(CoreError::NotFound(_))
        ));
    }
}
