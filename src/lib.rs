//! aquatrace - Equipment transfer coordination for autonomous water utilities
//!
//! Tracks physical inventory items across independent organizational units,
//! coordinates cross-unit transfers through an approval workflow with signed
//! handoff confirmations, and keeps an append-only life record per item.
//!
//! # Modules
//!
//! - [`core_types`] - Units, sub-locations, actors, capabilities
//! - [`error`] - Error taxonomy shared by every component
//! - [`inventory`] - Item catalog, lifecycle states, state guards
//! - [`history`] - Typed life-record events and the traceability ledger
//! - [`movement`] - Same-unit relocations
//! - [`transfer`] - Cross-unit transfer workflow (the state machine)
//! - [`signing`] - HMAC-signed confirmation tokens and URLs
//! - [`notify`] - Fire-and-forget notification seam
//! - [`store`] - Persistence seam (PostgreSQL and in-memory)

pub mod config;
pub mod core_types;
pub mod error;
pub mod history;
pub mod inventory;
pub mod logging;
pub mod movement;
pub mod notify;
pub mod signing;
pub mod store;
pub mod transfer;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use core_types::{Actor, ActorRef, Capability, Priority, SubLocation, Unit};
pub use error::{CoreError, CoreResult};
pub use history::{HistoryEvent, HistoryEventKind, HistoryLedger, TraceabilityReport};
pub use inventory::{InventoryService, Item, ItemCategory, ItemGuard, ItemState};
pub use movement::{MovementRecord, MovementService};
pub use notify::{LogNotifier, Notifier, NotifyEvent, Recipient};
pub use signing::{SignedToken, SigningService, TransferTicket};
pub use store::{CommitBatch, MemoryStore, PgStore, Store};
pub use transfer::{
    RequestedLine, Transfer, TransferCoordinator, TransferRequest, TransferState,
};
