//! Inventory items and their state invariants.
//!
//! Items are owned by exactly one unit at a time and carry an append-only
//! life record (see [`crate::history`]). The [`guard`] module enforces the
//! state invariants shared by internal moves and external transfers; the
//! [`service`] module covers registration, field updates and maintenance.

pub mod guard;
pub mod item;
pub mod service;

pub use guard::{ItemGuard, assert_transferable};
pub use item::{Item, ItemCategory, ItemState};
pub use service::{InventoryService, ItemChanges, NewItem};
