//! Cross-unit transfer workflow.
//!
//! # State machine
//!
//! ```text
//! Requested → Approved → InTransit → Completed
//!     ↓
//!  Rejected                 (Cancelled: reserved terminal state,
//!                            no transition reaches it)
//! ```
//!
//! Transitions are a closed set with role- and tenant-gated guards. Approval
//! mints the signed confirmation token atomically with the state change;
//! departure and receipt confirmations require a valid token (see
//! [`crate::signing`]) and record digital signature entries. Every
//! transition that touches items appends life-record events in the same
//! atomic commit.

pub mod coordinator;
pub mod model;
pub mod state;


pub use coordinator::{RequestedLine, TransferCoordinator, TransferRequest};
pub use model::{SignatureRecord, Transfer, TransferItemLine};
pub use state::TransferState;
