//! Notification collaborator seam.
//!
//! Delivery (email, push, in-app) lives outside the core. Transitions emit
//! fire-and-forget events through [`Notifier`]; a delivery failure is logged
//! and swallowed, never surfaced to the caller of the triggering transition.

use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core_types::{ActorId, UnitId};

/// Who should receive a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    CoordinatingAuthority,
    Unit(UnitId),
    /// Everyone in the unit except the acting actor.
    UnitExcept(UnitId, ActorId),
    Actor(ActorId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyEvent {
    TransferRequested,
    TransferApproved,
    TransferRejected,
    TransferInTransit,
    TransferCompleted,
    InternalMove,
}

impl NotifyEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyEvent::TransferRequested => "transfer_requested",
            NotifyEvent::TransferApproved => "transfer_approved",
            NotifyEvent::TransferRejected => "transfer_rejected",
            NotifyEvent::TransferInTransit => "transfer_in_transit",
            NotifyEvent::TransferCompleted => "transfer_completed",
            NotifyEvent::InternalMove => "internal_move",
        }
    }
}

impl fmt::Display for NotifyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        recipient: Recipient,
        event: NotifyEvent,
        payload: serde_json::Value,
    ) -> anyhow::Result<()>;
}

/// Best-effort dispatch: log-and-continue on failure.
pub async fn dispatch(
    notifier: &dyn Notifier,
    recipient: Recipient,
    event: NotifyEvent,
    payload: serde_json::Value,
) {
    if let Err(e) = notifier.notify(recipient, event, payload).await {
        tracing::warn!(event = %event, error = %e, "notification delivery failed");
    }
}

/// Default collaborator: structured log lines only.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        recipient: Recipient,
        event: NotifyEvent,
        payload: serde_json::Value,
    ) -> anyhow::Result<()> {
        tracing::info!(?recipient, event = %event, %payload, "notification");
        Ok(())
    }
}

/// Captures notifications for assertions in tests.
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Recipient, NotifyEvent, serde_json::Value)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A notifier whose deliveries always fail, for best-effort tests.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(Recipient, NotifyEvent, serde_json::Value)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<NotifyEvent> {
        self.sent.lock().unwrap().iter().map(|(_, e, _)| *e).collect()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        recipient: Recipient,
        event: NotifyEvent,
        payload: serde_json::Value,
    ) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("delivery channel down");
        }
        self.sent.lock().unwrap().push((recipient, event, payload));
        Ok(())
    }
}
